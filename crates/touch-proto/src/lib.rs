//! Control messages sent to the Android agent.
//!
//! - `message.rs`: the message model and its big-endian codec
//! - `fixed.rs`: 16-bit fixed-point helpers for pressure and scroll
//! - `android.rs`: action codes, button and meta bits, reserved pointer ids

pub mod android;
pub mod fixed;
pub mod message;

pub use android::{
    KeyAction, MotionAction, POINTER_ID_GENERIC_FINGER, POINTER_ID_MOUSE,
    POINTER_ID_VIRTUAL_FINGER,
};
pub use message::{ControlMessage, KeycodeEvent, Position, ScrollEvent, TouchEvent};

/// Errors from decoding control messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// The buffer ended before the message did.
    #[error("truncated message: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// The leading type byte is not a known message type.
    #[error("unknown message type: {0}")]
    UnknownType(u8),

    /// The action byte is not valid for the message type.
    #[error("unknown action: {0}")]
    UnknownAction(u8),

    /// A text payload was not valid UTF-8.
    #[error("text payload is not valid UTF-8")]
    InvalidText,
}
