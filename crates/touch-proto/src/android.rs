//! Android input constants understood by the receiving agent.

use std::fmt;

/// Pointer id of the system mouse pointer.
pub const POINTER_ID_MOUSE: u64 = u64::MAX;
/// Pointer id for a finger without a dedicated slot.
pub const POINTER_ID_GENERIC_FINGER: u64 = u64::MAX - 1;
/// Pointer id used for the second finger of synthesised gestures.
pub const POINTER_ID_VIRTUAL_FINGER: u64 = u64::MAX - 2;

/// `MotionEvent` action codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MotionAction {
    Down = 0,
    Up = 1,
    Move = 2,
    HoverMove = 7,
}

impl MotionAction {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            2 => Some(Self::Move),
            7 => Some(Self::HoverMove),
            _ => None,
        }
    }
}

impl fmt::Display for MotionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "DOWN"),
            Self::Up => write!(f, "UP"),
            Self::Move => write!(f, "MOVE"),
            Self::HoverMove => write!(f, "HOVER_MOVE"),
        }
    }
}

/// `KeyEvent` action codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyAction {
    Down = 0,
    Up = 1,
}

impl KeyAction {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            _ => None,
        }
    }
}

/// `MotionEvent` button state bits.
pub mod buttons {
    pub const PRIMARY: u32 = 1 << 0;
    pub const SECONDARY: u32 = 1 << 1;
    pub const TERTIARY: u32 = 1 << 2;
    pub const BACK: u32 = 1 << 3;
    pub const FORWARD: u32 = 1 << 4;
}

/// `KeyEvent` meta state bits.
pub mod meta {
    pub const SHIFT_ON: u32 = 0x01;
    pub const ALT_ON: u32 = 0x02;
    pub const CTRL_ON: u32 = 0x1000;
    pub const META_ON: u32 = 0x10000;
}

/// Android button bit for a host mouse button (1 = left, 2 = middle, 3 = right).
#[must_use]
pub fn button_from_host(button: u32) -> u32 {
    match button {
        1 => buttons::PRIMARY,
        2 => buttons::TERTIARY,
        3 => buttons::SECONDARY,
        8 => buttons::BACK,
        9 => buttons::FORWARD,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes() {
        assert_eq!(MotionAction::HoverMove as u8, 7);
        assert_eq!(MotionAction::from_u8(2), Some(MotionAction::Move));
        assert_eq!(MotionAction::from_u8(3), None);
        assert_eq!(KeyAction::from_u8(1), Some(KeyAction::Up));
    }

    #[test]
    fn host_buttons() {
        assert_eq!(button_from_host(1), buttons::PRIMARY);
        assert_eq!(button_from_host(2), buttons::TERTIARY);
        assert_eq!(button_from_host(3), buttons::SECONDARY);
        assert_eq!(button_from_host(42), 0);
    }

    #[test]
    fn reserved_pointer_ids() {
        assert_eq!(POINTER_ID_MOUSE, 0xFFFF_FFFF_FFFF_FFFF);
        assert_eq!(POINTER_ID_GENERIC_FINGER, 0xFFFF_FFFF_FFFF_FFFE);
        assert_eq!(POINTER_ID_VIRTUAL_FINGER, 0xFFFF_FFFF_FFFF_FFFD);
    }
}
