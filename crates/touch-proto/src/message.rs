//! Control messages and their big-endian wire encoding.
//!
//! ```text
//! keycode  u8 0 | u8 action | u32 keycode | u32 repeat | u32 metastate
//! text     u8 1 | u32 len   | len bytes UTF-8
//! touch    u8 2 | u8 action | u64 pointer | i32 x | i32 y | u16 w | u16 h
//!               | u16 pressure | u32 action_button | u32 buttons
//! scroll   u8 3 | i32 x | i32 y | u16 w | u16 h | i16 hscroll | i16 vscroll
//!               | u32 buttons
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::android::{KeyAction, MotionAction};
use crate::fixed::{i16fp, i16fp_to_f32, u16fp, u16fp_to_f32};
use crate::ProtoError;

/// Longest text payload accepted by the agent, in bytes.
pub const TEXT_MAX_LEN: usize = 300;

/// Wire length of a touch message.
pub const TOUCH_LEN: usize = 32;
/// Wire length of a scroll message.
pub const SCROLL_LEN: usize = 21;
/// Wire length of a keycode message.
pub const KEYCODE_LEN: usize = 14;

/// Message type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    InjectKeycode = 0,
    InjectText = 1,
    InjectTouch = 2,
    InjectScroll = 3,
}

impl MessageType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::InjectKeycode),
            1 => Some(Self::InjectText),
            2 => Some(Self::InjectTouch),
            3 => Some(Self::InjectScroll),
            _ => None,
        }
    }
}

/// A point on the host frame together with the frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub width: u16,
    pub height: u16,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Map the point onto a device of a different resolution.
    ///
    /// A zero-sized frame cannot be scaled and is returned unchanged.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn scaled_to(self, width: u16, height: u16) -> Self {
        if self.width == 0 || self.height == 0 {
            return self;
        }
        let x = i64::from(self.x) * i64::from(width) / i64::from(self.width);
        let y = i64::from(self.y) * i64::from(height) / i64::from(self.height);
        Self {
            x: x as i32,
            y: y as i32,
            width,
            height,
        }
    }

    fn put(self, buf: &mut impl BufMut) {
        buf.put_i32(self.x);
        buf.put_i32(self.y);
        buf.put_u16(self.width);
        buf.put_u16(self.height);
    }

    fn get(buf: &mut impl Buf) -> Self {
        Self {
            x: buf.get_i32(),
            y: buf.get_i32(),
            width: buf.get_u16(),
            height: buf.get_u16(),
        }
    }
}

/// Touch event. Pressure is stored in its wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TouchEvent {
    pub action: MotionAction,
    pub pointer_id: u64,
    pub position: Position,
    pub pressure: u16,
    pub action_button: u32,
    pub buttons: u32,
}

impl TouchEvent {
    #[must_use]
    pub fn new(
        action: MotionAction,
        pointer_id: u64,
        position: Position,
        pressure: f32,
        action_button: u32,
        buttons: u32,
    ) -> Self {
        Self {
            action,
            pointer_id,
            position,
            pressure: u16fp(pressure),
            action_button,
            buttons,
        }
    }

    #[must_use]
    pub fn pressure(&self) -> f32 {
        u16fp_to_f32(self.pressure)
    }
}

/// Scroll event. Scroll amounts are stored in their wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScrollEvent {
    pub position: Position,
    pub hscroll: i16,
    pub vscroll: i16,
    pub buttons: u32,
}

impl ScrollEvent {
    /// Both scroll amounts must lie in `[-1, 1]`.
    #[must_use]
    pub fn new(position: Position, hscroll: f32, vscroll: f32, buttons: u32) -> Self {
        Self {
            position,
            hscroll: i16fp(hscroll),
            vscroll: i16fp(vscroll),
            buttons,
        }
    }

    #[must_use]
    pub fn hscroll(&self) -> f32 {
        i16fp_to_f32(self.hscroll)
    }

    #[must_use]
    pub fn vscroll(&self) -> f32 {
        i16fp_to_f32(self.vscroll)
    }
}

/// Key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeycodeEvent {
    pub action: KeyAction,
    pub keycode: u32,
    pub repeat: u32,
    pub metastate: u32,
}

/// Longest prefix of `text` that fits in [`TEXT_MAX_LEN`] bytes without
/// splitting a character.
fn clip_text(text: &str) -> &str {
    let mut end = text.len().min(TEXT_MAX_LEN);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// A message sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlMessage {
    InjectKeycode(KeycodeEvent),
    InjectText(String),
    InjectTouch(TouchEvent),
    InjectScroll(ScrollEvent),
}

impl ControlMessage {
    /// Text message, truncated on a character boundary to [`TEXT_MAX_LEN`] bytes.
    #[must_use]
    pub fn text(text: &str) -> Self {
        Self::InjectText(clip_text(text).to_owned())
    }

    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::InjectKeycode(_) => MessageType::InjectKeycode,
            Self::InjectText(_) => MessageType::InjectText,
            Self::InjectTouch(_) => MessageType::InjectTouch,
            Self::InjectScroll(_) => MessageType::InjectScroll,
        }
    }

    /// Number of bytes [`encode`](Self::encode) writes.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        match self {
            Self::InjectKeycode(_) => KEYCODE_LEN,
            Self::InjectText(text) => 5 + clip_text(text).len(),
            Self::InjectTouch(_) => TOUCH_LEN,
            Self::InjectScroll(_) => SCROLL_LEN,
        }
    }

    /// Same message with its position mapped onto a device resolution.
    #[must_use]
    pub fn scaled_to(&self, width: u16, height: u16) -> Self {
        match self {
            Self::InjectTouch(touch) => Self::InjectTouch(TouchEvent {
                position: touch.position.scaled_to(width, height),
                ..*touch
            }),
            Self::InjectScroll(scroll) => Self::InjectScroll(ScrollEvent {
                position: scroll.position.scaled_to(width, height),
                ..*scroll
            }),
            other => other.clone(),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.message_type() as u8);
        match self {
            Self::InjectKeycode(key) => {
                buf.put_u8(key.action as u8);
                buf.put_u32(key.keycode);
                buf.put_u32(key.repeat);
                buf.put_u32(key.metastate);
            }
            Self::InjectText(text) => {
                let text = clip_text(text);
                buf.put_u32(text.len() as u32);
                buf.put_slice(text.as_bytes());
            }
            Self::InjectTouch(touch) => {
                buf.put_u8(touch.action as u8);
                buf.put_u64(touch.pointer_id);
                touch.position.put(buf);
                buf.put_u16(touch.pressure);
                buf.put_u32(touch.action_button);
                buf.put_u32(touch.buttons);
            }
            Self::InjectScroll(scroll) => {
                scroll.position.put(buf);
                buf.put_i16(scroll.hscroll);
                buf.put_i16(scroll.vscroll);
                buf.put_u32(scroll.buttons);
            }
        }
    }

    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Decode one message from the front of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError`] when the buffer is short or carries an unknown
    /// type or action. Nothing is consumed past the failing field.
    pub fn decode(buf: &mut impl Buf) -> Result<Self, ProtoError> {
        need(buf, 1)?;
        let tag = buf.get_u8();
        let kind = MessageType::from_u8(tag).ok_or(ProtoError::UnknownType(tag))?;

        match kind {
            MessageType::InjectKeycode => {
                need(buf, KEYCODE_LEN - 1)?;
                let raw = buf.get_u8();
                let action = KeyAction::from_u8(raw).ok_or(ProtoError::UnknownAction(raw))?;
                Ok(Self::InjectKeycode(KeycodeEvent {
                    action,
                    keycode: buf.get_u32(),
                    repeat: buf.get_u32(),
                    metastate: buf.get_u32(),
                }))
            }
            MessageType::InjectText => {
                need(buf, 4)?;
                let len = buf.get_u32() as usize;
                need(buf, len)?;
                let mut bytes = vec![0; len];
                buf.copy_to_slice(&mut bytes);
                let text = String::from_utf8(bytes).map_err(|_| ProtoError::InvalidText)?;
                Ok(Self::InjectText(text))
            }
            MessageType::InjectTouch => {
                need(buf, TOUCH_LEN - 1)?;
                let raw = buf.get_u8();
                let action =
                    MotionAction::from_u8(raw).ok_or(ProtoError::UnknownAction(raw))?;
                Ok(Self::InjectTouch(TouchEvent {
                    action,
                    pointer_id: buf.get_u64(),
                    position: Position::get(buf),
                    pressure: buf.get_u16(),
                    action_button: buf.get_u32(),
                    buttons: buf.get_u32(),
                }))
            }
            MessageType::InjectScroll => {
                need(buf, SCROLL_LEN - 1)?;
                Ok(Self::InjectScroll(ScrollEvent {
                    position: Position::get(buf),
                    hscroll: buf.get_i16(),
                    vscroll: buf.get_i16(),
                    buttons: buf.get_u32(),
                }))
            }
        }
    }
}

fn need(buf: &impl Buf, needed: usize) -> Result<(), ProtoError> {
    let available = buf.remaining();
    if available < needed {
        return Err(ProtoError::Truncated { needed, available });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::android::buttons;
    use proptest::prelude::*;

    #[test]
    fn touch_layout() {
        let msg = ControlMessage::InjectTouch(TouchEvent::new(
            MotionAction::Down,
            1,
            Position::new(100, 200, 1920, 1080),
            1.0,
            buttons::PRIMARY,
            buttons::PRIMARY,
        ));
        let bytes = msg.to_bytes();
        assert_eq!(bytes.len(), TOUCH_LEN);
        assert_eq!(
            bytes.as_ref(),
            &[
                0x02, 0x00, // type, action
                0, 0, 0, 0, 0, 0, 0, 1, // pointer id
                0, 0, 0, 100, 0, 0, 0, 200, // x, y
                0x07, 0x80, 0x04, 0x38, // 1920 x 1080
                0xFF, 0xFF, // pressure
                0, 0, 0, 1, 0, 0, 0, 1, // action button, buttons
            ]
        );
    }

    #[test]
    fn scroll_layout() {
        let msg = ControlMessage::InjectScroll(ScrollEvent::new(
            Position::new(-1, 2, 800, 600),
            -1.0,
            1.0,
            0,
        ));
        let bytes = msg.to_bytes();
        assert_eq!(bytes.len(), SCROLL_LEN);
        assert_eq!(
            bytes.as_ref(),
            &[
                0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 2, 0x03, 0x20, 0x02, 0x58, 0x80, 0x00,
                0x7F, 0xFF, 0, 0, 0, 0,
            ]
        );
    }

    #[test]
    fn keycode_and_text_layout() {
        let key = ControlMessage::InjectKeycode(KeycodeEvent {
            action: KeyAction::Up,
            keycode: 66,
            repeat: 2,
            metastate: 0x1000,
        });
        assert_eq!(
            key.to_bytes().as_ref(),
            &[0, 1, 0, 0, 0, 66, 0, 0, 0, 2, 0, 0, 0x10, 0]
        );

        let text = ControlMessage::text("hé");
        assert_eq!(text.to_bytes().as_ref(), &[1, 0, 0, 0, 3, b'h', 0xC3, 0xA9]);
    }

    #[test]
    fn text_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let ControlMessage::InjectText(text) = ControlMessage::text(&long) else {
            panic!("expected text message");
        };
        assert_eq!(text.len(), TEXT_MAX_LEN);
        assert!(text.chars().all(|c| c == 'é'));

        let odd = format!("a{}", "é".repeat(200));
        let ControlMessage::InjectText(text) = ControlMessage::text(&odd) else {
            panic!("expected text message");
        };
        assert_eq!(text.len(), TEXT_MAX_LEN - 1);
    }

    #[test]
    fn oversized_text_is_clipped_on_the_wire() {
        let built = ControlMessage::InjectText(format!("a{}", "é".repeat(200)));
        let bytes = built.to_bytes();
        assert_eq!(bytes.len(), built.wire_len());
        assert_eq!(bytes.len(), 5 + TEXT_MAX_LEN - 1);
        assert_eq!(&bytes[1..5], &[0, 0, 1, 43]);

        let decoded = ControlMessage::decode(&mut bytes.clone()).unwrap();
        assert_eq!(decoded, ControlMessage::text(&format!("a{}", "é".repeat(200))));
    }

    #[test]
    fn decode_errors() {
        let mut short = &[0x02u8, 0x00, 0x00][..];
        assert!(matches!(
            ControlMessage::decode(&mut short),
            Err(ProtoError::Truncated { needed: 31, available: 2 })
        ));

        let mut unknown = &[0x09u8][..];
        assert!(matches!(
            ControlMessage::decode(&mut unknown),
            Err(ProtoError::UnknownType(9))
        ));

        let mut bad_action = vec![0x02u8, 0x05];
        bad_action.resize(TOUCH_LEN, 0);
        assert!(matches!(
            ControlMessage::decode(&mut bad_action.as_slice()),
            Err(ProtoError::UnknownAction(5))
        ));
    }

    #[test]
    fn device_scaling() {
        let pos = Position::new(960, 540, 1920, 1080).scaled_to(1280, 720);
        assert_eq!(pos, Position::new(640, 360, 1280, 720));
        let degenerate = Position::new(5, 5, 0, 0);
        assert_eq!(degenerate.scaled_to(100, 100), degenerate);
    }

    #[test]
    fn decode_stream_of_messages() {
        let first = ControlMessage::text("go");
        let second = ControlMessage::InjectTouch(TouchEvent::new(
            MotionAction::Up,
            3,
            Position::new(1, 2, 3, 4),
            0.0,
            0,
            0,
        ));
        let mut buf = BytesMut::new();
        first.encode(&mut buf);
        second.encode(&mut buf);
        let mut bytes = buf.freeze();
        assert_eq!(ControlMessage::decode(&mut bytes).ok(), Some(first));
        assert_eq!(ControlMessage::decode(&mut bytes).ok(), Some(second));
        assert!(!bytes.has_remaining());
    }

    fn motion_action() -> impl Strategy<Value = MotionAction> {
        prop_oneof![
            Just(MotionAction::Down),
            Just(MotionAction::Up),
            Just(MotionAction::Move),
            Just(MotionAction::HoverMove),
        ]
    }

    fn position() -> impl Strategy<Value = Position> {
        (any::<i32>(), any::<i32>(), any::<u16>(), any::<u16>())
            .prop_map(|(x, y, w, h)| Position::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn touch_is_bit_exact(
            action in motion_action(),
            pointer_id in any::<u64>(),
            position in position(),
            pressure in any::<u16>(),
            action_button in any::<u32>(),
            buttons in any::<u32>(),
        ) {
            let msg = ControlMessage::InjectTouch(TouchEvent {
                action, pointer_id, position, pressure, action_button, buttons,
            });
            let bytes = msg.to_bytes();
            prop_assert_eq!(bytes.len(), TOUCH_LEN);
            let decoded = ControlMessage::decode(&mut bytes.clone());
            prop_assert_eq!(decoded.ok(), Some(msg));
        }

        #[test]
        fn scroll_is_bit_exact(
            position in position(),
            hscroll in any::<i16>(),
            vscroll in any::<i16>(),
            buttons in any::<u32>(),
        ) {
            let msg = ControlMessage::InjectScroll(ScrollEvent { position, hscroll, vscroll, buttons });
            let bytes = msg.to_bytes();
            prop_assert_eq!(bytes.len(), SCROLL_LEN);
            prop_assert_eq!(ControlMessage::decode(&mut bytes.clone()).ok(), Some(msg));
        }
    }
}
