//! Fallback handlers that forward unmapped keyboard and mouse input to the
//! device as plain key, text, touch and scroll messages.

use std::fmt;
use std::str::FromStr;

use touch_keys::{keymap, keysym, Modifiers};
use touch_proto::android::{button_from_host, meta, KeyAction, POINTER_ID_MOUSE};
use touch_proto::{ControlMessage, KeycodeEvent, MotionAction, ScrollEvent, TouchEvent};

use super::{HandlerPriority, InputHandler};
use crate::bus::{EventData, Source};
use crate::engine::Core;
use crate::error::HandlerError;
use crate::geometry::Point;
use crate::input::InputEvent;
use crate::widget::UnknownName;

const KEY_HANDLER: &str = "default_key";
const MOUSE_HANDLER: &str = "default_mouse";

/// How unmapped keys reach the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeyInjectMode {
    /// Special keys, letters and space as key events; digits and
    /// punctuation as text.
    #[default]
    Mixed,
    /// Only special keys as key events; everything printable as text.
    Text,
    /// Everything with a keycode as a key event.
    Raw,
}

impl fmt::Display for KeyInjectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mixed => f.write_str("mixed"),
            Self::Text => f.write_str("text"),
            Self::Raw => f.write_str("raw"),
        }
    }
}

impl FromStr for KeyInjectMode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mixed" => Ok(Self::Mixed),
            "text" => Ok(Self::Text),
            "raw" => Ok(Self::Raw),
            _ => Err(UnknownName::new("key inject mode", s)),
        }
    }
}

/// Behaviour of the fallback handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSettings {
    pub inject_mode: KeyInjectMode,
    /// Invert scroll direction to match touch scrolling.
    pub natural_scroll: bool,
    /// Forward cursor motion with no button held as hover events.
    pub mouse_hover: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            inject_mode: KeyInjectMode::Mixed,
            natural_scroll: true,
            mouse_hover: false,
        }
    }
}

fn is_modifier_key(sym: i32) -> bool {
    (keysym::SHIFT_L..=keysym::SUPER_R).contains(&sym)
}

fn metastate(modifiers: Modifiers) -> u32 {
    let mut state = 0;
    if modifiers.shift {
        state |= meta::SHIFT_ON;
    }
    if modifiers.alt {
        state |= meta::ALT_ON;
    }
    if modifiers.meta {
        state |= meta::META_ON;
    }
    if modifiers.ctrl {
        state |= meta::CTRL_ON;
    }
    state
}

/// Sends unmapped keys as key events or text.
#[derive(Debug)]
pub struct DefaultKeyHandler {
    inject_mode: KeyInjectMode,
    last_key: Option<i32>,
    repeat: u32,
}

impl DefaultKeyHandler {
    #[must_use]
    pub fn new(settings: &InputSettings) -> Self {
        Self {
            inject_mode: settings.inject_mode,
            last_key: None,
            repeat: 0,
        }
    }

    fn keycode(&self, sym: i32, modifiers: Modifiers) -> Option<u32> {
        if let Some(code) = keymap::special_keycode(sym) {
            return Some(code);
        }
        if self.inject_mode == KeyInjectMode::Text && !modifiers.ctrl {
            return None;
        }
        if modifiers.alt || modifiers.meta {
            return None;
        }
        if let Some(code) = keymap::alphaspace_keycode(sym) {
            return Some(code);
        }
        if self.inject_mode == KeyInjectMode::Raw {
            return keymap::numbers_punct_keycode(sym);
        }
        None
    }

    fn text(&self, sym: i32) -> Option<String> {
        if keymap::special_keycode(sym).is_some() || self.inject_mode == KeyInjectMode::Raw {
            return None;
        }
        let c = keysym::to_char(sym)?;
        if self.inject_mode == KeyInjectMode::Mixed && (c.is_alphabetic() || c == ' ') {
            return None;
        }
        Some(c.to_string())
    }

    fn repeat_count(&mut self, sym: i32, action: KeyAction) -> u32 {
        match action {
            KeyAction::Down if self.last_key == Some(sym) => self.repeat += 1,
            KeyAction::Down => {
                self.last_key = Some(sym);
                self.repeat = 0;
            }
            KeyAction::Up => {
                self.last_key = None;
                self.repeat = 0;
            }
        }
        self.repeat
    }
}

impl InputHandler for DefaultKeyHandler {
    fn name(&self) -> &'static str {
        KEY_HANDLER
    }

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::LOWEST
    }

    fn can_handle(&self, event: &InputEvent) -> bool {
        matches!(
            event,
            InputEvent::KeyPress { .. } | InputEvent::KeyRelease { .. }
        )
    }

    fn handle(&mut self, event: &InputEvent, core: &mut Core) -> Result<bool, HandlerError> {
        let (sym, modifiers, action) = match *event {
            InputEvent::KeyPress {
                keyval, modifiers, ..
            } => (keyval, modifiers, KeyAction::Down),
            InputEvent::KeyRelease {
                keyval, modifiers, ..
            } => (keyval, modifiers, KeyAction::Up),
            _ => return Ok(false),
        };

        if let Some(keycode) = self.keycode(sym, modifiers) {
            let repeat = self.repeat_count(sym, action);
            tracing::trace!(keyval = sym, keycode, ?action, repeat, "Inject keycode");
            core.emit(
                Source::Handler(KEY_HANDLER),
                EventData::ControlMessage(ControlMessage::InjectKeycode(KeycodeEvent {
                    action,
                    keycode,
                    repeat,
                    metastate: metastate(modifiers),
                })),
            );
            return Ok(true);
        }

        if action != KeyAction::Down || is_modifier_key(sym) {
            return Ok(false);
        }
        let Some(text) = self.text(sym) else {
            return Ok(false);
        };
        tracing::trace!(keyval = sym, %text, "Inject text");
        core.emit(
            Source::Handler(KEY_HANDLER),
            EventData::ControlMessage(ControlMessage::text(&text)),
        );
        Ok(true)
    }
}

/// Forwards unmapped mouse input as the device's mouse pointer.
#[derive(Debug)]
pub struct DefaultMouseHandler {
    natural_scroll: bool,
    mouse_hover: bool,
    /// Android button bits currently held.
    buttons: u32,
}

impl DefaultMouseHandler {
    #[must_use]
    pub fn new(settings: &InputSettings) -> Self {
        Self {
            natural_scroll: settings.natural_scroll,
            mouse_hover: settings.mouse_hover,
            buttons: 0,
        }
    }

    fn touch(
        &self,
        core: &mut Core,
        action: MotionAction,
        at: Point,
        pressure: f32,
        action_button: u32,
    ) {
        let position = core.frame().position(at);
        core.emit(
            Source::Handler(MOUSE_HANDLER),
            EventData::ControlMessage(ControlMessage::InjectTouch(TouchEvent::new(
                action,
                POINTER_ID_MOUSE,
                position,
                pressure,
                action_button,
                self.buttons,
            ))),
        );
    }
}

impl InputHandler for DefaultMouseHandler {
    fn name(&self) -> &'static str {
        MOUSE_HANDLER
    }

    fn priority(&self) -> HandlerPriority {
        HandlerPriority::LOWEST
    }

    fn can_handle(&self, event: &InputEvent) -> bool {
        matches!(
            event,
            InputEvent::ButtonPress { .. }
                | InputEvent::ButtonRelease { .. }
                | InputEvent::Motion { .. }
                | InputEvent::Scroll { .. }
        )
    }

    fn handle(&mut self, event: &InputEvent, core: &mut Core) -> Result<bool, HandlerError> {
        match *event {
            InputEvent::ButtonPress {
                button, position, ..
            } => {
                let bit = button_from_host(button);
                self.buttons |= bit;
                self.touch(core, MotionAction::Down, position, 1.0, bit);
                Ok(true)
            }
            InputEvent::ButtonRelease {
                button, position, ..
            } => {
                let bit = button_from_host(button);
                self.buttons &= !bit;
                self.touch(core, MotionAction::Up, position, 0.0, bit);
                Ok(true)
            }
            InputEvent::Motion { position } => {
                if core.pointer_locked() {
                    return Ok(false);
                }
                if self.buttons != 0 {
                    self.touch(core, MotionAction::Move, position, 1.0, 0);
                } else if self.mouse_hover {
                    self.touch(core, MotionAction::HoverMove, position, 1.0, 0);
                } else {
                    return Ok(false);
                }
                Ok(true)
            }
            InputEvent::Scroll { dx, dy } => {
                #[allow(clippy::cast_possible_truncation)]
                let (mut h, mut v) = (dx.clamp(-1.0, 1.0) as f32, dy.clamp(-1.0, 1.0) as f32);
                if h == 0.0 && v == 0.0 {
                    return Ok(false);
                }
                if self.natural_scroll {
                    h = -h;
                    v = -v;
                }
                let position = core.frame().position(core.cursor());
                core.emit(
                    Source::Handler(MOUSE_HANDLER),
                    EventData::ControlMessage(ControlMessage::InjectScroll(ScrollEvent::new(
                        position, h, v, self.buttons,
                    ))),
                );
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
