//! Host input events as seen by the handler chain.

use touch_keys::{Key, KeyRegistry, Modifiers};

use crate::geometry::Point;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    KeyPress {
        key: Key,
        keyval: i32,
        modifiers: Modifiers,
    },
    KeyRelease {
        key: Key,
        keyval: i32,
        modifiers: Modifiers,
    },
    ButtonPress {
        key: Key,
        button: u32,
        position: Point,
    },
    ButtonRelease {
        key: Key,
        button: u32,
        position: Point,
    },
    /// Absolute cursor motion over the frame.
    Motion { position: Point },
    /// Unaccelerated motion deltas from a locked pointer.
    RelativeMotion { dx: f64, dy: f64 },
    Scroll { dx: f64, dy: f64 },
}

impl InputEvent {
    /// Key press for a host keyval and GDK modifier state.
    #[must_use]
    pub fn key_press(registry: &KeyRegistry, keyval: i32, state: u32) -> Self {
        Self::KeyPress {
            key: registry.create_from_keyval(keyval),
            keyval,
            modifiers: Modifiers::from_gdk_state(state),
        }
    }

    #[must_use]
    pub fn key_release(registry: &KeyRegistry, keyval: i32, state: u32) -> Self {
        Self::KeyRelease {
            key: registry.create_from_keyval(keyval),
            keyval,
            modifiers: Modifiers::from_gdk_state(state),
        }
    }

    pub fn button_press(registry: &mut KeyRegistry, button: u32, position: Point) -> Self {
        Self::ButtonPress {
            key: registry.create_mouse_key(button),
            button,
            position,
        }
    }

    pub fn button_release(registry: &mut KeyRegistry, button: u32, position: Point) -> Self {
        Self::ButtonRelease {
            key: registry.create_mouse_key(button),
            button,
            position,
        }
    }

    /// The key carried by key and button events.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        match self {
            Self::KeyPress { key, .. }
            | Self::KeyRelease { key, .. }
            | Self::ButtonPress { key, .. }
            | Self::ButtonRelease { key, .. } => Some(key),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_press(&self) -> bool {
        matches!(self, Self::KeyPress { .. } | Self::ButtonPress { .. })
    }

    #[must_use]
    pub fn is_release(&self) -> bool {
        matches!(self, Self::KeyRelease { .. } | Self::ButtonRelease { .. })
    }

    /// Cursor position for events that carry one.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::ButtonPress { position, .. }
            | Self::ButtonRelease { position, .. }
            | Self::Motion { position } => Some(*position),
            _ => None,
        }
    }
}
