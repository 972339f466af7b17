//! Immutable key identities.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Category of a key.
///
/// The declaration order is the sort priority used by key combinations:
/// modifiers first, mouse buttons last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    Modifier,
    Function,
    Special,
    Character,
    Mouse,
}

impl KeyKind {
    /// Numeric sort priority (0 = modifier ... 4 = mouse).
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Modifier => 0,
            Self::Function => 1,
            Self::Special => 2,
            Self::Character => 3,
            Self::Mouse => 4,
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Modifier => "modifier",
            Self::Function => "function",
            Self::Special => "special",
            Self::Character => "character",
            Self::Mouse => "mouse",
        };
        f.write_str(name)
    }
}

/// A key as seen by the mapping engine.
///
/// Keys are cheap to clone (the name is shared) and compare equal only when
/// name, keyval and kind all match. Mouse buttons use negative keyvals
/// (button `n` is `-n`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    name: Arc<str>,
    keyval: i32,
    kind: KeyKind,
}

impl Key {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, keyval: i32, kind: KeyKind) -> Self {
        Self {
            name: name.into(),
            keyval,
            kind,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn keyval(&self) -> i32 {
        self.keyval
    }

    #[must_use]
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    #[must_use]
    pub fn is_modifier(&self) -> bool {
        self.kind == KeyKind::Modifier
    }

    #[must_use]
    pub fn is_mouse(&self) -> bool {
        self.kind == KeyKind::Mouse
    }

    /// Mouse button number for mouse keys (`Mouse_Left` is 1).
    #[must_use]
    pub fn mouse_button(&self) -> Option<u32> {
        if self.is_mouse() {
            self.keyval.checked_neg().and_then(|b| u32::try_from(b).ok())
        } else {
            None
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.kind
            .cmp(&other.kind)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.keyval.cmp(&other.keyval))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_kind_then_name() {
        let ctrl = Key::new("Ctrl_L", 0xffe3, KeyKind::Modifier);
        let f1 = Key::new("F1", 0xffbe, KeyKind::Function);
        let space = Key::new("Space", 0x20, KeyKind::Special);
        let a = Key::new("A", 0x41, KeyKind::Character);
        let b = Key::new("B", 0x42, KeyKind::Character);
        let mouse = Key::new("Mouse_Left", -1, KeyKind::Mouse);

        let mut keys = vec![mouse.clone(), b.clone(), a.clone(), space.clone(), f1.clone(), ctrl.clone()];
        keys.sort();
        assert_eq!(keys, vec![ctrl, f1, space, a, b, mouse]);
    }

    #[test]
    fn equality_uses_all_fields() {
        let a = Key::new("A", 0x41, KeyKind::Character);
        assert_eq!(a, Key::new("A", 0x41, KeyKind::Character));
        assert_ne!(a, Key::new("A", 0x61, KeyKind::Character));
        assert_ne!(a, Key::new("A", 0x41, KeyKind::Special));
    }

    #[test]
    fn mouse_button_numbers() {
        assert_eq!(Key::new("Mouse_Right", -3, KeyKind::Mouse).mouse_button(), Some(3));
        assert_eq!(Key::new("A", 0x41, KeyKind::Character).mouse_button(), None);
        assert_eq!(KeyKind::Special.priority(), 2);
    }
}
