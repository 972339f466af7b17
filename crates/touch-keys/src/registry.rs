//! Keyval and name lookup for [`Key`]s.

use std::collections::HashMap;

use crate::key::{Key, KeyKind};
use crate::keysym;

const MODIFIERS: &[(&str, i32)] = &[
    ("Ctrl_L", keysym::CONTROL_L),
    ("Ctrl_R", keysym::CONTROL_R),
    ("Alt_L", keysym::ALT_L),
    ("Alt_R", keysym::ALT_R),
    ("Shift_L", keysym::SHIFT_L),
    ("Shift_R", keysym::SHIFT_R),
    ("Super_L", keysym::SUPER_L),
    ("Super_R", keysym::SUPER_R),
];

const FUNCTION_KEYS: &[(&str, i32)] = &[
    ("Enter", keysym::RETURN),
    ("Escape", keysym::ESCAPE),
    ("Backspace", keysym::BACKSPACE),
    ("Delete", keysym::DELETE),
    ("Tab", keysym::TAB),
    ("Home", keysym::HOME),
    ("End", keysym::END),
    ("PageUp", keysym::PAGE_UP),
    ("PageDown", keysym::PAGE_DOWN),
    ("Insert", keysym::INSERT),
    ("Left", keysym::LEFT),
    ("Right", keysym::RIGHT),
    ("Up", keysym::UP),
    ("Down", keysym::DOWN),
];

const MOUSE_BUTTONS: &[(u32, &str)] = &[
    (1, "Mouse_Left"),
    (2, "Mouse_Middle"),
    (3, "Mouse_Right"),
    (8, "Mouse_Back"),
    (9, "Mouse_Forward"),
];

/// Registry of known keys, indexed by keyval and by name.
///
/// A fresh registry is pre-populated with modifiers, navigation and function
/// keys, `Space`, letters, digits and the common mouse buttons. Keys created
/// by [`KeyRegistry::create_mouse_key`] and [`KeyRegistry::deserialize`] are
/// registered so that later lookups return the same key.
#[derive(Debug, Clone)]
pub struct KeyRegistry {
    by_keyval: HashMap<i32, Key>,
    by_name: HashMap<String, Key>,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyRegistry {
    /// Create a registry with the default key set.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();

        for &(name, keyval) in MODIFIERS {
            registry.register(name, keyval, KeyKind::Modifier);
        }
        for &(name, keyval) in FUNCTION_KEYS {
            registry.register(name, keyval, KeyKind::Function);
        }
        for n in 0..12 {
            registry.register(&format!("F{}", n + 1), keysym::F1 + n, KeyKind::Function);
        }
        registry.register("Space", keysym::SPACE, KeyKind::Special);

        for upper in b'A'..=b'Z' {
            let key = registry.register(
                &char::from(upper).to_string(),
                i32::from(upper),
                KeyKind::Character,
            );
            // Lower-case keyvals resolve to the same key.
            registry.by_keyval.insert(i32::from(upper.to_ascii_lowercase()), key);
        }
        for digit in b'0'..=b'9' {
            registry.register(
                &char::from(digit).to_string(),
                i32::from(digit),
                KeyKind::Character,
            );
        }

        for &(button, name) in MOUSE_BUTTONS {
            registry.register(name, mouse_keyval(button), KeyKind::Mouse);
        }

        registry
    }

    /// Create a registry without any keys.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            by_keyval: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Register a key, replacing any previous entry with the same name or keyval.
    pub fn register(&mut self, name: &str, keyval: i32, kind: KeyKind) -> Key {
        let key = Key::new(name, keyval, kind);
        self.by_keyval.insert(keyval, key.clone());
        self.by_name.insert(name.to_owned(), key.clone());
        key
    }

    #[must_use]
    pub fn get_by_keyval(&self, keyval: i32) -> Option<&Key> {
        self.by_keyval.get(&keyval)
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Key> {
        self.by_name.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Resolve a host keyval into a key.
    ///
    /// Unknown printable ASCII becomes an upper-cased character key; anything
    /// else becomes a special key named after its keysym (or `Key<n>`).
    /// Neither fallback is registered.
    #[must_use]
    pub fn create_from_keyval(&self, keyval: i32) -> Key {
        if let Some(key) = self.get_by_keyval(keyval) {
            return key.clone();
        }

        if keysym::is_printable_ascii(keyval) {
            let name: String = keysym::to_char(keyval)
                .map(|c| c.to_ascii_uppercase().to_string())
                .unwrap_or_default();
            return Key::new(name, keyval, KeyKind::Character);
        }

        let name = keysym::name(keyval).map_or_else(|| format!("Key{keyval}"), str::to_owned);
        Key::new(name, keyval, KeyKind::Special)
    }

    /// Key for a host mouse button, registering `Mouse_Button<n>` on first use.
    pub fn create_mouse_key(&mut self, button: u32) -> Key {
        let name = MOUSE_BUTTONS
            .iter()
            .find_map(|&(b, name)| (b == button).then(|| name.to_owned()))
            .unwrap_or_else(|| format!("Mouse_Button{button}"));

        if let Some(key) = self.get_by_name(&name) {
            return key.clone();
        }
        self.register(&name, mouse_keyval(button), KeyKind::Mouse)
    }

    /// Resolve a serialized key name, registering whatever it creates.
    ///
    /// Never fails: names that cannot be resolved become a special key with
    /// keyval 0 so that stored layouts keep loading.
    pub fn deserialize(&mut self, name: &str) -> Key {
        if let Some(key) = self.get_by_name(name) {
            return key.clone();
        }

        let created = deserialize_uncached(name);
        self.register(created.name(), created.keyval(), created.kind())
    }
}

fn deserialize_uncached(name: &str) -> Key {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if (' '..='~').contains(&c) {
            let upper = c.to_ascii_uppercase();
            return Key::new(upper.to_string(), upper as i32, KeyKind::Character);
        }
    }

    if let Some(rest) = name.strip_prefix("Mouse") {
        let digits = rest.strip_prefix("_Button").unwrap_or(rest);
        if let Ok(button) = digits.parse::<u32>() {
            return Key::new(name, mouse_keyval(button), KeyKind::Mouse);
        }
    }

    if let Some(keyval) = keysym::from_name(name) {
        let kind = if keysym::is_printable_ascii(keyval) {
            KeyKind::Character
        } else {
            KeyKind::Special
        };
        return Key::new(name, keyval, kind);
    }

    tracing::warn!(name, "Unknown key name, using placeholder key");
    Key::new(name, 0, KeyKind::Special)
}

#[allow(clippy::cast_possible_wrap)]
fn mouse_keyval(button: u32) -> i32 {
    -(button as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys_present() {
        let registry = KeyRegistry::new();
        assert_eq!(registry.get_by_name("Ctrl_L").map(Key::kind), Some(KeyKind::Modifier));
        assert_eq!(registry.get_by_name("Enter").map(Key::keyval), Some(keysym::RETURN));
        assert_eq!(registry.get_by_name("F12").map(Key::keyval), Some(keysym::F12));
        assert_eq!(registry.get_by_name("Space").map(Key::kind), Some(KeyKind::Special));
        assert_eq!(registry.get_by_name("7").map(Key::kind), Some(KeyKind::Character));
        assert_eq!(registry.get_by_name("Mouse_Back").map(Key::keyval), Some(-8));
    }

    #[test]
    fn letters_resolve_from_either_case() {
        let registry = KeyRegistry::new();
        let upper = registry.get_by_keyval(i32::from(b'W')).cloned();
        let lower = registry.get_by_keyval(i32::from(b'w')).cloned();
        assert!(upper.is_some());
        assert_eq!(upper, lower);
        assert_eq!(upper.map(|k| k.keyval()), Some(i32::from(b'W')));
    }

    #[test]
    fn create_from_keyval_fallbacks() {
        let registry = KeyRegistry::new();

        let comma = registry.create_from_keyval(0x2c);
        assert_eq!(comma.name(), ",");
        assert_eq!(comma.kind(), KeyKind::Character);

        let kp = registry.create_from_keyval(0xffb1);
        assert_eq!(kp.name(), "KP_1");
        assert_eq!(kp.kind(), KeyKind::Special);

        let unknown = registry.create_from_keyval(0x0042_4242);
        assert_eq!(unknown.name(), "Key4342338");
        assert_eq!(registry.get_by_keyval(0x0042_4242), None);
    }

    #[test]
    fn mouse_keys_are_registered_once() {
        let mut registry = KeyRegistry::new();
        assert_eq!(registry.create_mouse_key(1).name(), "Mouse_Left");

        let extra = registry.create_mouse_key(12);
        assert_eq!(extra.name(), "Mouse_Button12");
        assert_eq!(extra.keyval(), -12);
        assert_eq!(registry.get_by_name("Mouse_Button12"), Some(&extra));
        assert_eq!(registry.create_mouse_key(12), extra);
    }

    #[test]
    fn deserialize_paths() {
        let mut registry = KeyRegistry::new();

        assert_eq!(registry.deserialize("Ctrl_L").kind(), KeyKind::Modifier);

        let semicolon = registry.deserialize(";");
        assert_eq!(semicolon.kind(), KeyKind::Character);
        assert_eq!(semicolon.keyval(), 0x3b);

        let mouse = registry.deserialize("Mouse4");
        assert_eq!(mouse.kind(), KeyKind::Mouse);
        assert_eq!(mouse.keyval(), -4);

        let caps = registry.deserialize("Caps_Lock");
        assert_eq!(caps.kind(), KeyKind::Special);
        assert_eq!(caps.keyval(), keysym::CAPS_LOCK);

        let bogus = registry.deserialize("Bogus");
        assert_eq!(bogus.kind(), KeyKind::Special);
        assert_eq!(bogus.keyval(), 0);
        assert_eq!(registry.get_by_name("Bogus"), Some(&bogus));
    }
}
