//! Canonically ordered sets of keys.

use std::fmt;

use crate::key::Key;
use crate::registry::KeyRegistry;

/// A set of keys that must be held together.
///
/// Keys are kept sorted by kind priority then name, so two combinations built
/// from the same keys in any order are equal and hash alike.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCombination {
    keys: Vec<Key>,
}

impl KeyCombination {
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        let mut keys: Vec<Key> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        Self { keys }
    }

    #[must_use]
    pub fn single(key: Key) -> Self {
        Self { keys: vec![key] }
    }

    /// Parse text such as `"Ctrl_L+A"`, resolving each name in the registry.
    ///
    /// Returns `None` when the text names no keys.
    pub fn parse(text: &str, registry: &mut KeyRegistry) -> Option<Self> {
        let keys: Vec<Key> = text
            .split('+')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| registry.deserialize(name))
            .collect();
        if keys.is_empty() {
            None
        } else {
            Some(Self::new(keys))
        }
    }

    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.keys.binary_search(key).is_ok()
    }

    /// Every key of `self` is also in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.keys.iter().all(|k| other.contains(k))
    }

    #[must_use]
    pub fn is_strict_subset_of(&self, other: &Self) -> bool {
        self.len() < other.len() && self.is_subset_of(other)
    }

    #[must_use]
    pub fn has_modifiers(&self) -> bool {
        self.keys.iter().any(Key::is_modifier)
    }
}

impl From<Key> for KeyCombination {
    fn from(key: Key) -> Self {
        Self::single(key)
    }
}

impl FromIterator<Key> for KeyCombination {
    fn from_iter<T: IntoIterator<Item = Key>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.keys.iter().map(Key::name).collect();
        names.sort_unstable();
        f.write_str(&names.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyKind;
    use proptest::prelude::*;

    fn key(registry: &KeyRegistry, name: &str) -> Key {
        registry.get_by_name(name).cloned().expect("registered key")
    }

    #[test]
    fn canonical_order() {
        let registry = KeyRegistry::new();
        let combo = KeyCombination::new([key(&registry, "A"), key(&registry, "Ctrl_L")]);
        let names: Vec<&str> = combo.keys().iter().map(Key::name).collect();
        assert_eq!(names, ["Ctrl_L", "A"]);
        assert!(combo.has_modifiers());
    }

    #[test]
    fn display_sorts_names() {
        let registry = KeyRegistry::new();
        let combo = KeyCombination::new([key(&registry, "Ctrl_L"), key(&registry, "A")]);
        assert_eq!(combo.to_string(), "A+Ctrl_L");
    }

    #[test]
    fn parse_and_subsets() {
        let mut registry = KeyRegistry::new();
        let full = KeyCombination::parse("Ctrl_L + Shift_L + A", &mut registry).expect("parsed");
        let part = KeyCombination::parse("Shift_L+A", &mut registry).expect("parsed");
        assert_eq!(full.len(), 3);
        assert!(part.is_subset_of(&full));
        assert!(part.is_strict_subset_of(&full));
        assert!(!full.is_subset_of(&part));
        assert!(full.is_subset_of(&full));
        assert!(!full.is_strict_subset_of(&full));
        assert!(KeyCombination::parse(" + ", &mut registry).is_none());
    }

    #[test]
    fn duplicates_collapse() {
        let a = Key::new("A", 0x41, KeyKind::Character);
        let combo = KeyCombination::new([a.clone(), a.clone()]);
        assert_eq!(combo, KeyCombination::single(a));
    }

    proptest! {
        #[test]
        fn order_independent(mut picks in prop::collection::vec(0usize..20, 1..6)) {
            let registry = KeyRegistry::new();
            let pool = [
                "Ctrl_L", "Shift_L", "Alt_R", "Super_L", "Enter", "F1", "F5", "Space",
                "A", "B", "W", "S", "D", "1", "9", "Mouse_Left", "Mouse_Right",
                "Tab", "Escape", "Home",
            ];
            let forward = KeyCombination::new(picks.iter().map(|&i| key(&registry, pool[i])));
            picks.reverse();
            let backward: KeyCombination = picks.iter().map(|&i| key(&registry, pool[i])).collect();
            prop_assert_eq!(&forward, &backward);
            prop_assert!(forward.keys().windows(2).all(|w| w[0] < w[1]));
        }
    }
}
