//! Key model for the touchmap input engine.
//!
//! Host key and mouse button events are normalised into [`Key`]s through a
//! [`KeyRegistry`]; widgets bind to [`KeyCombination`]s of those keys.

pub mod combination;
pub mod key;
pub mod keymap;
pub mod keysym;
pub mod modifiers;
pub mod registry;

pub use combination::KeyCombination;
pub use key::{Key, KeyKind};
pub use modifiers::Modifiers;
pub use registry::KeyRegistry;
