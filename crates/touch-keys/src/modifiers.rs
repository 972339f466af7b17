//! Modifier state carried by host key events.

const GDK_SHIFT_MASK: u32 = 1 << 0;
const GDK_CONTROL_MASK: u32 = 1 << 2;
const GDK_ALT_MASK: u32 = 1 << 3;
const GDK_SUPER_MASK: u32 = 1 << 26;
const GDK_META_MASK: u32 = 1 << 28;

/// Which modifiers were held when a host event was produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Decode a GDK modifier mask. `Super` counts as meta.
    #[must_use]
    pub const fn from_gdk_state(state: u32) -> Self {
        Self {
            shift: state & GDK_SHIFT_MASK != 0,
            ctrl: state & GDK_CONTROL_MASK != 0,
            alt: state & GDK_ALT_MASK != 0,
            meta: state & (GDK_META_MASK | GDK_SUPER_MASK) != 0,
        }
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        !(self.shift || self.ctrl || self.alt || self.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_gdk_mask() {
        let mods = Modifiers::from_gdk_state(GDK_SHIFT_MASK | GDK_CONTROL_MASK);
        assert!(mods.shift && mods.ctrl);
        assert!(!mods.alt && !mods.meta);

        assert!(Modifiers::from_gdk_state(GDK_SUPER_MASK).meta);
        assert!(Modifiers::from_gdk_state(0).is_empty());
        // Button masks are not modifiers.
        assert!(Modifiers::from_gdk_state(1 << 8).is_empty());
    }
}
