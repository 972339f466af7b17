//! X11/GDK keysym values and their canonical names.
//!
//! Host input arrives as keysyms (the `keyval` of a GDK key event). Printable
//! ASCII keysyms are equal to their code point; everything else lives in the
//! `0xfe00..=0xffff` function block or the `0x0100_0000` Unicode block.

pub const SPACE: i32 = 0x0020;
pub const ISO_LEFT_TAB: i32 = 0xfe20;
pub const BACKSPACE: i32 = 0xff08;
pub const TAB: i32 = 0xff09;
pub const RETURN: i32 = 0xff0d;
pub const PAUSE: i32 = 0xff13;
pub const SCROLL_LOCK: i32 = 0xff14;
pub const ESCAPE: i32 = 0xff1b;
pub const HOME: i32 = 0xff50;
pub const LEFT: i32 = 0xff51;
pub const UP: i32 = 0xff52;
pub const RIGHT: i32 = 0xff53;
pub const DOWN: i32 = 0xff54;
pub const PAGE_UP: i32 = 0xff55;
pub const PAGE_DOWN: i32 = 0xff56;
pub const END: i32 = 0xff57;
pub const INSERT: i32 = 0xff63;
pub const MENU: i32 = 0xff67;
pub const NUM_LOCK: i32 = 0xff7f;
pub const KP_ENTER: i32 = 0xff8d;
pub const KP_MULTIPLY: i32 = 0xffaa;
pub const KP_ADD: i32 = 0xffab;
pub const KP_SUBTRACT: i32 = 0xffad;
pub const KP_DECIMAL: i32 = 0xffae;
pub const KP_DIVIDE: i32 = 0xffaf;
pub const KP_0: i32 = 0xffb0;
pub const KP_9: i32 = 0xffb9;
pub const KP_EQUAL: i32 = 0xffbd;
pub const F1: i32 = 0xffbe;
pub const F12: i32 = 0xffc9;
pub const SHIFT_L: i32 = 0xffe1;
pub const SHIFT_R: i32 = 0xffe2;
pub const CONTROL_L: i32 = 0xffe3;
pub const CONTROL_R: i32 = 0xffe4;
pub const CAPS_LOCK: i32 = 0xffe5;
pub const META_L: i32 = 0xffe7;
pub const META_R: i32 = 0xffe8;
pub const ALT_L: i32 = 0xffe9;
pub const ALT_R: i32 = 0xffea;
pub const SUPER_L: i32 = 0xffeb;
pub const SUPER_R: i32 = 0xffec;
pub const DELETE: i32 = 0xffff;

/// Keysyms with a name that is not a single printable character.
const NAMED: &[(i32, &str)] = &[
    (ISO_LEFT_TAB, "ISO_Left_Tab"),
    (BACKSPACE, "BackSpace"),
    (TAB, "Tab"),
    (RETURN, "Return"),
    (PAUSE, "Pause"),
    (SCROLL_LOCK, "Scroll_Lock"),
    (ESCAPE, "Escape"),
    (HOME, "Home"),
    (LEFT, "Left"),
    (UP, "Up"),
    (RIGHT, "Right"),
    (DOWN, "Down"),
    (PAGE_UP, "Page_Up"),
    (PAGE_DOWN, "Page_Down"),
    (END, "End"),
    (INSERT, "Insert"),
    (MENU, "Menu"),
    (NUM_LOCK, "Num_Lock"),
    (KP_ENTER, "KP_Enter"),
    (KP_MULTIPLY, "KP_Multiply"),
    (KP_ADD, "KP_Add"),
    (KP_SUBTRACT, "KP_Subtract"),
    (KP_DECIMAL, "KP_Decimal"),
    (KP_DIVIDE, "KP_Divide"),
    (0xffb0, "KP_0"),
    (0xffb1, "KP_1"),
    (0xffb2, "KP_2"),
    (0xffb3, "KP_3"),
    (0xffb4, "KP_4"),
    (0xffb5, "KP_5"),
    (0xffb6, "KP_6"),
    (0xffb7, "KP_7"),
    (0xffb8, "KP_8"),
    (0xffb9, "KP_9"),
    (KP_EQUAL, "KP_Equal"),
    (0xffbe, "F1"),
    (0xffbf, "F2"),
    (0xffc0, "F3"),
    (0xffc1, "F4"),
    (0xffc2, "F5"),
    (0xffc3, "F6"),
    (0xffc4, "F7"),
    (0xffc5, "F8"),
    (0xffc6, "F9"),
    (0xffc7, "F10"),
    (0xffc8, "F11"),
    (0xffc9, "F12"),
    (SHIFT_L, "Shift_L"),
    (SHIFT_R, "Shift_R"),
    (CONTROL_L, "Control_L"),
    (CONTROL_R, "Control_R"),
    (CAPS_LOCK, "Caps_Lock"),
    (META_L, "Meta_L"),
    (META_R, "Meta_R"),
    (ALT_L, "Alt_L"),
    (ALT_R, "Alt_R"),
    (SUPER_L, "Super_L"),
    (SUPER_R, "Super_R"),
    (DELETE, "Delete"),
];

/// Names of the printable ASCII keysyms, indexed by `keysym - 0x20`.
const PRINTABLE: [&str; 95] = [
    "space", "exclam", "quotedbl", "numbersign", "dollar", "percent", "ampersand",
    "apostrophe", "parenleft", "parenright", "asterisk", "plus", "comma", "minus",
    "period", "slash", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "colon",
    "semicolon", "less", "equal", "greater", "question", "at", "A", "B", "C", "D",
    "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T",
    "U", "V", "W", "X", "Y", "Z", "bracketleft", "backslash", "bracketright",
    "asciicircum", "underscore", "grave", "a", "b", "c", "d", "e", "f", "g", "h",
    "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x",
    "y", "z", "braceleft", "bar", "braceright", "asciitilde",
];

/// Whether the keysym is a printable ASCII character (`0x20..=0x7e`).
#[must_use]
pub fn is_printable_ascii(keysym: i32) -> bool {
    (0x20..=0x7e).contains(&keysym)
}

/// Canonical name of a keysym, if known.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn name(keysym: i32) -> Option<&'static str> {
    if is_printable_ascii(keysym) {
        return Some(PRINTABLE[(keysym - 0x20) as usize]);
    }
    NAMED
        .iter()
        .find_map(|&(sym, name)| (sym == keysym).then_some(name))
}

/// Look up a keysym by its canonical name.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn from_name(name: &str) -> Option<i32> {
    if let Some(idx) = PRINTABLE.iter().position(|&n| n == name) {
        return Some(idx as i32 + 0x20);
    }
    NAMED
        .iter()
        .find_map(|&(sym, n)| (n == name).then_some(sym))
}

/// Lower-case variant of a letter keysym; other keysyms are returned as is.
#[must_use]
pub fn to_lower(keysym: i32) -> i32 {
    if (i32::from(b'A')..=i32::from(b'Z')).contains(&keysym) {
        keysym + 0x20
    } else {
        keysym
    }
}

/// The character a keysym produces, if any.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn to_char(keysym: i32) -> Option<char> {
    match keysym {
        0x20..=0x7e | 0xa0..=0xff => char::from_u32(keysym as u32),
        KP_0..=KP_9 => char::from_digit((keysym - KP_0) as u32, 10),
        KP_MULTIPLY => Some('*'),
        KP_ADD => Some('+'),
        KP_SUBTRACT => Some('-'),
        KP_DECIMAL => Some('.'),
        KP_DIVIDE => Some('/'),
        KP_EQUAL => Some('='),
        0x0100_0000..=0x0110_ffff => char::from_u32((keysym - 0x0100_0000) as u32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_names() {
        assert_eq!(name(0x20), Some("space"));
        assert_eq!(name(i32::from(b'a')), Some("a"));
        assert_eq!(name(i32::from(b'~')), Some("asciitilde"));
        assert_eq!(from_name("comma"), Some(0x2c));
    }

    #[test]
    fn function_block_names() {
        assert_eq!(name(RETURN), Some("Return"));
        assert_eq!(name(F12), Some("F12"));
        assert_eq!(from_name("Control_L"), Some(CONTROL_L));
        assert_eq!(from_name("KP_7"), Some(0xffb7));
        assert_eq!(from_name("NoSuchKey"), None);
        assert_eq!(name(0x1234), None);
    }

    #[test]
    fn chars() {
        assert_eq!(to_char(i32::from(b'q')), Some('q'));
        assert_eq!(to_char(0xffb3), Some('3'));
        assert_eq!(to_char(0x0100_00e9), Some('é'));
        assert_eq!(to_char(RETURN), None);
        assert_eq!(to_lower(i32::from(b'Q')), i32::from(b'q'));
        assert_eq!(to_lower(RETURN), RETURN);
    }
}
