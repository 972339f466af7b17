//! Host keysym to Android keycode mapping.
//!
//! Keys fall into three groups that the default keyboard handler treats
//! differently depending on the inject mode: navigation/editing keys that are
//! always sent as key events, letters and space, and digits/punctuation.

use crate::keysym;

/// Convert a keysym to an Android keycode using every table.
#[must_use]
pub fn keysym_to_android(keysym: i32) -> Option<u32> {
    special_keycode(keysym)
        .or_else(|| alphaspace_keycode(keysym))
        .or_else(|| numbers_punct_keycode(keysym))
}

/// Keys that are sent as key events in every inject mode.
#[must_use]
pub fn special_keycode(sym: i32) -> Option<u32> {
    let code = match sym {
        keysym::RETURN => 66,       // ENTER
        keysym::KP_ENTER => 160,    // NUMPAD_ENTER
        keysym::ESCAPE => 111,      // ESCAPE
        keysym::BACKSPACE => 67,    // DEL
        keysym::DELETE => 112,      // FORWARD_DEL
        keysym::TAB => 61,          // TAB
        keysym::ISO_LEFT_TAB => 61, // TAB
        keysym::PAGE_UP => 92,      // PAGE_UP
        keysym::PAGE_DOWN => 93,    // PAGE_DOWN
        keysym::HOME => 122,        // MOVE_HOME
        keysym::END => 123,         // MOVE_END
        keysym::INSERT => 124,      // INSERT
        keysym::UP => 19,           // DPAD_UP
        keysym::DOWN => 20,         // DPAD_DOWN
        keysym::LEFT => 21,         // DPAD_LEFT
        keysym::RIGHT => 22,        // DPAD_RIGHT
        keysym::CONTROL_L => 113,   // CTRL_LEFT
        keysym::CONTROL_R => 114,   // CTRL_RIGHT
        keysym::SHIFT_L => 59,      // SHIFT_LEFT
        keysym::SHIFT_R => 60,      // SHIFT_RIGHT
        _ => return None,
    };
    Some(code)
}

/// Letters (either case) and space.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn alphaspace_keycode(sym: i32) -> Option<u32> {
    let lower = keysym::to_lower(sym);
    match lower {
        // AKEYCODE_A is 29 and the alphabet is contiguous.
        0x61..=0x7a => Some(29 + (lower - 0x61) as u32),
        keysym::SPACE => Some(62),
        _ => None,
    }
}

/// Digits, punctuation and the numeric keypad.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn numbers_punct_keycode(sym: i32) -> Option<u32> {
    let code = match sym {
        // AKEYCODE_0 is 7, AKEYCODE_NUMPAD_0 is 144.
        0x30..=0x39 => 7 + (sym - 0x30) as u32,
        keysym::KP_0..=keysym::KP_9 => 144 + (sym - keysym::KP_0) as u32,
        0x23 => 18,                // POUND
        0x27 => 75,                // APOSTROPHE
        0x2a => 17,                // STAR
        0x2b => 81,                // PLUS
        0x2c => 55,                // COMMA
        0x2d => 69,                // MINUS
        0x2e => 56,                // PERIOD
        0x2f => 76,                // SLASH
        0x3b => 74,                // SEMICOLON
        0x3d => 70,                // EQUALS
        0x40 => 77,                // AT
        0x5b => 71,                // LEFT_BRACKET
        0x5c => 73,                // BACKSLASH
        0x5d => 72,                // RIGHT_BRACKET
        0x60 => 68,                // GRAVE
        keysym::KP_DIVIDE => 154,  // NUMPAD_DIVIDE
        keysym::KP_MULTIPLY => 155, // NUMPAD_MULTIPLY
        keysym::KP_SUBTRACT => 156, // NUMPAD_SUBTRACT
        keysym::KP_ADD => 157,     // NUMPAD_ADD
        keysym::KP_DECIMAL => 158, // NUMPAD_DOT
        keysym::KP_EQUAL => 161,   // NUMPAD_EQUALS
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_keys() {
        assert_eq!(special_keycode(keysym::RETURN), Some(66));
        assert_eq!(special_keycode(keysym::BACKSPACE), Some(67));
        assert_eq!(special_keycode(keysym::ISO_LEFT_TAB), Some(61));
        assert_eq!(special_keycode(keysym::RIGHT), Some(22));
        assert_eq!(special_keycode(i32::from(b'a')), None);
    }

    #[test]
    fn test_letters_and_space() {
        assert_eq!(alphaspace_keycode(i32::from(b'a')), Some(29));
        assert_eq!(alphaspace_keycode(i32::from(b'Z')), Some(54));
        assert_eq!(alphaspace_keycode(keysym::SPACE), Some(62));
        assert_eq!(alphaspace_keycode(i32::from(b'1')), None);
    }

    #[test]
    fn test_digits_and_punctuation() {
        assert_eq!(numbers_punct_keycode(i32::from(b'0')), Some(7));
        assert_eq!(numbers_punct_keycode(i32::from(b'9')), Some(16));
        assert_eq!(numbers_punct_keycode(0xffb5), Some(149));
        assert_eq!(numbers_punct_keycode(i32::from(b',')), Some(55));
        assert_eq!(numbers_punct_keycode(keysym::KP_ADD), Some(157));
    }

    #[test]
    fn test_unmapped_returns_none() {
        assert_eq!(keysym_to_android(keysym::F1), None);
        assert_eq!(keysym_to_android(0x0100_00e9), None);
        assert_eq!(keysym_to_android(keysym::RETURN), Some(66));
    }
}
