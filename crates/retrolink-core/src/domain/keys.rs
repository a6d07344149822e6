//! Logical key codes, modifier masks, and keyboard-matrix positions.
//!
//! Two distinct addressing schemes coexist, and they must never be conflated:
//!
//! - A **logical key** ([`KeyCode`] + [`ModifierMask`]) goes through the
//!   emulator's keyboard mapping layer, exactly like a key event from a real
//!   host keyboard.  This is what `keyboard.key_press` uses.
//!
//! - A **matrix position** ([`MatrixPos`]) addresses one physical switch in
//!   the 8×8 keyboard matrix directly, bypassing the mapping layer.  Games
//!   that scan the matrix themselves only see this form.
//!
//! Key codes use X11-keysym values for the named keys so that integer codes
//! supplied by clients line up with what desktop tooling already produces.

use serde_json::Value;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::protocol::errors::RpcError;

// ── Logical key codes ─────────────────────────────────────────────────────────

/// A logical key code as fed to the emulator's keyboard mapping layer.
///
/// Printable ASCII characters are their own code; named keys use the X11
/// keysym constants below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyCode(pub i32);

impl KeyCode {
    pub const RETURN: KeyCode = KeyCode(0xff0d);
    pub const BACKSPACE: KeyCode = KeyCode(0xff08);
    pub const TAB: KeyCode = KeyCode(0xff09);
    pub const ESCAPE: KeyCode = KeyCode(0xff1b);
    pub const DELETE: KeyCode = KeyCode(0xffff);
    pub const HOME: KeyCode = KeyCode(0xff50);
    pub const END: KeyCode = KeyCode(0xff57);
    pub const UP: KeyCode = KeyCode(0xff52);
    pub const DOWN: KeyCode = KeyCode(0xff54);
    pub const LEFT: KeyCode = KeyCode(0xff51);
    pub const RIGHT: KeyCode = KeyCode(0xff53);
    pub const F1: KeyCode = KeyCode(0xffbe);
    pub const F2: KeyCode = KeyCode(0xffbf);
    pub const F3: KeyCode = KeyCode(0xffc0);
    pub const F4: KeyCode = KeyCode(0xffc1);
    pub const F5: KeyCode = KeyCode(0xffc2);
    pub const F6: KeyCode = KeyCode(0xffc3);
    pub const F7: KeyCode = KeyCode(0xffc4);
    pub const F8: KeyCode = KeyCode(0xffc5);
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the `key` field of a request into a [`KeyCode`].
///
/// Accepts three forms:
///
/// - a named key (`"Return"`, `"F5"`, ...),
/// - a single character (`"A"`, `" "`), taken as its ASCII value,
/// - an integer code, taken verbatim (must fit in `i32`).
///
/// # Errors
///
/// `INVALID_PARAMS` with a field-specific message when the field is absent,
/// names an unknown key, carries an out-of-range code, or has the wrong
/// JSON type.
pub fn parse_key_code(key: Option<&Value>) -> Result<KeyCode, RpcError> {
    let key = key.ok_or_else(|| RpcError::invalid_params("Missing 'key' parameter"))?;

    if let Some(name) = key.as_str() {
        let code = match name {
            "Return" | "Enter" => KeyCode::RETURN,
            "Space" => KeyCode(' ' as i32),
            "BackSpace" => KeyCode::BACKSPACE,
            "Delete" => KeyCode::DELETE,
            "Escape" => KeyCode::ESCAPE,
            "Tab" => KeyCode::TAB,
            "Up" => KeyCode::UP,
            "Down" => KeyCode::DOWN,
            "Left" => KeyCode::LEFT,
            "Right" => KeyCode::RIGHT,
            "Home" => KeyCode::HOME,
            "End" => KeyCode::END,
            "F1" => KeyCode::F1,
            "F2" => KeyCode::F2,
            "F3" => KeyCode::F3,
            "F4" => KeyCode::F4,
            "F5" => KeyCode::F5,
            "F6" => KeyCode::F6,
            "F7" => KeyCode::F7,
            "F8" => KeyCode::F8,
            single if single.chars().count() == 1 => {
                // Single character: use its scalar value.
                KeyCode(single.chars().next().unwrap() as i32)
            }
            _ => return Err(RpcError::invalid_params("Unknown key name")),
        };
        return Ok(code);
    }

    if let Some(code) = key.as_i64() {
        let code = i32::try_from(code)
            .map_err(|_| RpcError::invalid_params("Key code out of range"))?;
        return Ok(KeyCode(code));
    }

    Err(RpcError::invalid_params("'key' must be string or number"))
}

// ── Modifier masks ────────────────────────────────────────────────────────────

/// A bit-or-combinable set of keyboard modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierMask(pub u32);

impl ModifierMask {
    pub const NONE: ModifierMask = ModifierMask(0);
    pub const SHIFT: ModifierMask = ModifierMask(1 << 0);
    pub const CONTROL: ModifierMask = ModifierMask(1 << 1);
    pub const ALT: ModifierMask = ModifierMask(1 << 2);
    pub const META: ModifierMask = ModifierMask(1 << 3);
    pub const COMMAND: ModifierMask = ModifierMask(1 << 4);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: ModifierMask) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ModifierMask {
    type Output = ModifierMask;
    fn bitor(self, rhs: ModifierMask) -> ModifierMask {
        ModifierMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for ModifierMask {
    fn bitor_assign(&mut self, rhs: ModifierMask) {
        self.0 |= rhs.0;
    }
}

/// Parses the optional `modifiers` array of a request.
///
/// A missing field, a non-array value, or an unknown modifier name all
/// degrade to "no modifiers" rather than erroring, a lenient policy that
/// keeps old clients working as new modifier names are added.
pub fn parse_modifiers(modifiers: Option<&Value>) -> ModifierMask {
    let mut mask = ModifierMask::NONE;
    let Some(list) = modifiers.and_then(Value::as_array) else {
        return mask;
    };
    for entry in list {
        if let Some(name) = entry.as_str() {
            match name {
                "shift" => mask |= ModifierMask::SHIFT,
                "control" | "ctrl" => mask |= ModifierMask::CONTROL,
                "alt" => mask |= ModifierMask::ALT,
                "meta" => mask |= ModifierMask::META,
                "command" | "cmd" => mask |= ModifierMask::COMMAND,
                _ => {}
            }
        }
    }
    mask
}

// ── Matrix positions ──────────────────────────────────────────────────────────

/// One switch in the 8×8 keyboard matrix.
///
/// Row and column are each 0–7.  Distinct from a logical [`KeyCode`]: matrix
/// state is what a directly-scanning program reads from the I/O ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatrixPos {
    pub row: u8,
    pub col: u8,
}

impl MatrixPos {
    /// Builds a position from raw row/column numbers, validating the 0–7
    /// range of each.
    pub fn new(row: i64, col: i64) -> Result<MatrixPos, RpcError> {
        if !(0..=7).contains(&row) || !(0..=7).contains(&col) {
            return Err(RpcError::invalid_params("Row and col must be 0-7"));
        }
        Ok(MatrixPos {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Resolves a named key to its matrix position.
    ///
    /// Covers the common keys, letters, and digits.  The full physical table
    /// (shifted symbols, both shift-lock variants, ...) is intentionally not
    /// reproduced here; callers needing an unlisted switch pass row/col
    /// directly.
    pub fn from_name(key: &str) -> Option<MatrixPos> {
        let (row, col) = match key {
            "SPACE" => (7, 4),
            "RETURN" => (0, 1),
            "STOP" => (7, 7),
            "F1" => (0, 4),
            "F3" => (0, 5),
            "F5" => (0, 6),
            "F7" => (0, 3),
            // The cursor keys share switches; UP and LEFT are the shifted
            // variants of the same positions.
            "UP" | "DOWN" => (0, 7),
            "LEFT" | "RIGHT" => (0, 2),
            "LSHIFT" => (1, 7),
            "RSHIFT" => (6, 4),
            "CTRL" => (7, 2),
            "CBM" | "C=" => (7, 5),
            "HOME" | "CLR" => (6, 3),
            "DEL" | "INST" => (0, 0),
            _ => {
                let mut chars = key.chars();
                let (first, rest) = (chars.next()?, chars.next());
                if rest.is_some() {
                    return None;
                }
                match first {
                    'A'..='Z' => {
                        let (row, col) = LETTER_MAP[(first as u8 - b'A') as usize];
                        (row, col)
                    }
                    '0'..='9' => {
                        let (row, col) = DIGIT_MAP[(first as u8 - b'0') as usize];
                        (row, col)
                    }
                    _ => return None,
                }
            }
        };
        Some(MatrixPos { row, col })
    }
}

impl fmt::Display for MatrixPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Matrix positions for the unshifted letters A–Z.
const LETTER_MAP: [(u8, u8); 26] = [
    (1, 2), // A
    (3, 4), // B
    (2, 4), // C
    (2, 2), // D
    (1, 6), // E
    (2, 5), // F
    (3, 2), // G
    (3, 5), // H
    (4, 1), // I
    (4, 2), // J
    (4, 5), // K
    (5, 2), // L
    (4, 4), // M
    (4, 7), // N
    (4, 6), // O
    (5, 1), // P
    (7, 6), // Q
    (2, 1), // R
    (1, 5), // S
    (2, 6), // T
    (3, 6), // U
    (3, 7), // V
    (1, 1), // W
    (2, 7), // X
    (3, 1), // Y
    (1, 4), // Z
];

/// Matrix positions for the digits 0–9.
const DIGIT_MAP: [(u8, u8); 10] = [
    (4, 3), // 0
    (7, 0), // 1
    (7, 3), // 2
    (1, 0), // 3
    (1, 3), // 4
    (2, 0), // 5
    (2, 3), // 6
    (3, 0), // 7
    (3, 3), // 8
    (4, 0), // 9
];
