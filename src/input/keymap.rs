//! Key Mapping
//!
//! Raw device codes are first translated to canonical key names
//! (`"enter"`, `"w"`, `"+"`, ...), then a per-player keymap turns key names
//! into logical actions.

use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};

/// Logical player action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Cursor one row up
    Up,
    /// Cursor one row down
    Down,
    /// Cursor one column left
    Left,
    /// Cursor one column right
    Right,
    /// Select / confirm a move
    Select,
    /// Jump
    Jump,
}

impl Action {
    /// Lowercase action name.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::Select => "select",
            Action::Jump => "jump",
        }
    }

    /// Check if the action moves the cursor.
    pub fn is_cursor_move(self) -> bool {
        matches!(self, Action::Up | Action::Down | Action::Left | Action::Right)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key name -> action.
pub type Keymap = BTreeMap<String, Action>;

/// Player one: `ijkl` to steer, enter to select, `+` to jump.
pub fn player_one_keymap() -> Keymap {
    [
        ("i", Action::Up),
        ("k", Action::Down),
        ("j", Action::Left),
        ("l", Action::Right),
        ("enter", Action::Select),
        ("+", Action::Jump),
    ]
    .into_iter()
    .map(|(k, a)| (k.to_string(), a))
    .collect()
}

/// Player two: `wasd` to steer, `f` to select, `g` to jump.
pub fn player_two_keymap() -> Keymap {
    [
        ("w", Action::Up),
        ("s", Action::Down),
        ("a", Action::Left),
        ("d", Action::Right),
        ("f", Action::Select),
        ("g", Action::Jump),
    ]
    .into_iter()
    .map(|(k, a)| (k.to_string(), a))
    .collect()
}

/// Translate a raw device key code to a canonical key name.
///
/// Letters are case-folded. Unknown codes yield `None`.
pub fn translate_key_code(code: i32) -> Option<String> {
    let name = match code {
        27 => "esc",
        10 | 13 => "enter",
        32 => " ",
        43 => "+",
        45 => "-",
        8 => "backspace",
        9 => "tab",
        81 | 2490368 => "up",
        83 | 2621440 => "down",
        82 | 2424832 => "left",
        84 | 2555904 => "right",
        _ => {
            let c = u8::try_from(code).ok().map(char::from)?;
            return c.is_ascii_alphanumeric().then(|| c.to_ascii_lowercase().to_string());
        }
    };
    Some(name.to_string())
}
