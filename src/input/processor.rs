//! Keyboard Processor
//!
//! Thread-safe cursor bounded to the board, driven by key names through a
//! player keymap.

use std::sync::Mutex;

use crate::core::cell::Cell;
use crate::input::keymap::{Action, Keymap};

/// One player's cursor and keymap.
///
/// Shared via `Arc` between the producer thread (writes) and the renderer
/// (reads). The lock is held only for a single cursor read or update.
#[derive(Debug)]
pub struct KeyboardProcessor {
    rows: i32,
    cols: i32,
    keymap: Keymap,
    cursor: Mutex<Cell>,
}

impl KeyboardProcessor {
    /// Processor for a `rows x cols` board, cursor at (0,0).
    pub fn new(rows: i32, cols: i32, keymap: Keymap) -> Self {
        Self {
            rows,
            cols,
            keymap,
            cursor: Mutex::new(Cell::new(0, 0)),
        }
    }

    /// Decode a key name. Cursor moves are applied here; every mapped
    /// action is returned so the caller can react to `select`/`jump`.
    pub fn process_key(&self, key: &str) -> Option<Action> {
        let action = *self.keymap.get(key)?;
        if action.is_cursor_move() {
            let mut cursor = self.lock();
            match action {
                Action::Up if cursor.row > 0 => cursor.row -= 1,
                Action::Down if cursor.row < self.rows - 1 => cursor.row += 1,
                Action::Left if cursor.col > 0 => cursor.col -= 1,
                Action::Right if cursor.col < self.cols - 1 => cursor.col += 1,
                _ => {}
            }
        }
        Some(action)
    }

    /// Current cursor cell.
    pub fn cursor(&self) -> Cell {
        *self.lock()
    }

    /// Place the cursor, clamped to the board.
    pub fn set_cursor(&self, cell: Cell) {
        let clamped = Cell::new(
            cell.row.clamp(0, (self.rows - 1).max(0)),
            cell.col.clamp(0, (self.cols - 1).max(0)),
        );
        *self.lock() = clamped;
    }

    /// The keymap in use.
    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    /// A poisoned lock still holds a valid cell.
    fn lock(&self) -> std::sync::MutexGuard<'_, Cell> {
        self.cursor.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keymap::{player_one_keymap, player_two_keymap};

    #[test]
    fn test_cursor_moves_and_clamps() {
        let kp = KeyboardProcessor::new(8, 8, player_two_keymap());
        assert_eq!(kp.process_key("w"), Some(Action::Up));
        assert_eq!(kp.cursor(), Cell::new(0, 0));

        kp.process_key("s");
        kp.process_key("d");
        kp.process_key("d");
        assert_eq!(kp.cursor(), Cell::new(1, 2));
        kp.process_key("a");
        assert_eq!(kp.cursor(), Cell::new(1, 1));
    }

    #[test]
    fn test_bottom_right_edge() {
        let kp = KeyboardProcessor::new(8, 8, player_one_keymap());
        kp.set_cursor(Cell::new(7, 7));
        kp.process_key("k");
        kp.process_key("l");
        assert_eq!(kp.cursor(), Cell::new(7, 7));
    }

    #[test]
    fn test_select_and_jump_leave_cursor() {
        let kp = KeyboardProcessor::new(8, 8, player_one_keymap());
        kp.set_cursor(Cell::new(6, 4));
        assert_eq!(kp.process_key("enter"), Some(Action::Select));
        assert_eq!(kp.process_key("+"), Some(Action::Jump));
        assert_eq!(kp.cursor(), Cell::new(6, 4));
    }

    #[test]
    fn test_unmapped_key() {
        let kp = KeyboardProcessor::new(8, 8, player_one_keymap());
        assert_eq!(kp.process_key("w"), None);
        assert_eq!(kp.process_key(""), None);
    }

    #[test]
    fn test_set_cursor_clamps() {
        let kp = KeyboardProcessor::new(8, 8, player_one_keymap());
        kp.set_cursor(Cell::new(12, -3));
        assert_eq!(kp.cursor(), Cell::new(7, 0));
    }
}
