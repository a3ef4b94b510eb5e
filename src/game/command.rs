//! Commands
//!
//! The single message type crossing every boundary: player input,
//! physics completion and FSM transitions are all commands.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::cell::Cell;

/// A timestamped event addressed to one piece.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Milliseconds since game start
    pub timestamp_ms: u64,
    /// Target piece id (empty for physics-generated events)
    pub piece_id: String,
    /// Event name: "move", "jump", "done", "idle", ...
    pub kind: String,
    /// Cell payload
    pub params: Vec<Cell>,
}

impl Command {
    /// Player move request
    pub const MOVE: &'static str = "move";
    /// Player jump request
    pub const JUMP: &'static str = "jump";
    /// Physics completion
    pub const DONE: &'static str = "done";
    /// Re-anchor at a cell
    pub const IDLE: &'static str = "idle";

    /// Create a command.
    pub fn new(
        timestamp_ms: u64,
        piece_id: impl Into<String>,
        kind: impl Into<String>,
        params: Vec<Cell>,
    ) -> Self {
        Self {
            timestamp_ms,
            piece_id: piece_id.into(),
            kind: kind.into(),
            params,
        }
    }

    /// Move from `from` to `to`.
    pub fn move_to(timestamp_ms: u64, piece_id: impl Into<String>, from: Cell, to: Cell) -> Self {
        Self::new(timestamp_ms, piece_id, Self::MOVE, vec![from, to])
    }

    /// Jump from `from` towards `to`.
    pub fn jump(timestamp_ms: u64, piece_id: impl Into<String>, from: Cell, to: Cell) -> Self {
        Self::new(timestamp_ms, piece_id, Self::JUMP, vec![from, to])
    }

    /// Physics completion at `cell`.
    pub fn done(timestamp_ms: u64, cell: Cell) -> Self {
        Self::new(timestamp_ms, String::new(), Self::DONE, vec![cell])
    }

    /// Anchor a piece at `cell`.
    pub fn idle(timestamp_ms: u64, piece_id: impl Into<String>, cell: Cell) -> Self {
        Self::new(timestamp_ms, piece_id, Self::IDLE, vec![cell])
    }

    /// Check the event name, ignoring case.
    #[inline]
    pub fn is(&self, kind: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind)
    }

    /// Lowercased event name used for transition lookup.
    pub fn event_key(&self) -> String {
        self.kind.to_ascii_lowercase()
    }

    /// First cell parameter, if any.
    #[inline]
    pub fn first_cell(&self) -> Option<Cell> {
        self.params.first().copied()
    }

    /// `(src, dst)` for two-cell commands.
    #[inline]
    pub fn src_dst(&self) -> Option<(Cell, Cell)> {
        match self.params.as_slice() {
            [src, dst, ..] => Some((*src, *dst)),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Command(t={}, piece={}, kind={}",
            self.timestamp_ms, self.piece_id, self.kind
        )?;
        for cell in &self.params {
            write!(f, ", {}", cell)?;
        }
        write!(f, ")")
    }
}
