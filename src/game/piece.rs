//! Pieces
//!
//! A piece is an identity plus its private state graph. The id encodes type,
//! colour and origin cell, e.g. `"PW_(6,6)"`.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::core::board::Board;
use crate::core::cell::{Cell, Color};
use crate::game::command::Command;
use crate::game::occupancy::Occupancy;
use crate::game::state::{StateGraph, StateId};

/// Parsed piece identifier.
///
/// Ordered by its text so collections keyed by id iterate deterministically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PieceId {
    text: String,
    code: String,
    color: Color,
    origin: Option<Cell>,
}

/// Parse the `(r,c)` tail of an id.
fn parse_origin(tail: &str) -> Option<Cell> {
    let inner = tail.strip_prefix('(')?.strip_suffix(')')?;
    let (r, c) = inner.split_once(',')?;
    Some(Cell::new(r.trim().parse().ok()?, c.trim().parse().ok()?))
}

impl PieceId {
    /// Parse an id. The second character must be `W` or `B`.
    pub fn parse(text: &str) -> Option<PieceId> {
        let mut chars = text.chars();
        let kind = chars.next()?;
        let color = Color::from_char(chars.next()?)?;
        let code: String = [kind, color.as_char()].iter().collect();
        let origin = text.split_once('_').and_then(|(_, tail)| parse_origin(tail));
        Some(PieceId {
            text: text.to_string(),
            code,
            color,
            origin,
        })
    }

    /// Build the canonical id for a piece of `code` spawned at `cell`.
    pub fn new(code: &str, cell: Cell) -> Option<PieceId> {
        PieceId::parse(&format!("{}_{}", code, cell))
    }

    /// Two-letter type code, e.g. `"PW"`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Piece colour.
    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    /// Origin cell encoded in the id, if any.
    pub fn origin(&self) -> Option<Cell> {
        self.origin
    }

    /// Full id text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Check if this is a king (`KW` / `KB`).
    pub fn is_king(&self) -> bool {
        self.code.starts_with('K')
    }
}

impl TryFrom<String> for PieceId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PieceId::parse(&value).ok_or_else(|| format!("invalid piece id: {value}"))
    }
}

impl From<PieceId> for String {
    fn from(id: PieceId) -> String {
        id.text
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A live piece.
#[derive(Clone, Debug)]
pub struct Piece {
    id: PieceId,
    graph: StateGraph,
    current: StateId,
    initial: StateId,
}

impl Piece {
    /// Wrap a graph; starts in `initial`.
    pub fn new(id: PieceId, graph: StateGraph, initial: StateId) -> Self {
        Self {
            id,
            graph,
            current: initial,
            initial,
        }
    }

    /// Identifier.
    #[inline]
    pub fn id(&self) -> &PieceId {
        &self.id
    }

    /// Colour.
    #[inline]
    pub fn color(&self) -> Color {
        self.id.color()
    }

    /// Cell derived from the current physics position.
    pub fn current_cell(&self) -> Cell {
        self.graph.node(self.current).physics.current_cell()
    }

    /// Name of the current state.
    pub fn state_name(&self) -> &str {
        &self.graph.node(self.current).name
    }

    /// Feed an external command to the FSM.
    pub fn on_command(&mut self, cmd: &Command, occupancy: &Occupancy) {
        self.current = self.graph.on_command(self.current, cmd, occupancy, self.id.color());
    }

    /// Advance physics and animation to `now_ms`.
    pub fn update(&mut self, now_ms: u64, occupancy: &Occupancy) {
        self.current = self.graph.update(self.current, now_ms, occupancy, self.id.color());
    }

    /// Return to the initial state, anchored at the origin cell from the id
    /// (or the current cell when the id carries none).
    pub fn reset(&mut self, start_ms: u64) {
        let cell = self.id.origin().unwrap_or_else(|| self.current_cell());
        let cmd = Command::idle(start_ms, self.id.as_str(), cell);
        self.current = self.initial;
        self.graph.reset_state(self.initial, &cmd);
    }

    /// Draw the current animation frame at the physics position.
    pub fn draw_on_board(&mut self, board: &mut Board, now_ms: u64) {
        let node = self.graph.node_mut(self.current);
        node.animation.update(now_ms);
        let (x, y) = node.physics.pos_pix();
        let sprite = node.animation.sprite().unwrap_or(self.id.code());
        board.surface_mut().draw_sprite(sprite, x, y);
    }

    /// Whether collision resolution may remove this piece now.
    pub fn can_be_captured(&self) -> bool {
        self.graph.node(self.current).physics.can_be_captured()
    }

    /// Whether this piece may capture now.
    pub fn can_capture(&self) -> bool {
        self.graph.node(self.current).physics.can_capture()
    }

    /// Whether this piece obstructs path-clearing checks now.
    pub fn is_movement_blocker(&self) -> bool {
        self.graph.node(self.current).physics.is_movement_blocker()
    }

    /// Time the current behaviour began.
    pub fn start_ms(&self) -> u64 {
        self.graph.node(self.current).physics.start_ms()
    }

    /// The piece's state graph.
    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_id() {
        let id = PieceId::parse("PW_(6,6)").unwrap();
        assert_eq!(id.code(), "PW");
        assert_eq!(id.color(), Color::White);
        assert_eq!(id.origin(), Some(Cell::new(6, 6)));
        assert!(!id.is_king());
    }

    #[test]
    fn test_parse_bare_code() {
        let id = PieceId::parse("KB").unwrap();
        assert_eq!(id.color(), Color::Black);
        assert_eq!(id.origin(), None);
        assert!(id.is_king());
    }

    #[test]
    fn test_parse_rejects_bad_colour() {
        assert!(PieceId::parse("PX_(1,1)").is_none());
        assert!(PieceId::parse("P").is_none());
        assert!(PieceId::parse("").is_none());
    }

    #[test]
    fn test_new_formats_canonically() {
        let id = PieceId::new("RB", Cell::new(0, 7)).unwrap();
        assert_eq!(id.as_str(), "RB_(0,7)");
        assert_eq!(id.origin(), Some(Cell::new(0, 7)));
    }

    #[test]
    fn test_serde_as_string() {
        let id = PieceId::parse("QW_(7,3)").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"QW_(7,3)\"");
        let back: PieceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<PieceId>("\"??\"").is_err());
    }

    #[test]
    fn test_ordering_is_textual() {
        let a = PieceId::parse("BB_(0,2)").unwrap();
        let b = PieceId::parse("KW_(7,4)").unwrap();
        assert!(a < b);
    }
}
