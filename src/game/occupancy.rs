//! Occupancy Map
//!
//! Instantaneous "what's where": rebuilt every tick from each piece's
//! physics-derived cell. Never persisted.

use std::collections::BTreeMap;

use crate::core::cell::{Cell, Color};
use crate::game::piece::{Piece, PieceId};

/// A piece as seen from the occupancy map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupant {
    /// Piece identifier
    pub id: PieceId,
    /// Piece colour
    pub color: Color,
    /// Whether the piece obstructs path-clearing checks
    pub blocker: bool,
}

/// Cell -> pieces currently resolving to that cell.
///
/// BTreeMap keeps iteration order deterministic.
#[derive(Clone, Debug, Default)]
pub struct Occupancy {
    cells: BTreeMap<Cell, Vec<Occupant>>,
}

impl Occupancy {
    /// Empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Rebuild from each piece's physics-derived cell.
    pub fn rebuild<'a>(&mut self, pieces: impl IntoIterator<Item = &'a Piece>) {
        self.clear();
        for piece in pieces {
            self.insert(
                piece.current_cell(),
                Occupant {
                    id: piece.id().clone(),
                    color: piece.color(),
                    blocker: piece.is_movement_blocker(),
                },
            );
        }
    }

    /// Record a piece at a cell.
    pub fn insert(&mut self, cell: Cell, occupant: Occupant) {
        self.cells.entry(cell).or_default().push(occupant);
    }

    /// Pieces at a cell (empty slice if none).
    pub fn at(&self, cell: Cell) -> &[Occupant] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// A piece of `color` is at the cell.
    pub fn has_color_at(&self, cell: Cell, color: Color) -> bool {
        self.at(cell).iter().any(|o| o.color == color)
    }

    /// The cell holds an own-colour movement blocker.
    pub fn blocks_path(&self, cell: Cell, my_color: Color) -> bool {
        self.at(cell).iter().any(|o| o.color == my_color && o.blocker)
    }

    /// Cells holding two or more pieces.
    pub fn crowded(&self) -> impl Iterator<Item = (Cell, &[Occupant])> {
        self.cells
            .iter()
            .filter(|(_, v)| v.len() >= 2)
            .map(|(c, v)| (*c, v.as_slice()))
    }

    /// All occupied cells in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, &[Occupant])> {
        self.cells.iter().map(|(c, v)| (*c, v.as_slice()))
    }

    /// Number of occupied cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if no cell is occupied.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
