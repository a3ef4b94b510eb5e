//! Board Cells and Piece Colours
//!
//! Discrete board positions. Ordered so they can key a BTreeMap.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A board cell as `(row, col)`.
///
/// Rows grow downwards (row 0 is black's back rank), columns grow rightwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Row index
    pub row: i32,
    /// Column index
    pub col: i32,
}

impl Cell {
    /// Create a cell.
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Offset `(dr, dc)` from `self` to `other`.
    #[inline]
    pub fn delta_to(self, other: Cell) -> (i32, i32) {
        (other.row - self.row, other.col - self.col)
    }

    /// Check if the cell lies inside a `rows x cols` board.
    #[inline]
    pub fn in_bounds(self, rows: i32, cols: i32) -> bool {
        (0..rows).contains(&self.row) && (0..cols).contains(&self.col)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((row, col): (i32, i32)) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// Piece colour. White is driven by player 1, black by player 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    /// White pieces (`W`)
    White,
    /// Black pieces (`B`)
    Black,
}

impl Color {
    /// Decode the colour letter used in piece codes.
    pub fn from_char(c: char) -> Option<Color> {
        match c {
            'W' => Some(Color::White),
            'B' => Some(Color::Black),
            _ => None,
        }
    }

    /// Colour letter used in piece codes.
    pub fn as_char(self) -> char {
        match self {
            Color::White => 'W',
            Color::Black => 'B',
        }
    }

    /// The other colour.
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_and_bounds() {
        let a = Cell::new(6, 6);
        let b = Cell::new(4, 7);
        assert_eq!(a.delta_to(b), (-2, 1));

        assert!(a.in_bounds(8, 8));
        assert!(!Cell::new(8, 0).in_bounds(8, 8));
        assert!(!Cell::new(0, -1).in_bounds(8, 8));
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::new(7, 0).to_string(), "(7,0)");
    }

    #[test]
    fn test_color_letters() {
        assert_eq!(Color::from_char('W'), Some(Color::White));
        assert_eq!(Color::from_char('B'), Some(Color::Black));
        assert_eq!(Color::from_char('X'), None);
        assert_eq!(Color::White.opponent().as_char(), 'B');
    }
}
