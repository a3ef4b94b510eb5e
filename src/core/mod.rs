//! Core primitives.
//!
//! Cells, metric vectors, board geometry, time sources and state hashing.
//! Nothing here knows about pieces or rules.

pub mod cell;
pub mod vec2;
pub mod board;
pub mod clock;
pub mod hash;

// Re-export core types
pub use cell::{Cell, Color};
pub use vec2::PosM;
pub use board::{Board, BoardGeometry, DrawOp, RecordingSurface, Surface};
pub use clock::{Clock, ManualClock, SystemClock};
pub use hash::{StateHash, StateHasher};
