//! # Kung Fu Chess
//!
//! Real-time chess engine: no turns, every piece runs its own state machine
//! and moves continuously across the board.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       KUNG FU CHESS                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Primitives                                │
//! │  ├── cell.rs     - Grid cells and colours                    │
//! │  ├── vec2.rs     - Metric positions                          │
//! │  ├── board.rs    - Geometry and render surface               │
//! │  ├── clock.rs    - System and manual clocks                  │
//! │  └── hash.rs     - Snapshot hashing                          │
//! │                                                              │
//! │  game/           - Simulation                                │
//! │  ├── moves.rs    - Move rules and path checks                │
//! │  ├── physics.rs  - Idle / move / jump / rest motion          │
//! │  ├── state.rs    - Per-piece state graph                     │
//! │  ├── factory.rs  - Piece catalog and layouts                 │
//! │  ├── collision.rs- Same-cell captures                        │
//! │  └── tick.rs     - Authoritative simulation loop             │
//! │                                                              │
//! │  input/          - Keyboard threads (non-deterministic)      │
//! │  ├── keymap.rs   - Key codes, key names, actions             │
//! │  ├── processor.rs- Shared cursor                             │
//! │  └── producer.rs - Producer threads and selection            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Threading
//!
//! Producer threads only move cursors and emit intents. Pieces, occupancy
//! and the command queue drain belong to the thread calling [`Game::tick`].
//! With a [`ManualClock`] and the same commands, two runs end in the same
//! [`BoardSnapshot`] hash.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod input;

// Re-export commonly used types
pub use crate::core::{Board, BoardGeometry, Cell, Clock, Color, ManualClock, PosM, SystemClock};
pub use game::{BoardSnapshot, Command, Game, GameConfig, GameError, GameEvent, Piece, PieceFactory, PieceId};
pub use input::{Action, InputIntent, KeyboardProcessor, KeyboardProducer, Player};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal simulation tick rate (Hz)
pub const TICK_RATE: u32 = 60;

/// Sleep between ticks in `Game::run` (about 1000 / `TICK_RATE`)
pub const TICK_INTERVAL_MS: u64 = 16;
