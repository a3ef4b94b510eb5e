//! Game Logic Module
//!
//! Pieces, their state machines and the simulation loop.
//!
//! ## Module Structure
//!
//! - `command`: Timestamped piece commands
//! - `moves`: Relative move rules and path checks
//! - `physics`: Per-state motion and capture flags
//! - `occupancy`: Cell -> occupants, rebuilt every tick
//! - `state`: State graph, nodes and animations
//! - `piece`: A piece driving its own state graph
//! - `factory`: Piece catalog, config loading and layouts
//! - `collision`: Same-cell capture resolution
//! - `events`: Game events
//! - `tick`: Authoritative simulation loop

pub mod command;
pub mod moves;
pub mod physics;
pub mod occupancy;
pub mod state;
pub mod piece;
pub mod factory;
pub mod collision;
pub mod events;
pub mod tick;

// Re-export key types
pub use command::Command;
pub use moves::{MoveTag, Moves};
pub use physics::{Physics, PhysicsKind};
pub use occupancy::{Occupancy, Occupant};
pub use state::{Animation, StateGraph, StateId, StateNode};
pub use piece::{Piece, PieceId};
pub use factory::{parse_layout, PieceCatalog, PieceFactory, FactoryError, LayoutError, STANDARD_LAYOUT};
pub use collision::{CollisionRule, Capture};
pub use events::{GameEvent, GameEventData};
pub use tick::{Game, GameConfig, GameError, InvalidBoard, TickResult, RunOutcome, BoardSnapshot};
