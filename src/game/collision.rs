//! Collision Resolution
//!
//! Deterministic same-cell conflict handling. Cells are visited in sorted
//! order; within a cell one piece holds the square and every capturable
//! enemy sharing it is removed.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

use crate::core::cell::Cell;
use crate::game::occupancy::Occupancy;
use crate::game::piece::{Piece, PieceId};

/// Which piece holds a contested cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionRule {
    /// The piece whose current behaviour began last (the arriving attacker)
    #[default]
    MostRecentArrival,
    /// The piece whose current behaviour began first
    LongestStanding,
}

/// A removal decided by collision resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capture {
    /// Removed piece
    pub victim: PieceId,
    /// Piece holding the cell
    pub winner: PieceId,
    /// Contested cell
    pub cell: Cell,
}

/// Pick the piece holding a cell. Ties on `start_ms` go to the smaller id.
pub fn cell_winner<'a>(contenders: &[&'a Piece], rule: CollisionRule) -> Option<&'a Piece> {
    let by_id = |a: &&Piece, b: &&Piece| b.id().cmp(a.id());
    match rule {
        CollisionRule::MostRecentArrival => contenders
            .iter()
            .copied()
            .max_by(|a, b| a.start_ms().cmp(&b.start_ms()).then_with(|| by_id(a, b))),
        CollisionRule::LongestStanding => contenders
            .iter()
            .copied()
            .min_by(|a, b| a.start_ms().cmp(&b.start_ms()).then_with(|| a.id().cmp(b.id()))),
    }
}

/// Check every crowded cell and list the pieces to remove.
///
/// Same-colour co-occupants are never removed.
pub fn check_all_collisions(
    pieces: &BTreeMap<PieceId, Piece>,
    occupancy: &Occupancy,
    rule: CollisionRule,
) -> Vec<Capture> {
    let mut captures = Vec::new();

    for (cell, occupants) in occupancy.crowded() {
        let contenders: Vec<&Piece> = occupants
            .iter()
            .filter_map(|o| pieces.get(&o.id))
            .collect();
        let Some(winner) = cell_winner(&contenders, rule) else {
            continue;
        };

        for piece in &contenders {
            if piece.id() == winner.id() {
                continue;
            }
            if piece.color() != winner.color() && piece.can_be_captured() {
                captures.push(Capture {
                    victim: piece.id().clone(),
                    winner: winner.id().clone(),
                    cell,
                });
            }
        }
    }

    captures
}
