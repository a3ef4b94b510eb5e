//! Game Events
//!
//! Events generated during simulation, returned from each tick for logging
//! and replay comparison.

use serde::{Serialize, Deserialize};

use crate::core::cell::{Cell, Color};
use crate::game::piece::PieceId;

/// Priority for event ordering within one tick.
///
/// Lower value = reported first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventPriority {
    /// Captures first
    Capture = 0,
    /// Match result last
    MatchEnd = 1,
}

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// A piece was removed by collision resolution
    PieceCaptured {
        /// Removed piece
        victim: PieceId,
        /// Piece that held the cell
        winner: PieceId,
        /// Where it happened
        cell: Cell,
    },

    /// Fewer than two kings remain
    MatchEnded {
        /// Colour whose king survived, if any
        winner: Option<Color>,
    },
}

/// A game event with timing and priority.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick index when the event occurred
    pub tick: u64,

    /// Game time in milliseconds
    pub time_ms: u64,

    /// Ordering priority
    pub priority: EventPriority,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(tick: u64, time_ms: u64, priority: EventPriority, data: GameEventData) -> Self {
        Self {
            tick,
            time_ms,
            priority,
            data,
        }
    }

    /// Create piece captured event.
    pub fn piece_captured(tick: u64, time_ms: u64, victim: PieceId, winner: PieceId, cell: Cell) -> Self {
        Self::new(
            tick,
            time_ms,
            EventPriority::Capture,
            GameEventData::PieceCaptured { victim, winner, cell },
        )
    }

    /// Create match ended event.
    pub fn match_ended(tick: u64, time_ms: u64, winner: Option<Color>) -> Self {
        Self::new(tick, time_ms, EventPriority::MatchEnd, GameEventData::MatchEnded { winner })
    }

    /// Victim id for capture events.
    pub fn victim(&self) -> Option<&PieceId> {
        match &self.data {
            GameEventData::PieceCaptured { victim, .. } => Some(victim),
            GameEventData::MatchEnded { .. } => None,
        }
    }
}

impl PartialEq for GameEvent {
    fn eq(&self, other: &Self) -> bool {
        self.tick == other.tick && self.priority == other.priority && self.data == other.data
    }
}

impl Eq for GameEvent {}

impl PartialOrd for GameEvent {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GameEvent {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Sort by: tick, then priority, then victim id
        self.tick
            .cmp(&other.tick)
            .then(self.priority.cmp(&other.priority))
            .then_with(|| self.victim().cmp(&other.victim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PieceId {
        PieceId::parse(s).unwrap()
    }

    #[test]
    fn test_event_ordering() {
        let end = GameEvent::match_ended(10, 160, Some(Color::White));
        let capture = GameEvent::piece_captured(10, 160, id("KB_(0,4)"), id("QW_(7,3)"), Cell::new(0, 4));
        let earlier = GameEvent::piece_captured(9, 144, id("PB_(1,1)"), id("PW_(6,0)"), Cell::new(3, 1));

        let mut events = vec![end.clone(), capture.clone(), earlier.clone()];
        events.sort();
        assert_eq!(events, vec![earlier, capture, end]);
    }

    #[test]
    fn test_victim_accessor() {
        let capture = GameEvent::piece_captured(1, 16, id("PB_(1,1)"), id("PW_(6,0)"), Cell::new(3, 1));
        assert_eq!(capture.victim().map(PieceId::as_str), Some("PB_(1,1)"));
        assert_eq!(GameEvent::match_ended(1, 16, None).victim(), None);
    }

    #[test]
    fn test_event_serializes() {
        let capture = GameEvent::piece_captured(3, 48, id("PB_(1,1)"), id("PW_(6,0)"), Cell::new(3, 1));
        let json = serde_json::to_string(&capture).unwrap();
        assert!(json.contains("\"PB_(1,1)\""));
        let back: GameEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, capture);
    }
}
