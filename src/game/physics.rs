//! Piece Physics
//!
//! Continuous-time behaviour of one FSM state. Every variant shares the same
//! anchor data (start/end cell, start time, position) and differs only in
//! how `advance` moves the position and when it completes.
//!
//! | Kind | Position              | Completes            | Blocks paths | Capturable | Captures |
//! |------|-----------------------|----------------------|--------------|------------|----------|
//! | Idle | start cell            | never                | yes          | yes        | no       |
//! | Move | lerp start -> end     | distance / speed     | no           | yes        | yes      |
//! | Jump | start cell            | fixed duration       | yes          | no         | yes      |
//! | Rest | start cell            | fixed duration       | yes          | yes        | no       |

use crate::core::board::BoardGeometry;
use crate::core::cell::Cell;
use crate::core::vec2::PosM;
use crate::game::command::Command;

/// Behaviour variant with its kind-specific parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PhysicsKind {
    /// Stationary, never completes
    Idle,
    /// Linear glide between two cells
    Move {
        /// Cells per second
        speed: f64,
    },
    /// Invulnerable dodge in place
    Jump {
        /// Window length in seconds
        duration_s: f64,
    },
    /// Cooldown in place, cannot capture
    Rest {
        /// Window length in seconds
        duration_s: f64,
    },
}

impl PhysicsKind {
    /// Pick a kind from a state name: `move`, `*jump`, `*rest`, else idle.
    pub fn for_state(name: &str, speed: f64, duration_s: f64) -> Self {
        let key = name.to_ascii_lowercase();
        if key == "move" {
            PhysicsKind::Move { speed }
        } else if key.ends_with("jump") {
            PhysicsKind::Jump { duration_s }
        } else if key.ends_with("rest") {
            PhysicsKind::Rest { duration_s }
        } else {
            PhysicsKind::Idle
        }
    }
}

/// Live physics instance owned by one state node.
#[derive(Clone, Debug)]
pub struct Physics {
    kind: PhysicsKind,
    geometry: BoardGeometry,
    start_cell: Cell,
    end_cell: Cell,
    pos_m: PosM,
    start_ms: u64,
    /// Time to completion for the current anchor (seconds)
    duration_s: f64,
}

impl Physics {
    /// Create an instance anchored at (0,0), time 0.
    pub fn new(kind: PhysicsKind, geometry: BoardGeometry) -> Self {
        let duration_s = match kind {
            PhysicsKind::Jump { duration_s } | PhysicsKind::Rest { duration_s } => duration_s,
            _ => 0.0,
        };
        Self {
            kind,
            geometry,
            start_cell: Cell::new(0, 0),
            end_cell: Cell::new(0, 0),
            pos_m: PosM::ZERO,
            start_ms: 0,
            duration_s,
        }
    }

    /// Behaviour variant.
    #[inline]
    pub fn kind(&self) -> PhysicsKind {
        self.kind
    }

    /// Re-anchor from a command's timestamp and cells.
    ///
    /// Cells missing from the command keep the previous anchor.
    pub fn reset(&mut self, cmd: &Command) {
        let here = self.current_cell();
        match self.kind {
            PhysicsKind::Move { speed } => {
                let (src, dst) = cmd
                    .src_dst()
                    .or_else(|| cmd.first_cell().map(|c| (c, c)))
                    .unwrap_or((here, here));
                self.start_cell = src;
                self.end_cell = dst;
                let (dr, dc) = src.delta_to(dst);
                let distance = (dr as f64).hypot(dc as f64);
                self.duration_s = if speed > 0.0 { distance / speed } else { 0.0 };
            }
            PhysicsKind::Idle | PhysicsKind::Jump { .. } | PhysicsKind::Rest { .. } => {
                let cell = cmd.first_cell().unwrap_or(here);
                self.start_cell = cell;
                self.end_cell = cell;
            }
        }
        self.start_ms = cmd.timestamp_ms;
        self.pos_m = self.geometry.cell_to_m(self.start_cell);
    }

    /// Pure position/completion at `now_ms`, without touching `self`.
    pub fn advance(&self, now_ms: u64) -> (PosM, Option<Cell>) {
        let elapsed_s = now_ms.saturating_sub(self.start_ms) as f64 / 1000.0;
        let start = self.geometry.cell_to_m(self.start_cell);

        match self.kind {
            PhysicsKind::Idle => (start, None),
            PhysicsKind::Move { .. } => {
                if elapsed_s >= self.duration_s {
                    (self.geometry.cell_to_m(self.end_cell), Some(self.end_cell))
                } else {
                    let end = self.geometry.cell_to_m(self.end_cell);
                    (start.lerp(end, elapsed_s / self.duration_s), None)
                }
            }
            PhysicsKind::Jump { .. } | PhysicsKind::Rest { .. } => {
                if elapsed_s >= self.duration_s {
                    (start, Some(self.start_cell))
                } else {
                    (start, None)
                }
            }
        }
    }

    /// Advance to `now_ms`; returns a `done` command on completion.
    pub fn update(&mut self, now_ms: u64) -> Option<Command> {
        let (pos, done) = self.advance(now_ms);
        self.pos_m = pos;
        done.map(|cell| Command::done(now_ms, cell))
    }

    /// Current position in metres.
    #[inline]
    pub fn pos_m(&self) -> PosM {
        self.pos_m
    }

    /// Current position in pixels `(x, y)`.
    #[inline]
    pub fn pos_pix(&self) -> (i32, i32) {
        self.geometry.m_to_pix(self.pos_m)
    }

    /// Cell containing the current position.
    #[inline]
    pub fn current_cell(&self) -> Cell {
        self.geometry.m_to_cell(self.pos_m)
    }

    /// Time the current behaviour began.
    #[inline]
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }

    /// Seconds until completion from the anchor time.
    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    /// Whether a piece in this behaviour may be removed by collision.
    pub fn can_be_captured(&self) -> bool {
        !matches!(self.kind, PhysicsKind::Jump { .. })
    }

    /// Whether a piece in this behaviour may capture.
    pub fn can_capture(&self) -> bool {
        matches!(self.kind, PhysicsKind::Move { .. } | PhysicsKind::Jump { .. })
    }

    /// Whether this behaviour obstructs path-clearing checks.
    pub fn is_movement_blocker(&self) -> bool {
        !matches!(self.kind, PhysicsKind::Move { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry() -> BoardGeometry {
        BoardGeometry::default()
    }

    fn moving(speed: f64, from: Cell, to: Cell, at: u64) -> Physics {
        let mut p = Physics::new(PhysicsKind::Move { speed }, geometry());
        p.reset(&Command::move_to(at, "QW_(7,3)", from, to));
        p
    }

    #[test]
    fn test_kind_from_state_name() {
        assert_eq!(PhysicsKind::for_state("idle", 1.0, 1.0), PhysicsKind::Idle);
        assert_eq!(PhysicsKind::for_state("Move", 2.0, 1.0), PhysicsKind::Move { speed: 2.0 });
        assert_eq!(
            PhysicsKind::for_state("ready_jump", 1.0, 0.5),
            PhysicsKind::Jump { duration_s: 0.5 }
        );
        assert_eq!(
            PhysicsKind::for_state("long_rest", 1.0, 2.0),
            PhysicsKind::Rest { duration_s: 2.0 }
        );
        assert_eq!(PhysicsKind::for_state("ready", 1.0, 1.0), PhysicsKind::Idle);
    }

    #[test]
    fn test_idle_never_completes() {
        let mut p = Physics::new(PhysicsKind::Idle, geometry());
        p.reset(&Command::idle(0, "KW_(7,4)", Cell::new(7, 4)));
        assert_eq!(p.update(1_000_000), None);
        assert_eq!(p.current_cell(), Cell::new(7, 4));
        assert!(p.is_movement_blocker());
        assert!(!p.can_capture());
        assert!(p.can_be_captured());
    }

    #[test]
    fn test_move_timing() {
        let from = Cell::new(6, 6);
        let to = Cell::new(4, 6);
        let mut p = moving(1.0, from, to, 0);
        assert!((p.duration_s() - 2.0).abs() < 1e-9);

        assert_eq!(p.update(1000), None);
        assert_ne!(p.current_cell(), to);
        assert_eq!(p.pos_m(), PosM::new(6.0, 5.0));

        let done = p.update(2000).expect("move completes at its duration");
        assert!(done.is(Command::DONE));
        assert_eq!(done.first_cell(), Some(to));
        assert_eq!(p.current_cell(), to);
    }

    #[test]
    fn test_move_overshoot_snaps_to_end() {
        let to = Cell::new(3, 3);
        let mut p = moving(4.0, Cell::new(0, 0), to, 100);
        assert!(p.update(60_000).is_some());
        assert_eq!(p.pos_m(), geometry().cell_to_m(to));
    }

    #[test]
    fn test_move_non_positive_speed_completes_immediately() {
        let mut p = moving(0.0, Cell::new(1, 1), Cell::new(2, 1), 500);
        assert_eq!(p.update(500).and_then(|c| c.first_cell()), Some(Cell::new(2, 1)));
    }

    #[test]
    fn test_move_flags() {
        let p = moving(1.0, Cell::new(6, 0), Cell::new(5, 0), 0);
        assert!(!p.is_movement_blocker());
        assert!(p.can_capture());
        assert!(p.can_be_captured());
    }

    #[test]
    fn test_clock_before_anchor_is_clamped() {
        let mut p = moving(1.0, Cell::new(6, 6), Cell::new(4, 6), 5000);
        assert_eq!(p.update(10), None);
        assert_eq!(p.current_cell(), Cell::new(6, 6));
    }

    #[test]
    fn test_jump_window() {
        let mut p = Physics::new(PhysicsKind::Jump { duration_s: 1.0 }, geometry());
        p.reset(&Command::jump(200, "NW_(7,1)", Cell::new(5, 2), Cell::new(5, 2)));
        assert!(!p.can_be_captured());
        assert!(p.is_movement_blocker());

        assert_eq!(p.update(1199), None);
        let done = p.update(1200).unwrap();
        assert_eq!(done.first_cell(), Some(Cell::new(5, 2)));
        assert_eq!(done.timestamp_ms, 1200);
    }

    #[test]
    fn test_rest_window() {
        let mut p = Physics::new(PhysicsKind::Rest { duration_s: 2.0 }, geometry());
        p.reset(&Command::done(1000, Cell::new(4, 6)));
        assert!(!p.can_capture());
        assert!(p.can_be_captured());
        assert_eq!(p.update(2999), None);
        assert!(p.update(3000).is_some());
        assert_eq!(p.start_ms(), 1000);
    }

    #[test]
    fn test_reset_without_cells_keeps_anchor() {
        let mut p = Physics::new(PhysicsKind::Rest { duration_s: 1.0 }, geometry());
        p.reset(&Command::done(0, Cell::new(2, 5)));
        p.reset(&Command::new(50, "", "done", vec![]));
        assert_eq!(p.current_cell(), Cell::new(2, 5));
        assert_eq!(p.start_ms(), 50);
    }

    #[test]
    fn test_pixels_follow_geometry() {
        let geo = BoardGeometry::square_cells(8, 8, 100, 1.0);
        let mut p = Physics::new(PhysicsKind::Idle, geo);
        p.reset(&Command::idle(0, "RB_(0,7)", Cell::new(0, 7)));
        assert_eq!(p.pos_pix(), (700, 0));
    }
}
