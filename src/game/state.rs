//! Piece State Machine
//!
//! Each piece owns a private arena of state nodes. Transitions are stored as
//! `(state, event) -> state` over small integer handles, so the graph has no
//! reference cycles and two pieces of the same type never share live
//! physics or animation data.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::cell::Color;
use crate::game::command::Command;
use crate::game::moves::Moves;
use crate::game::occupancy::Occupancy;
use crate::game::physics::Physics;

/// Handle to a node inside one `StateGraph`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(usize);

impl StateId {
    /// Index into the owning arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

// =============================================================================
// ANIMATION
// =============================================================================

/// Frame clock for a state's sprite sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    frames: Vec<String>,
    fps: f64,
    looping: bool,
    start_ms: u64,
    cur_frame: usize,
}

impl Animation {
    /// Create an animation over sprite keys.
    pub fn new(frames: Vec<String>, fps: f64, looping: bool) -> Self {
        Self {
            frames,
            fps,
            looping,
            start_ms: 0,
            cur_frame: 0,
        }
    }

    /// Restart at frame 0 from `start_ms`.
    pub fn reset(&mut self, start_ms: u64) {
        self.start_ms = start_ms;
        self.cur_frame = 0;
    }

    /// Advance the frame index to `now_ms`.
    pub fn update(&mut self, now_ms: u64) {
        if self.frames.is_empty() || self.fps <= 0.0 {
            self.cur_frame = 0;
            return;
        }
        let frame_ms = 1000.0 / self.fps;
        let elapsed = now_ms.saturating_sub(self.start_ms) as f64;
        let frames_passed = (elapsed / frame_ms) as usize;
        self.cur_frame = if self.looping {
            frames_passed % self.frames.len()
        } else {
            frames_passed.min(self.frames.len() - 1)
        };
    }

    /// Index of the frame on display.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.cur_frame
    }

    /// Sprite key of the frame on display.
    pub fn sprite(&self) -> Option<&str> {
        self.frames.get(self.cur_frame).map(String::as_str)
    }
}

// =============================================================================
// STATE GRAPH
// =============================================================================

/// One FSM state.
#[derive(Clone, Debug)]
pub struct StateNode {
    /// State name ("idle", "move", ...)
    pub name: String,
    /// Legal moves from this state
    pub moves: Arc<Moves>,
    /// Live physics
    pub physics: Physics,
    /// Live animation clock
    pub animation: Animation,
    /// Whether moves from this state need an unobstructed path
    pub need_clear_path: bool,
}

/// Arena of states plus the transition table for one piece.
#[derive(Clone, Debug, Default)]
pub struct StateGraph {
    nodes: Vec<StateNode>,
    transitions: BTreeMap<(StateId, String), StateId>,
}

impl StateGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state and return its handle.
    pub fn add_state(&mut self, node: StateNode) -> StateId {
        self.nodes.push(node);
        StateId(self.nodes.len() - 1)
    }

    /// Add or replace `from --event--> to`. Event names are case-folded.
    pub fn set_transition(&mut self, from: StateId, event: &str, to: StateId) {
        self.transitions.insert((from, event.to_ascii_lowercase()), to);
    }

    /// Handle of the state with this name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<StateId> {
        self.nodes
            .iter()
            .position(|n| n.name.eq_ignore_ascii_case(name))
            .map(StateId)
    }

    /// The `idle` state every piece starts in.
    pub fn initial(&self) -> Option<StateId> {
        self.find("idle")
    }

    /// Transition target for an event, if any.
    pub fn target(&self, from: StateId, event: &str) -> Option<StateId> {
        self.transitions
            .get(&(from, event.to_ascii_lowercase()))
            .copied()
    }

    /// Node behind a handle.
    ///
    /// Handles are only minted by `add_state` on this graph.
    pub fn node(&self, id: StateId) -> &StateNode {
        &self.nodes[id.0]
    }

    /// Mutable node behind a handle.
    pub fn node_mut(&mut self, id: StateId) -> &mut StateNode {
        &mut self.nodes[id.0]
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no states.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of transition edges.
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Re-anchor a state's physics and animation from a command.
    pub fn reset_state(&mut self, id: StateId, cmd: &Command) {
        let node = &mut self.nodes[id.0];
        node.physics.reset(cmd);
        node.animation.reset(cmd.timestamp_ms);
    }

    /// Feed an event to `current` and return the resulting state.
    ///
    /// Unknown events and illegal moves return `current` untouched; nothing
    /// is reset in that case.
    pub fn on_command(
        &mut self,
        current: StateId,
        cmd: &Command,
        occupancy: &Occupancy,
        my_color: Color,
    ) -> StateId {
        let Some(next) = self.target(current, &cmd.kind) else {
            debug!("{} has no '{}' transition, ignoring", self.nodes[current.0].name, cmd.kind);
            return current;
        };

        if cmd.is(Command::MOVE) && !self.move_is_legal(current, cmd, occupancy, my_color) {
            debug!("Refused {}", cmd);
            return current;
        }
        if cmd.is(Command::JUMP) && !self.jump_is_legal(current, cmd) {
            debug!("Refused {}: jump must start on the piece's cell", cmd);
            return current;
        }

        self.reset_state(next, cmd);
        debug!(
            "{}: {} -> {}",
            cmd.piece_id, self.nodes[current.0].name, self.nodes[next.0].name
        );
        next
    }

    fn move_is_legal(
        &self,
        current: StateId,
        cmd: &Command,
        occupancy: &Occupancy,
        my_color: Color,
    ) -> bool {
        let node = &self.nodes[current.0];
        let Some((src, dst)) = cmd.src_dst() else {
            return false;
        };
        if src != node.physics.current_cell() {
            return false;
        }
        node.moves
            .is_valid(src, dst, occupancy, node.need_clear_path, my_color)
    }

    /// A jump lands where it starts, so its only cell must be the current one.
    fn jump_is_legal(&self, current: StateId, cmd: &Command) -> bool {
        cmd.first_cell() == Some(self.nodes[current.0].physics.current_cell())
    }

    /// Advance `current` to `now_ms`.
    ///
    /// Physics completion is routed back through `on_command`; otherwise the
    /// animation clock advances and the state is kept.
    pub fn update(
        &mut self,
        current: StateId,
        now_ms: u64,
        occupancy: &Occupancy,
        my_color: Color,
    ) -> StateId {
        match self.nodes[current.0].physics.update(now_ms) {
            Some(internal) => self.on_command(current, &internal, occupancy, my_color),
            None => {
                self.nodes[current.0].animation.update(now_ms);
                current
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::BoardGeometry;
    use crate::core::cell::Cell;
    use crate::game::moves::MoveTag;
    use crate::game::occupancy::Occupant;
    use crate::game::physics::PhysicsKind;
    use crate::game::piece::PieceId;

    const ID: &str = "RW_(7,0)";

    fn node(name: &str, kind: PhysicsKind, moves: Moves) -> StateNode {
        StateNode {
            name: name.to_string(),
            moves: Arc::new(moves),
            physics: Physics::new(kind, BoardGeometry::default()),
            animation: Animation::new(vec!["1".into(), "2".into(), "3".into()], 10.0, true),
            need_clear_path: true,
        }
    }

    /// idle --move--> move --done--> rest --done--> idle
    fn rook_graph() -> (StateGraph, StateId, StateId, StateId) {
        let rules = (1..8).flat_map(|k| {
            [(k, 0), (-k, 0), (0, k), (0, -k)]
                .into_iter()
                .map(|(dr, dc)| (dr, dc, MoveTag::Any))
        });
        let mut g = StateGraph::new();
        let idle = g.add_state(node("idle", PhysicsKind::Idle, Moves::from_rules(rules, (8, 8))));
        let mv = g.add_state(node("move", PhysicsKind::Move { speed: 1.0 }, Moves::empty((8, 8))));
        let rest = g.add_state(node(
            "long_rest",
            PhysicsKind::Rest { duration_s: 2.0 },
            Moves::empty((8, 8)),
        ));
        g.set_transition(idle, "move", mv);
        g.set_transition(mv, "done", rest);
        g.set_transition(rest, "done", idle);
        g.reset_state(idle, &Command::idle(0, ID, Cell::new(7, 0)));
        (g, idle, mv, rest)
    }

    #[test]
    fn test_unknown_event_is_noop() {
        let (mut g, idle, _, _) = rook_graph();
        let occ = Occupancy::new();
        let cmd = Command::new(10, ID, "teleport", vec![Cell::new(0, 0)]);
        assert_eq!(g.on_command(idle, &cmd, &occ, Color::White), idle);
        assert_eq!(g.node(idle).physics.current_cell(), Cell::new(7, 0));
    }

    #[test]
    fn test_event_lookup_ignores_case() {
        let (mut g, idle, mv, _) = rook_graph();
        let occ = Occupancy::new();
        let cmd = Command::new(0, ID, "MOVE", vec![Cell::new(7, 0), Cell::new(5, 0)]);
        assert_eq!(g.on_command(idle, &cmd, &occ, Color::White), mv);
    }

    #[test]
    fn test_illegal_move_has_no_side_effects() {
        let (mut g, idle, mv, _) = rook_graph();
        let occ = Occupancy::new();
        let before = g.node(mv).physics.start_ms();

        let diagonal = Command::move_to(500, ID, Cell::new(7, 0), Cell::new(6, 1));
        assert_eq!(g.on_command(idle, &diagonal, &occ, Color::White), idle);
        assert_eq!(g.node(mv).physics.start_ms(), before);
    }

    #[test]
    fn test_move_from_wrong_source_refused() {
        let (mut g, idle, _, _) = rook_graph();
        let occ = Occupancy::new();
        let cmd = Command::move_to(0, ID, Cell::new(6, 0), Cell::new(4, 0));
        assert_eq!(g.on_command(idle, &cmd, &occ, Color::White), idle);
    }

    #[test]
    fn test_blocked_path_refused() {
        let (mut g, idle, _, _) = rook_graph();
        let mut occ = Occupancy::new();
        let pawn = PieceId::parse("PW_(6,0)").unwrap();
        occ.insert(Cell::new(6, 0), Occupant { color: pawn.color(), id: pawn, blocker: true });

        let cmd = Command::move_to(0, ID, Cell::new(7, 0), Cell::new(5, 0));
        assert_eq!(g.on_command(idle, &cmd, &occ, Color::White), idle);
    }

    #[test]
    fn test_full_cycle() {
        let (mut g, idle, mv, rest) = rook_graph();
        let occ = Occupancy::new();

        let cmd = Command::move_to(100, ID, Cell::new(7, 0), Cell::new(5, 0));
        let mut cur = g.on_command(idle, &cmd, &occ, Color::White);
        assert_eq!(cur, mv);
        assert_eq!(g.node(mv).physics.start_ms(), 100);

        cur = g.update(cur, 1100, &occ, Color::White);
        assert_eq!(cur, mv);
        assert_eq!(g.node(mv).physics.current_cell(), Cell::new(6, 0));

        cur = g.update(cur, 2100, &occ, Color::White);
        assert_eq!(cur, rest);
        assert_eq!(g.node(rest).physics.current_cell(), Cell::new(5, 0));

        cur = g.update(cur, 4099, &occ, Color::White);
        assert_eq!(cur, rest);
        cur = g.update(cur, 4100, &occ, Color::White);
        assert_eq!(cur, idle);
        assert_eq!(g.node(idle).physics.current_cell(), Cell::new(5, 0));
    }

    #[test]
    fn test_find_and_initial() {
        let (g, idle, _, rest) = rook_graph();
        assert_eq!(g.initial(), Some(idle));
        assert_eq!(g.find("LONG_REST"), Some(rest));
        assert_eq!(g.find("fly"), None);
        assert_eq!(g.len(), 3);
        assert_eq!(g.transition_count(), 3);
    }

    #[test]
    fn test_animation_loops() {
        let mut a = Animation::new(vec!["a".into(), "b".into(), "c".into()], 10.0, true);
        a.reset(1000);
        a.update(1250);
        assert_eq!(a.current_frame(), 2);
        a.update(1300);
        assert_eq!(a.current_frame(), 0);
        assert_eq!(a.sprite(), Some("a"));
    }

    #[test]
    fn test_animation_clamps_without_loop() {
        let mut a = Animation::new(vec!["a".into(), "b".into()], 10.0, false);
        a.reset(0);
        a.update(10_000);
        assert_eq!(a.current_frame(), 1);
        assert_eq!(a.sprite(), Some("b"));
    }

    #[test]
    fn test_animation_without_frames() {
        let mut a = Animation::new(Vec::new(), 6.0, true);
        a.update(5000);
        assert_eq!(a.current_frame(), 0);
        assert_eq!(a.sprite(), None);
    }
}
