//! Authoritative Simulation Loop
//!
//! `Game` owns the pieces, the occupancy map, the command queue and all
//! selection state. Input threads only push intents or commands; every
//! piece mutation happens here, on the simulation thread.
//!
//! Per tick:
//!
//! 1. Update every piece against last tick's occupancy
//! 2. Rebuild occupancy
//! 3. Turn pending input intents into commands
//! 4. Drain the command queue and apply each command
//! 5. Draw (optional)
//! 6. Resolve collisions
//! 7. Check for a win

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::core::board::{Board, BoardGeometry};
use crate::core::cell::{Cell, Color};
use crate::core::clock::Clock;
use crate::core::hash::{StateHash, StateHasher};
use crate::game::collision::{check_all_collisions, CollisionRule};
use crate::game::command::Command;
use crate::game::events::GameEvent;
use crate::game::factory::{parse_layout, FactoryError, LayoutError, PieceFactory, STANDARD_LAYOUT};
use crate::game::occupancy::Occupancy;
use crate::game::piece::{Piece, PieceId};
use crate::input::keymap::{player_one_keymap, player_two_keymap, Keymap};
use crate::input::processor::KeyboardProcessor;
use crate::input::producer::{InputIntent, KeySource, KeyboardProducer, Player, SelectionGesture};

/// Player one's cursor outline colour (RGB).
pub const PLAYER_ONE_CURSOR: [u8; 3] = [0, 255, 0];
/// Player two's cursor outline colour (RGB).
pub const PLAYER_TWO_CURSOR: [u8; 3] = [0, 0, 255];

// =============================================================================
// ERRORS
// =============================================================================

/// Starting position rejected at construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidBoard {
    /// A colour has no king.
    #[error("missing {0} king")]
    MissingKing(Color),

    /// Two pieces start on one cell.
    #[error("two pieces start on {0}")]
    DuplicateCell(Cell),
}

/// Game construction errors.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Invalid starting position.
    #[error(transparent)]
    InvalidBoard(#[from] InvalidBoard),

    /// A piece could not be built.
    #[error(transparent)]
    Factory(#[from] FactoryError),

    /// The layout could not be parsed.
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

// =============================================================================
// CONFIG & RESULTS
// =============================================================================

/// Configuration for a game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Sleep between ticks in `run` (0 = no sleep)
    pub tick_interval_ms: u64,
    /// Board rows
    pub board_rows: i32,
    /// Board columns
    pub board_cols: i32,
    /// Cell edge in pixels
    pub cell_size_pix: i32,
    /// Cell edge in metres
    pub cell_size_m: f64,
    /// Player one key bindings
    pub player_one_keys: Keymap,
    /// Player two key bindings
    pub player_two_keys: Keymap,
    /// Player one initial cursor
    pub player_one_cursor: Cell,
    /// Player two initial cursor
    pub player_two_cursor: Cell,
    /// Producer thread poll interval
    pub producer_poll_ms: u64,
    /// Who holds a contested cell
    pub collision_rule: CollisionRule,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: crate::TICK_INTERVAL_MS,
            board_rows: 8,
            board_cols: 8,
            cell_size_pix: 64,
            cell_size_m: 1.0,
            player_one_keys: player_one_keymap(),
            player_two_keys: player_two_keymap(),
            player_one_cursor: Cell::new(7, 0),
            player_two_cursor: Cell::new(0, 0),
            producer_poll_ms: 5,
            collision_rule: CollisionRule::default(),
        }
    }
}

impl GameConfig {
    /// Parse JSON; malformed input yields the defaults.
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(config) => config,
            Err(e) => {
                warn!("Malformed game config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Board geometry described by this config.
    pub fn geometry(&self) -> BoardGeometry {
        BoardGeometry::square_cells(self.board_rows, self.board_cols, self.cell_size_pix, self.cell_size_m)
    }
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Whether the match ended this tick
    pub match_ended: bool,
    /// Surviving king's colour (if match ended with one)
    pub winner: Option<Color>,
}

/// Result of `run`/`resume`.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Ticks executed
    pub ticks: u64,
    /// All events, in order
    pub events: Vec<GameEvent>,
    /// Whether the loop stopped on a win
    pub match_ended: bool,
    /// Surviving king's colour
    pub winner: Option<Color>,
}

/// One piece in a snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceSnapshot {
    /// Piece id
    pub id: PieceId,
    /// Current state name
    pub state: String,
    /// Current cell
    pub cell: Cell,
    /// Start time of the current behaviour
    pub start_ms: u64,
}

/// Serializable view of the board at one instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Game time
    pub time_ms: u64,
    /// Pieces in id order
    pub pieces: Vec<PieceSnapshot>,
}

impl BoardSnapshot {
    /// SHA-256 over the pieces in id order.
    pub fn state_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_board_state();
        hasher.update_u32(self.pieces.len() as u32);
        for piece in &self.pieces {
            hasher.update_str(piece.id.as_str());
            hasher.update_str(&piece.state);
            hasher.update_cell(piece.cell);
            hasher.update_u64(piece.start_ms);
        }
        hasher.finalize()
    }

    /// Snapshot entry for an id.
    pub fn piece(&self, id: &str) -> Option<&PieceSnapshot> {
        self.pieces.iter().find(|p| p.id.as_str() == id)
    }
}

// =============================================================================
// GAME
// =============================================================================

/// A running match.
pub struct Game {
    config: GameConfig,
    pieces: BTreeMap<PieceId, Piece>,
    occupancy: Occupancy,
    board: Board,
    clock: Arc<dyn Clock>,
    start_ms: u64,
    tick_count: u64,

    queue: Arc<Mutex<VecDeque<Command>>>,
    intent_tx: UnboundedSender<InputIntent>,
    intent_rx: UnboundedReceiver<InputIntent>,
    processors: [Arc<KeyboardProcessor>; 2],
    gestures: [SelectionGesture; 2],
    key_sources: Vec<(Player, Box<dyn KeySource>)>,
    producers: Vec<KeyboardProducer>,
}

fn player_slot(player: Player) -> usize {
    match player {
        Player::One => 0,
        Player::Two => 1,
    }
}

impl Game {
    /// Create a game over already built pieces.
    ///
    /// Fails if a king is missing or two pieces share a starting cell.
    pub fn new(
        pieces: Vec<Piece>,
        board: Board,
        config: GameConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GameError> {
        Self::validate(&pieces)?;

        let (rows, cols) = board.geometry.dims();
        let p1 = KeyboardProcessor::new(rows, cols, config.player_one_keys.clone());
        p1.set_cursor(config.player_one_cursor);
        let p2 = KeyboardProcessor::new(rows, cols, config.player_two_keys.clone());
        p2.set_cursor(config.player_two_cursor);
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();

        let pieces: BTreeMap<PieceId, Piece> =
            pieces.into_iter().map(|p| (p.id().clone(), p)).collect();
        let mut occupancy = Occupancy::new();
        occupancy.rebuild(pieces.values());

        let start_ms = clock.now_ms();
        info!("Game created with {} pieces", pieces.len());

        Ok(Self {
            config,
            pieces,
            occupancy,
            board,
            clock,
            start_ms,
            tick_count: 0,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            intent_tx,
            intent_rx,
            processors: [Arc::new(p1), Arc::new(p2)],
            gestures: [SelectionGesture::new(), SelectionGesture::new()],
            key_sources: Vec::new(),
            producers: Vec::new(),
        })
    }

    /// Build every piece named in a layout and create the game.
    pub fn from_layout(
        layout: &str,
        factory: &PieceFactory,
        board: Board,
        config: GameConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GameError> {
        let pieces = parse_layout(layout)?
            .into_iter()
            .map(|(code, cell)| factory.create_piece(&code, cell))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(pieces, board, config, clock)
    }

    /// Classic opening position with the standard piece set on a headless board.
    pub fn standard(config: GameConfig, clock: Arc<dyn Clock>) -> Result<Self, GameError> {
        let geometry = config.geometry();
        let factory = PieceFactory::standard(geometry);
        Self::from_layout(STANDARD_LAYOUT, &factory, Board::headless(geometry), config, clock)
    }

    /// Check the starting position.
    pub fn validate(pieces: &[Piece]) -> Result<(), InvalidBoard> {
        let mut seen = BTreeSet::new();
        let mut has_white_king = false;
        let mut has_black_king = false;

        for piece in pieces {
            let id = piece.id();
            if id.is_king() {
                has_white_king |= id.color() == Color::White;
                has_black_king |= id.color() == Color::Black;
            }
            let cell = piece.current_cell();
            if !seen.insert(cell) {
                return Err(InvalidBoard::DuplicateCell(cell));
            }
        }

        if !has_white_king {
            return Err(InvalidBoard::MissingKing(Color::White));
        }
        if !has_black_king {
            return Err(InvalidBoard::MissingKing(Color::Black));
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    /// Milliseconds since the game was created.
    pub fn game_time_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.start_ms)
    }

    /// Independent copy of the board, surface included.
    pub fn clone_board(&self) -> Board {
        self.board.clone()
    }

    /// Game configuration.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Live piece by id text.
    pub fn piece(&self, id: &str) -> Option<&Piece> {
        let id = PieceId::parse(id)?;
        self.pieces.get(&id)
    }

    /// Live pieces in id order.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    /// Number of live pieces.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Occupancy as of the last rebuild.
    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    /// Ticks executed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Cursor processor for a player.
    pub fn processor(&self, player: Player) -> &Arc<KeyboardProcessor> {
        &self.processors[player_slot(player)]
    }

    /// Selection gesture state for a player.
    pub fn gesture(&self, player: Player) -> &SelectionGesture {
        &self.gestures[player_slot(player)]
    }

    // ===== INPUT =====

    /// Queue a command for the next tick.
    pub fn enqueue_command(&self, cmd: Command) {
        match self.queue.lock() {
            Ok(mut queue) => queue.push_back(cmd),
            Err(poisoned) => poisoned.into_inner().push_back(cmd),
        }
    }

    /// Handle to the command queue for other threads.
    pub fn command_queue(&self) -> Arc<Mutex<VecDeque<Command>>> {
        Arc::clone(&self.queue)
    }

    /// Sender for input intents, drained once per tick.
    pub fn intent_sender(&self) -> UnboundedSender<InputIntent> {
        self.intent_tx.clone()
    }

    /// Give a player's producer a raw key device. Takes effect on the next
    /// `run`/`resume`.
    pub fn attach_key_source(&mut self, player: Player, source: Box<dyn KeySource>) {
        self.key_sources.push((player, source));
    }

    /// Spawn one producer thread per player.
    pub fn start_user_input(&mut self) {
        if !self.producers.is_empty() {
            return;
        }
        let poll = Duration::from_millis(self.config.producer_poll_ms);
        let mut sources: Vec<_> = std::mem::take(&mut self.key_sources);
        for player in [Player::One, Player::Two] {
            let source = sources
                .iter()
                .position(|(p, _)| *p == player)
                .map(|i| sources.remove(i).1);
            self.producers.push(KeyboardProducer::start(
                player,
                Arc::clone(&self.processors[player_slot(player)]),
                source,
                self.intent_tx.clone(),
                poll,
            ));
        }
    }

    /// Stop and join producer threads. Half-finished selections are dropped.
    pub fn stop_user_input(&mut self) {
        for mut producer in self.producers.drain(..) {
            producer.stop();
        }
        for gesture in &mut self.gestures {
            gesture.clear();
        }
    }

    /// Producer for a player while input is running.
    pub fn producer(&self, player: Player) -> Option<&KeyboardProducer> {
        self.producers.iter().find(|p| p.player() == player)
    }

    // ===== LOOP =====

    /// Put every piece back into its initial state at the current game time.
    pub fn reset_pieces(&mut self) {
        let now = self.game_time_ms();
        for piece in self.pieces.values_mut() {
            piece.reset(now);
        }
        self.occupancy.rebuild(self.pieces.values());
    }

    /// Reset pieces, start input, and loop until a win or `num_iterations`.
    pub fn run(&mut self, num_iterations: Option<usize>, with_graphics: bool) -> RunOutcome {
        self.reset_pieces();
        self.resume(num_iterations, with_graphics)
    }

    /// Loop without resetting pieces.
    pub fn resume(&mut self, num_iterations: Option<usize>, with_graphics: bool) -> RunOutcome {
        self.start_user_input();
        let mut outcome = RunOutcome::default();
        let interval = Duration::from_millis(self.config.tick_interval_ms);

        while !self.is_win() {
            let result = self.tick(with_graphics);
            outcome.ticks += 1;
            outcome.events.extend(result.events);
            if result.match_ended {
                break;
            }
            if num_iterations.is_some_and(|limit| outcome.ticks as usize >= limit) {
                break;
            }
            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }

        self.stop_user_input();
        outcome.match_ended = self.is_win();
        if outcome.match_ended {
            outcome.winner = self.winner();
            if with_graphics {
                self.board.show();
            }
            match outcome.winner {
                Some(color) => info!("Game over: {} wins", color),
                None => info!("Game over: no king left"),
            }
        }
        outcome
    }

    /// Run one simulation tick.
    pub fn tick(&mut self, with_graphics: bool) -> TickResult {
        let mut result = TickResult::default();
        let now = self.game_time_ms();
        self.tick_count += 1;

        // 1. Physics, against the previous tick's occupancy
        for piece in self.pieces.values_mut() {
            piece.update(now, &self.occupancy);
        }

        // 2. Occupancy
        self.occupancy.rebuild(self.pieces.values());

        #[cfg(feature = "debug-tracing")]
        for (cell, occupants) in self.occupancy.iter() {
            tracing::trace!(tick = self.tick_count, %cell, pieces = occupants.len(), "occupancy");
        }

        // 3. Intents -> commands
        self.process_intents(now);

        // 4. Commands, FIFO
        let commands: Vec<Command> = match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for cmd in commands {
            self.process_input(cmd, now);
        }

        // 5. Render
        if with_graphics {
            self.draw(now);
        }

        // 6. Collisions
        self.process_collisions(now, &mut result);

        // 7. End condition
        self.check_end_conditions(now, &mut result);

        result
    }

    /// Check if fewer than two kings remain.
    pub fn is_win(&self) -> bool {
        self.king_count() < 2
    }

    /// Colour of the only surviving king, once the game is won.
    pub fn winner(&self) -> Option<Color> {
        if !self.is_win() {
            return None;
        }
        self.pieces
            .keys()
            .find(|id| id.is_king())
            .map(PieceId::color)
    }

    fn king_count(&self) -> usize {
        self.pieces
            .keys()
            .filter(|id| id.is_king())
            .count()
    }

    /// Serializable view of every live piece.
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            time_ms: self.game_time_ms(),
            pieces: self
                .pieces
                .values()
                .map(|p| PieceSnapshot {
                    id: p.id().clone(),
                    state: p.state_name().to_string(),
                    cell: p.current_cell(),
                    start_ms: p.start_ms(),
                })
                .collect(),
        }
    }

    /// Turn pending intents into commands on the queue.
    fn process_intents(&mut self, now: u64) {
        while let Ok(intent) = self.intent_rx.try_recv() {
            let color = intent.player.color();
            let occupancy = &self.occupancy;
            let owned_at = |cell: Cell| {
                occupancy
                    .at(cell)
                    .iter()
                    .find(|o| o.color == color)
                    .map(|o| o.id.as_str().to_string())
            };
            if let Some(cmd) = self.gestures[player_slot(intent.player)].apply(&intent, now, owned_at) {
                debug!("{} queued {}", intent.player, cmd);
                self.enqueue_command(cmd);
            }
        }
    }

    /// Apply one command to its piece.
    fn process_input(&mut self, mut cmd: Command, now: u64) {
        let piece = match PieceId::parse(&cmd.piece_id) {
            Some(id) => self.pieces.get_mut(&id),
            None => None,
        };
        let Some(piece) = piece else {
            warn!("Dropping command for unknown piece: {}", cmd);
            return;
        };

        if cmd.is(Command::MOVE) {
            if let Some((_, dst)) = cmd.src_dst() {
                if self.occupancy.has_color_at(dst, piece.color()) {
                    debug!("Refused {}: own piece at destination", cmd);
                    return;
                }
            }
        }

        cmd.timestamp_ms = now;
        piece.on_command(&cmd, &self.occupancy);
    }

    /// Draw pieces and cursors on a fresh copy of the board and present it.
    fn draw(&mut self, now: u64) {
        let mut frame = self.board.clone();
        for piece in self.pieces.values_mut() {
            piece.draw_on_board(&mut frame, now);
        }

        let geometry = frame.geometry;
        for (player, color) in [(Player::One, PLAYER_ONE_CURSOR), (Player::Two, PLAYER_TWO_CURSOR)] {
            let cursor = self.processors[player_slot(player)].cursor();
            let (x, y) = geometry.m_to_pix(geometry.cell_to_m(cursor));
            frame
                .surface_mut()
                .draw_rect(x, y, geometry.cell_w_pix - 1, geometry.cell_h_pix - 1, color);
        }
        frame.show();
    }

    /// Remove captured pieces.
    fn process_collisions(&mut self, now: u64, result: &mut TickResult) {
        self.occupancy.rebuild(self.pieces.values());
        let captures = check_all_collisions(&self.pieces, &self.occupancy, self.config.collision_rule);
        if captures.is_empty() {
            return;
        }

        for capture in captures {
            if self.pieces.remove(&capture.victim).is_some() {
                info!("{} captured {} at {}", capture.winner, capture.victim, capture.cell);
                result.events.push(GameEvent::piece_captured(
                    self.tick_count,
                    now,
                    capture.victim,
                    capture.winner,
                    capture.cell,
                ));
            }
        }
        self.occupancy.rebuild(self.pieces.values());
    }

    /// Check if the match should end.
    fn check_end_conditions(&mut self, now: u64, result: &mut TickResult) {
        if !self.is_win() {
            return;
        }
        result.match_ended = true;
        result.winner = self.winner();
        result.events.push(GameEvent::match_ended(self.tick_count, now, result.winner));
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.stop_user_input();
    }
}
