//! Keyboard Producers
//!
//! One background thread per player polls raw keys, runs them through that
//! player's `KeyboardProcessor`, and emits fully resolved intents
//! (`select`/`jump` at a cell) on a channel. The simulation thread consumes
//! the channel and owns all selection state, so producers never see pieces.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::core::cell::{Cell, Color};
use crate::game::command::Command;
use crate::input::keymap::{translate_key_code, Action};
use crate::input::processor::KeyboardProcessor;

/// Upper bound on raw keys read per poll round.
const MAX_KEYS_PER_POLL: usize = 64;

/// Player slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Player {
    /// Plays white
    One,
    /// Plays black
    Two,
}

impl Player {
    /// Colour of the pieces this player drives.
    pub fn color(self) -> Color {
        match self {
            Player::One => Color::White,
            Player::Two => Color::Black,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::One => write!(f, "player 1"),
            Player::Two => write!(f, "player 2"),
        }
    }
}

/// A decoded `select`/`jump` at the player's cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIntent {
    /// Who pressed
    pub player: Player,
    /// `Select` or `Jump`
    pub action: Action,
    /// Cursor cell at the time of the press
    pub cell: Cell,
}

/// A device delivering raw key codes without blocking.
pub trait KeySource: Send {
    /// Next pending raw key code, if any.
    fn poll_key(&mut self) -> Option<i32>;
}

/// Key source fed from a fixed list of raw codes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedKeys {
    codes: VecDeque<i32>,
}

impl ScriptedKeys {
    /// Source that yields `codes` in order, then nothing.
    pub fn new(codes: impl IntoIterator<Item = i32>) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn poll_key(&mut self) -> Option<i32> {
        self.codes.pop_front()
    }
}

/// Run one key name through the processor; forward select/jump.
///
/// Returns `false` once the receiving side has gone away.
fn dispatch_key(
    player: Player,
    processor: &KeyboardProcessor,
    tx: &UnboundedSender<InputIntent>,
    key: &str,
) -> bool {
    let Some(action) = processor.process_key(key) else {
        return true;
    };
    if action.is_cursor_move() {
        return true;
    }

    let intent = InputIntent {
        player,
        action,
        cell: processor.cursor(),
    };
    debug!("{} {} at {}", player, action, intent.cell);
    tx.send(intent).is_ok()
}

/// Background input thread for one player.
pub struct KeyboardProducer {
    player: Player,
    processor: Arc<KeyboardProcessor>,
    simulated: Arc<Mutex<VecDeque<String>>>,
    tx: UnboundedSender<InputIntent>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeyboardProducer {
    /// Spawn the polling thread.
    pub fn start(
        player: Player,
        processor: Arc<KeyboardProcessor>,
        source: Option<Box<dyn KeySource>>,
        tx: UnboundedSender<InputIntent>,
        poll_interval: Duration,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let simulated = Arc::new(Mutex::new(VecDeque::new()));

        let handle = {
            let running = Arc::clone(&running);
            let simulated = Arc::clone(&simulated);
            let processor = Arc::clone(&processor);
            let tx = tx.clone();
            let mut source = source;
            std::thread::spawn(move || {
                info!("Keyboard producer started for {}", player);
                while running.load(Ordering::SeqCst) {
                    let pending: Vec<String> = match simulated.lock() {
                        Ok(mut queue) => queue.drain(..).collect(),
                        Err(_) => {
                            warn!("Simulated key queue poisoned for {}", player);
                            break;
                        }
                    };

                    let mut raw = Vec::new();
                    if let Some(source) = source.as_mut() {
                        while raw.len() < MAX_KEYS_PER_POLL {
                            match source.poll_key() {
                                Some(code) => raw.push(code),
                                None => break,
                            }
                        }
                    }

                    let keys = pending
                        .into_iter()
                        .chain(raw.into_iter().filter_map(translate_key_code));
                    for key in keys {
                        if !dispatch_key(player, &processor, &tx, &key) {
                            debug!("Intent channel closed, {} producer exiting", player);
                            running.store(false, Ordering::SeqCst);
                            break;
                        }
                    }

                    std::thread::sleep(poll_interval);
                }
                info!("Keyboard producer stopped for {}", player);
            })
        };

        Self {
            player,
            processor,
            simulated,
            tx,
            running,
            handle: Some(handle),
        }
    }

    /// Queue a key name for the polling thread.
    pub fn simulate_key(&self, key: &str) {
        if let Ok(mut queue) = self.simulated.lock() {
            queue.push_back(key.to_string());
        }
    }

    /// Process a key name synchronously on the calling thread.
    pub fn handle_key(&self, key: &str) {
        dispatch_key(self.player, &self.processor, &self.tx, key);
    }

    /// The player this producer serves.
    pub fn player(&self) -> Player {
        self.player
    }

    /// Shared cursor processor.
    pub fn processor(&self) -> &Arc<KeyboardProcessor> {
        &self.processor
    }

    /// Check if the polling thread is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the thread and join it. Queued simulated keys are discarded.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Keyboard producer thread for {} panicked", self.player);
            }
        }
    }
}

impl Drop for KeyboardProducer {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// SELECTION GESTURE
// =============================================================================

/// Two-phase select/jump gesture for one player.
///
/// Lives on the simulation thread; `owned_at` answers "which of my pieces
/// stands on this cell" from the live piece set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionGesture {
    selected: Option<(String, Cell)>,
}

impl SelectionGesture {
    /// Empty gesture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently selected piece id and its cell.
    pub fn selected(&self) -> Option<(&str, Cell)> {
        self.selected.as_ref().map(|(id, cell)| (id.as_str(), *cell))
    }

    /// Drop any half-finished selection.
    pub fn clear(&mut self) {
        self.selected = None;
    }

    /// Apply one intent; returns the command it completes, if any.
    pub fn apply<F>(&mut self, intent: &InputIntent, now_ms: u64, owned_at: F) -> Option<Command>
    where
        F: Fn(Cell) -> Option<String>,
    {
        let cell = intent.cell;
        match (intent.action, self.selected.take()) {
            (Action::Select, None) => {
                self.selected = owned_at(cell).map(|id| (id, cell));
                if self.selected.is_none() {
                    debug!("{} has no piece at {}", intent.player, cell);
                }
                None
            }
            (Action::Select, Some((_, from))) if from == cell => {
                debug!("{} cancelled selection at {}", intent.player, cell);
                None
            }
            (Action::Select, Some((id, from))) => Some(Command::move_to(now_ms, id, from, cell)),
            (Action::Jump, None) => owned_at(cell).map(|id| Command::jump(now_ms, id, cell, cell)),
            (Action::Jump, Some((id, from))) => Some(Command::jump(now_ms, id, from, cell)),
            (_, previous) => {
                self.selected = previous;
                None
            }
        }
    }
}
