//! Concurrent input.
//!
//! Raw keys -> key names -> per-player actions and cursor -> intents on a
//! channel drained by the simulation thread.

pub mod keymap;
pub mod processor;
pub mod producer;

pub use keymap::{translate_key_code, Action, Keymap};
pub use processor::KeyboardProcessor;
pub use producer::{InputIntent, KeySource, KeyboardProducer, Player, ScriptedKeys, SelectionGesture};
