//! Kung Fu Chess demo
//!
//! Plays a scripted four-move attack on the standard board with a manual
//! clock, then replays it and checks both runs end in the same state.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kungfu_chess::{
    TICK_RATE, TICK_INTERVAL_MS, VERSION,
    core::{Cell, Color, ManualClock},
    core::hash::StateHash,
    game::{
        command::Command,
        events::GameEventData,
        tick::{Game, GameConfig},
    },
};

/// Ticks before the demo gives up (one minute of game time).
const MAX_TICKS: u64 = 60 * TICK_RATE as u64;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Kung Fu Chess v{}", VERSION);
    info!("Tick Rate: {} Hz ({} ms per tick)", TICK_RATE, TICK_INTERVAL_MS);

    let (hash, winner) = demo_match()?;
    info!("Final State Hash: {}", hex::encode(hash));
    match winner {
        Some(color) => info!("Winner: {}", color),
        None => info!("No winner after {} ticks", MAX_TICKS),
    }

    info!("=== Verifying Determinism ===");
    let (replay_hash, _) = demo_match()?;
    info!("Replay State Hash: {}", hex::encode(replay_hash));
    if hash == replay_hash {
        info!("DETERMINISM VERIFIED: Hashes match!");
    } else {
        anyhow::bail!("replay diverged: {} != {}", hex::encode(hash), hex::encode(replay_hash));
    }
    Ok(())
}

/// Pawn opens, queen swings out, takes f7, then the king.
fn script() -> Vec<(u64, Command)> {
    vec![
        (100, Command::move_to(0, "PW_(6,4)", Cell::new(6, 4), Cell::new(4, 4))),
        (2_500, Command::move_to(0, "QW_(7,3)", Cell::new(7, 3), Cell::new(3, 7))),
        (10_500, Command::move_to(0, "QW_(7,3)", Cell::new(3, 7), Cell::new(1, 5))),
        (15_500, Command::move_to(0, "QW_(7,3)", Cell::new(1, 5), Cell::new(0, 4))),
    ]
}

fn demo_match() -> anyhow::Result<(StateHash, Option<Color>)> {
    info!("=== Starting Demo Match ===");

    let clock = ManualClock::new();
    let config = GameConfig {
        tick_interval_ms: 0,
        ..GameConfig::default()
    };
    let mut game = Game::standard(config, Arc::new(clock.clone()))?;
    game.reset_pieces();
    info!("{} pieces on the board", game.piece_count());

    let mut pending = script().into_iter().peekable();
    let mut winner = None;

    for t in 0..MAX_TICKS {
        clock.set(t * TICK_INTERVAL_MS);
        let now = game.game_time_ms();
        while let Some((_, cmd)) = pending.next_if(|(at, _)| *at <= now) {
            info!("t={}ms: {}", now, cmd);
            game.enqueue_command(cmd);
        }

        let result = game.tick(false);
        for event in &result.events {
            match &event.data {
                GameEventData::PieceCaptured { victim, winner, cell } => {
                    info!("t={}ms: {} took {} at {}", event.time_ms, winner, victim, cell);
                }
                GameEventData::MatchEnded { .. } => {
                    info!("Match ended at tick {}", event.tick);
                }
            }
        }

        if result.match_ended {
            winner = result.winner;
            break;
        }
    }

    let snapshot = game.snapshot();
    info!("{} pieces left", snapshot.pieces.len());
    Ok((snapshot.state_hash(), winner))
}
