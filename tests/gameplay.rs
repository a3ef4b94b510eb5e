//! End-to-end game scenarios driven by a manual clock.

use std::sync::Arc;

use kungfu_chess::core::{Board, Cell, Clock, Color, ManualClock};
use kungfu_chess::game::collision::CollisionRule;
use kungfu_chess::game::command::Command;
use kungfu_chess::game::events::{GameEvent, GameEventData};
use kungfu_chess::game::factory::{PieceFactory, STANDARD_LAYOUT};
use kungfu_chess::game::tick::{Game, GameConfig};

const STEP_MS: u64 = 16;

/// Kings on their home squares, a white pawn diagonal to a black pawn.
const CAPTURE_LAYOUT: &str = "\
,,,,KB,,,


,,,,PB,,,
,,,PW,,,,


,,,,KW,,,";

fn setup(layout: &str, rule: CollisionRule) -> (Game, ManualClock) {
    let clock = ManualClock::new();
    let config = GameConfig {
        tick_interval_ms: 0,
        collision_rule: rule,
        ..GameConfig::default()
    };
    let geometry = config.geometry();
    let mut game = Game::from_layout(
        layout,
        &PieceFactory::standard(geometry),
        Board::headless(geometry),
        config,
        Arc::new(clock.clone()),
    )
    .unwrap();
    game.reset_pieces();
    (game, clock)
}

/// Tick in fixed steps up to `until_ms`, stopping early on a win.
fn run_until(game: &mut Game, clock: &ManualClock, until_ms: u64) -> Vec<GameEvent> {
    let mut events = Vec::new();
    let mut now = clock.now_ms();
    while now < until_ms {
        now = (now + STEP_MS).min(until_ms);
        clock.set(now);
        let result = game.tick(false);
        events.extend(result.events);
        if result.match_ended {
            break;
        }
    }
    events
}

fn send(game: &mut Game, id: &str, from: (i32, i32), to: (i32, i32)) {
    game.enqueue_command(Command::move_to(0, id, Cell::from(from), Cell::from(to)));
    game.tick(false);
}

fn state_of(game: &Game, id: &str) -> String {
    game.piece(id).map(|p| p.state_name().to_string()).unwrap_or_default()
}

fn cell_of(game: &Game, id: &str) -> Cell {
    game.piece(id).unwrap().current_cell()
}

fn captures(events: &[GameEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(|e| match &e.data {
            GameEventData::PieceCaptured { victim, winner, .. } => {
                Some((victim.to_string(), winner.to_string()))
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_pawn_move_timing() {
    let (mut game, clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    send(&mut game, "PW_(6,6)", (6, 6), (4, 6));
    assert_eq!(state_of(&game, "PW_(6,6)"), "move");

    run_until(&mut game, &clock, 1000);
    assert_eq!(state_of(&game, "PW_(6,6)"), "move");
    assert_eq!(cell_of(&game, "PW_(6,6)"), Cell::new(5, 6));

    run_until(&mut game, &clock, 2000);
    assert_eq!(state_of(&game, "PW_(6,6)"), "long_rest");
    assert_eq!(cell_of(&game, "PW_(6,6)"), Cell::new(4, 6));

    run_until(&mut game, &clock, 4000);
    assert_eq!(state_of(&game, "PW_(6,6)"), "ready");
}

#[test]
fn test_pawn_captures_diagonally() {
    let (mut game, clock) = setup(CAPTURE_LAYOUT, CollisionRule::MostRecentArrival);
    run_until(&mut game, &clock, 100);
    send(&mut game, "PW_(4,3)", (4, 3), (3, 4));
    assert_eq!(state_of(&game, "PW_(4,3)"), "move");

    let events = run_until(&mut game, &clock, 3000);
    assert_eq!(captures(&events), vec![("PB_(3,4)".to_string(), "PW_(4,3)".to_string())]);
    assert!(game.piece("PB_(3,4)").is_none());
    assert_eq!(cell_of(&game, "PW_(4,3)"), Cell::new(3, 4));
    assert!(!game.is_win());
}

#[test]
fn test_longest_standing_rule_keeps_resident() {
    let (mut game, clock) = setup(CAPTURE_LAYOUT, CollisionRule::LongestStanding);
    run_until(&mut game, &clock, 100);
    send(&mut game, "PW_(4,3)", (4, 3), (3, 4));

    let events = run_until(&mut game, &clock, 3000);
    assert_eq!(captures(&events), vec![("PW_(4,3)".to_string(), "PB_(3,4)".to_string())]);
    assert!(game.piece("PB_(3,4)").is_some());
}

#[test]
fn test_jump_dodges_then_punishes() {
    let (mut game, clock) = setup(CAPTURE_LAYOUT, CollisionRule::MostRecentArrival);
    run_until(&mut game, &clock, 100);
    send(&mut game, "PW_(4,3)", (4, 3), (3, 4));

    run_until(&mut game, &clock, 1000);
    game.enqueue_command(Command::jump(0, "PB_(3,4)", Cell::new(3, 4), Cell::new(3, 4)));
    game.tick(false);
    assert_eq!(state_of(&game, "PB_(3,4)"), "jump");

    // pawn lands mid-jump: nobody is taken
    let events = run_until(&mut game, &clock, 1600);
    assert!(captures(&events).is_empty());
    assert_eq!(state_of(&game, "PW_(4,3)"), "long_rest");

    // jump ends, the resting attacker is now the older occupant
    let events = run_until(&mut game, &clock, 2100);
    assert_eq!(captures(&events), vec![("PW_(4,3)".to_string(), "PB_(3,4)".to_string())]);
    assert_eq!(state_of(&game, "PB_(3,4)"), "short_rest");
}

#[test]
fn test_rook_blocked_by_own_pawn() {
    let (mut game, clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    send(&mut game, "RW_(7,0)", (7, 0), (5, 0));
    run_until(&mut game, &clock, 500);
    assert_eq!(state_of(&game, "RW_(7,0)"), "idle");
    assert_eq!(cell_of(&game, "RW_(7,0)"), Cell::new(7, 0));
}

#[test]
fn test_knight_refused_onto_own_piece() {
    let (mut game, _clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    send(&mut game, "NW_(7,1)", (7, 1), (6, 3));
    assert_eq!(state_of(&game, "NW_(7,1)"), "idle");
}

#[test]
fn test_bishop_cannot_move_straight() {
    let (mut game, _clock) = setup(",,,,KB,,,\n\n\n\n\n\n\n,,BW,,KW,,,", CollisionRule::default());
    send(&mut game, "BW_(7,2)", (7, 2), (5, 2));
    assert_eq!(state_of(&game, "BW_(7,2)"), "idle");

    send(&mut game, "BW_(7,2)", (7, 2), (5, 0));
    assert_eq!(state_of(&game, "BW_(7,2)"), "move");
}

#[test]
fn test_knight_jumps_the_pawn_wall() {
    let (mut game, clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    send(&mut game, "NW_(7,1)", (7, 1), (5, 2));
    assert_eq!(state_of(&game, "NW_(7,1)"), "move");

    run_until(&mut game, &clock, 2300);
    assert_eq!(state_of(&game, "NW_(7,1)"), "long_rest");
    assert_eq!(cell_of(&game, "NW_(7,1)"), Cell::new(5, 2));
    assert_eq!(game.piece_count(), 32);
}

#[test]
fn test_pawn_double_step_only_first_move() {
    let (mut game, clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    send(&mut game, "PW_(6,0)", (6, 0), (5, 0));
    run_until(&mut game, &clock, 4000);
    assert_eq!(state_of(&game, "PW_(6,0)"), "ready");

    send(&mut game, "PW_(6,0)", (5, 0), (3, 0));
    assert_eq!(state_of(&game, "PW_(6,0)"), "ready");

    send(&mut game, "PW_(6,0)", (5, 0), (4, 0));
    assert_eq!(state_of(&game, "PW_(6,0)"), "move");
}

#[test]
fn test_busy_piece_ignores_commands() {
    let (mut game, clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    send(&mut game, "PW_(6,3)", (6, 3), (5, 3));
    run_until(&mut game, &clock, 1500);
    assert_eq!(state_of(&game, "PW_(6,3)"), "long_rest");

    send(&mut game, "PW_(6,3)", (5, 3), (4, 3));
    assert_eq!(state_of(&game, "PW_(6,3)"), "long_rest");
}

#[test]
fn test_unknown_event_ignored() {
    let (mut game, _clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    game.enqueue_command(Command::new(0, "QW_(7,3)", "fly", vec![Cell::new(7, 3)]));
    game.tick(false);
    assert_eq!(state_of(&game, "QW_(7,3)"), "idle");
}

#[test]
fn test_move_from_wrong_source_refused() {
    let (mut game, _clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    send(&mut game, "PW_(6,3)", (6, 2), (5, 2));
    assert_eq!(state_of(&game, "PW_(6,3)"), "idle");
}

#[test]
fn test_jump_from_wrong_source_refused() {
    let (mut game, clock) = setup("KB,,,QB\n\n\n\n\n\n\nKW,NW", CollisionRule::default());
    run_until(&mut game, &clock, 100);
    game.enqueue_command(Command::jump(0, "NW_(7,1)", Cell::new(0, 3), Cell::new(0, 3)));
    game.tick(false);
    assert_eq!(state_of(&game, "NW_(7,1)"), "idle");
    assert_eq!(cell_of(&game, "NW_(7,1)"), Cell::new(7, 1));

    let events = run_until(&mut game, &clock, 2000);
    assert!(captures(&events).is_empty());
    assert!(game.piece("QB_(0,3)").is_some());
    assert_eq!(cell_of(&game, "NW_(7,1)"), Cell::new(7, 1));
}

#[test]
fn test_queen_takes_king_and_wins() {
    let (mut game, clock) = setup(",,,,KB,,,\n\n,,,,QW,,,\n\n\n\n\n,,,,KW,,,", CollisionRule::default());
    run_until(&mut game, &clock, 100);
    send(&mut game, "QW_(2,4)", (2, 4), (0, 4));
    assert!(!game.is_win());

    let events = run_until(&mut game, &clock, 5000);
    assert_eq!(captures(&events), vec![("KB_(0,4)".to_string(), "QW_(2,4)".to_string())]);
    let last = events.last().unwrap();
    assert_eq!(last.data, GameEventData::MatchEnded { winner: Some(Color::White) });
    assert!(last.time_ms < 1500);
    assert!(game.is_win());
    assert_eq!(game.winner(), Some(Color::White));
}

#[test]
fn test_identical_scripts_hash_identically() {
    fn play(second_move: (i32, i32)) -> [u8; 32] {
        let (mut game, clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
        send(&mut game, "PW_(6,4)", (6, 4), (4, 4));
        run_until(&mut game, &clock, 700);
        send(&mut game, "NB_(0,6)", (0, 6), second_move);
        run_until(&mut game, &clock, 5000);
        game.snapshot().state_hash()
    }

    assert_eq!(play((2, 5)), play((2, 5)));
    assert_ne!(play((2, 5)), play((2, 7)));
}

#[test]
fn test_snapshot_serializes() {
    let (game, _clock) = setup(STANDARD_LAYOUT, CollisionRule::default());
    let snapshot = game.snapshot();
    assert_eq!(snapshot.pieces.len(), 32);

    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"KW_(7,4)\""));
    let back: kungfu_chess::BoardSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.state_hash(), snapshot.state_hash());
}
