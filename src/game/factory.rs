//! Piece Construction
//!
//! A `PieceCatalog` describes every piece type: its states, each state's
//! move table and config, and the transition table. `PieceFactory` turns a
//! catalog entry into a live piece with its own freshly built state graph.
//!
//! Catalogs come either from the built-in standard chess set or from a
//! directory tree:
//!
//! ```text
//! <root>/<CODE>/states/<state>/moves.txt
//! <root>/<CODE>/states/<state>/config.json
//! <root>/<CODE>/states/<state>/sprites/*.png
//! <root>/<CODE>/states/transitions.csv     (from_state,event,to_state)
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::board::BoardGeometry;
use crate::core::cell::{Cell, Color};
use crate::game::command::Command;
use crate::game::moves::{MoveTag, Moves};
use crate::game::physics::{Physics, PhysicsKind};
use crate::game::piece::{Piece, PieceId};
use crate::game::state::{Animation, StateGraph, StateNode};

// =============================================================================
// ERRORS
// =============================================================================

/// Piece construction errors.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    /// No catalog entry for this code.
    #[error("unknown piece type: {0}")]
    UnknownPieceType(String),

    /// The type's graph has no `idle` state.
    #[error("piece type {0} has no idle state")]
    MissingIdleState(String),

    /// A catalog directory could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// Board layout errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The layout names no pieces.
    #[error("board layout contains no pieces")]
    Empty,
}

// =============================================================================
// STATE CONFIG
// =============================================================================

/// Physics section of a state's `config.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Glide speed for `move` states
    pub speed_m_per_sec: f64,
    /// Window length for jump/rest states
    pub duration_ms: u64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            speed_m_per_sec: 1.0,
            duration_ms: 1000,
        }
    }
}

/// Graphics section of a state's `config.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Animation rate
    pub frames_per_sec: f64,
    /// Wrap around after the last frame
    pub is_loop: bool,
    /// Sprite keys; empty means "use the sprites directory"
    pub frames: Vec<String>,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            frames_per_sec: 6.0,
            is_loop: true,
            frames: Vec::new(),
        }
    }
}

/// Per-state configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Physics parameters
    pub physics: PhysicsConfig,
    /// Moves from this state need an unobstructed path
    pub need_clear_path: bool,
    /// Animation parameters
    pub graphics: GraphicsConfig,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            need_clear_path: true,
            graphics: GraphicsConfig::default(),
        }
    }
}

impl StateConfig {
    /// Parse `config.json` text; malformed input yields the defaults.
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(config) => config,
            Err(e) => {
                warn!("Malformed state config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn with_duration(duration_ms: u64) -> Self {
        let mut config = Self::default();
        config.physics.duration_ms = duration_ms;
        config
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// One state of a piece type, before instantiation.
#[derive(Clone, Debug)]
pub struct StateTemplate {
    /// State name
    pub name: String,
    /// Move table (shared read-only between instances)
    pub moves: Arc<Moves>,
    /// Config
    pub config: StateConfig,
}

/// All states and transitions of one piece type.
#[derive(Clone, Debug, Default)]
pub struct PieceType {
    /// States in declaration order
    pub states: Vec<StateTemplate>,
    /// `(from_state, event, to_state)`
    pub transitions: Vec<(String, String, String)>,
}

impl PieceType {
    fn has_state(&self, name: &str) -> bool {
        self.states.iter().any(|s| s.name == name)
    }

    fn add_state(&mut self, name: &str, moves: Moves, config: StateConfig) {
        self.states.push(StateTemplate {
            name: name.to_string(),
            moves: Arc::new(moves),
            config,
        });
    }

    /// Add the built-in transition edges whose endpoints both exist.
    fn apply_default_transitions(&mut self) {
        let edges = if self.has_state("ready") { PAWN_EDGES } else { BASE_EDGES };
        for (from, event, to) in edges {
            if self.has_state(from) && self.has_state(to) {
                self.transitions
                    .push((from.to_string(), event.to_string(), to.to_string()));
            }
        }
    }
}

const BASE_EDGES: &[(&str, &str, &str)] = &[
    ("idle", "move", "move"),
    ("idle", "jump", "jump"),
    ("move", "done", "long_rest"),
    ("jump", "done", "short_rest"),
    ("long_rest", "done", "idle"),
    ("short_rest", "done", "idle"),
];

/// Pawns drop into `ready` after their first move, losing the double step.
const PAWN_EDGES: &[(&str, &str, &str)] = &[
    ("idle", "move", "move"),
    ("idle", "jump", "jump"),
    ("move", "done", "long_rest"),
    ("jump", "done", "short_rest"),
    ("long_rest", "done", "ready"),
    ("short_rest", "done", "idle"),
    ("ready", "move", "move"),
    ("ready", "jump", "ready_jump"),
    ("ready_jump", "done", "ready_short_rest"),
    ("ready_short_rest", "done", "ready"),
];

/// Opening position, one row per line.
pub const STANDARD_LAYOUT: &str = "\
RB,NB,BB,QB,KB,BB,NB,RB
PB,PB,PB,PB,PB,PB,PB,PB
,,,,,,,
,,,,,,,
,,,,,,,
,,,,,,,
PW,PW,PW,PW,PW,PW,PW,PW
RW,NW,BW,QW,KW,BW,NW,RW";

fn rays(dirs: &[(i32, i32)], reach: i32) -> Vec<(i32, i32, MoveTag)> {
    dirs.iter()
        .flat_map(|&(dr, dc)| (1..=reach).map(move |k| (dr * k, dc * k, MoveTag::Any)))
        .collect()
}

const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const KNIGHT: [(i32, i32); 8] = [
    (1, 2), (2, 1), (-1, 2), (-2, 1),
    (1, -2), (2, -1), (-1, -2), (-2, -1),
];

/// Registry of piece types keyed by two-letter code.
#[derive(Clone, Debug)]
pub struct PieceCatalog {
    geometry: BoardGeometry,
    types: BTreeMap<String, PieceType>,
}

impl PieceCatalog {
    /// Empty catalog.
    pub fn new(geometry: BoardGeometry) -> Self {
        Self {
            geometry,
            types: BTreeMap::new(),
        }
    }

    /// The six chess piece types in both colours.
    pub fn standard(geometry: BoardGeometry) -> Self {
        let mut catalog = Self::new(geometry);
        for color in [Color::White, Color::Black] {
            for kind in ['K', 'Q', 'R', 'B', 'N', 'P'] {
                let code = format!("{}{}", kind, color.as_char());
                let piece_type = catalog.standard_type(kind, color);
                catalog.insert(&code, piece_type);
            }
        }
        catalog
    }

    fn standard_type(&self, kind: char, color: Color) -> PieceType {
        let dims = self.geometry.dims();
        let reach = dims.0.max(dims.1) - 1;
        let forward = match color {
            Color::White => -1,
            Color::Black => 1,
        };

        let mut idle_config = StateConfig::default();
        let idle_moves = match kind {
            'K' => Moves::from_rules(rays(&ORTHOGONAL, 1).into_iter().chain(rays(&DIAGONAL, 1)), dims),
            'Q' => Moves::from_rules(
                rays(&ORTHOGONAL, reach).into_iter().chain(rays(&DIAGONAL, reach)),
                dims,
            ),
            'R' => Moves::from_rules(rays(&ORTHOGONAL, reach), dims),
            'B' => Moves::from_rules(rays(&DIAGONAL, reach), dims),
            'N' => {
                idle_config.need_clear_path = false;
                Moves::from_rules(KNIGHT.iter().map(|&(dr, dc)| (dr, dc, MoveTag::Any)), dims)
            }
            _ => Moves::from_rules(pawn_rules(forward, true), dims),
        };

        let mut piece_type = PieceType::default();
        piece_type.add_state("idle", idle_moves, idle_config);
        piece_type.add_state("move", Moves::empty(dims), StateConfig::default());
        piece_type.add_state("jump", Moves::empty(dims), StateConfig::with_duration(1000));
        piece_type.add_state("long_rest", Moves::empty(dims), StateConfig::with_duration(2000));
        piece_type.add_state("short_rest", Moves::empty(dims), StateConfig::with_duration(1000));
        if kind == 'P' {
            piece_type.add_state(
                "ready",
                Moves::from_rules(pawn_rules(forward, false), dims),
                StateConfig::default(),
            );
            piece_type.add_state("ready_jump", Moves::empty(dims), StateConfig::with_duration(1000));
            piece_type.add_state(
                "ready_short_rest",
                Moves::empty(dims),
                StateConfig::with_duration(1000),
            );
        }
        piece_type.apply_default_transitions();
        piece_type
    }

    /// Load every `<root>/<CODE>/states` tree.
    pub fn load_dir(root: &Path, geometry: BoardGeometry) -> Result<Self, FactoryError> {
        let mut catalog = Self::new(geometry);
        for dir in sorted_subdirs(root)? {
            let states_root = dir.join("states");
            if !states_root.is_dir() {
                continue;
            }
            let Some(code) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let piece_type = catalog.load_type(&states_root)?;
            debug!("Loaded piece type {} ({} states)", code, piece_type.states.len());
            catalog.insert(&code, piece_type);
        }
        Ok(catalog)
    }

    fn load_type(&self, states_root: &Path) -> Result<PieceType, FactoryError> {
        let dims = self.geometry.dims();
        let mut piece_type = PieceType::default();

        for state_dir in sorted_subdirs(states_root)? {
            let Some(name) = state_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let mut config = match std::fs::read_to_string(state_dir.join("config.json")) {
                Ok(text) => StateConfig::from_json_str(&text),
                Err(_) => StateConfig::default(),
            };
            if config.graphics.frames.is_empty() {
                config.graphics.frames = sprite_frames(&state_dir.join("sprites"));
            }
            let moves = Moves::load(&state_dir.join("moves.txt"), dims);
            piece_type.add_state(name, moves, config);
        }

        piece_type.apply_default_transitions();
        let csv = states_root.join("transitions.csv");
        if let Ok(text) = std::fs::read_to_string(&csv) {
            for row in parse_transitions(&text) {
                if piece_type.has_state(&row.0) && piece_type.has_state(&row.2) {
                    piece_type.transitions.push(row);
                } else {
                    warn!("Skipping transition {:?} in {}: unknown state", row, csv.display());
                }
            }
        }
        Ok(piece_type)
    }

    /// Register or replace a type.
    pub fn insert(&mut self, code: &str, piece_type: PieceType) {
        self.types.insert(code.to_string(), piece_type);
    }

    /// Look up a type.
    pub fn get(&self, code: &str) -> Option<&PieceType> {
        self.types.get(code)
    }

    /// Registered codes in sorted order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Geometry the move tables were built for.
    pub fn geometry(&self) -> BoardGeometry {
        self.geometry
    }
}

fn pawn_rules(forward: i32, first_move: bool) -> Vec<(i32, i32, MoveTag)> {
    let mut rules = vec![
        (forward, 0, MoveTag::NonCapture),
        (forward, -1, MoveTag::Capture),
        (forward, 1, MoveTag::Capture),
    ];
    if first_move {
        rules.push((2 * forward, 0, MoveTag::NonCapture));
    }
    rules
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>, FactoryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| FactoryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

fn sprite_frames(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut frames: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    frames.sort();
    frames
}

/// Parse `from_state,event,to_state` rows. A header row is skipped.
pub fn parse_transitions(text: &str) -> Vec<(String, String, String)> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let from = fields.next()?;
            let event = fields.next()?;
            let to = fields.next()?;
            if from.is_empty() || event.is_empty() || to.is_empty() || from == "from_state" {
                return None;
            }
            Some((from.to_string(), event.to_ascii_lowercase(), to.to_string()))
        })
        .collect()
}

// =============================================================================
// FACTORY
// =============================================================================

/// Builds pieces with independent state graphs.
#[derive(Clone, Debug)]
pub struct PieceFactory {
    catalog: PieceCatalog,
}

impl PieceFactory {
    /// Factory over a catalog.
    pub fn new(catalog: PieceCatalog) -> Self {
        Self { catalog }
    }

    /// Factory over the standard chess set.
    pub fn standard(geometry: BoardGeometry) -> Self {
        Self::new(PieceCatalog::standard(geometry))
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &PieceCatalog {
        &self.catalog
    }

    /// Create a piece of type `code` idling at `cell`.
    pub fn create_piece(&self, code: &str, cell: Cell) -> Result<Piece, FactoryError> {
        let piece_type = self
            .catalog
            .get(code)
            .ok_or_else(|| FactoryError::UnknownPieceType(code.to_string()))?;
        let id = PieceId::new(code, cell)
            .ok_or_else(|| FactoryError::UnknownPieceType(code.to_string()))?;

        let geometry = self.catalog.geometry;
        let cell_m = geometry.cell_h_m.max(f64::EPSILON);
        let mut graph = StateGraph::new();
        for template in &piece_type.states {
            let config = &template.config;
            let kind = PhysicsKind::for_state(
                &template.name,
                config.physics.speed_m_per_sec / cell_m,
                config.physics.duration_ms as f64 / 1000.0,
            );
            graph.add_state(StateNode {
                name: template.name.clone(),
                moves: Arc::clone(&template.moves),
                physics: Physics::new(kind, geometry),
                animation: Animation::new(
                    config.graphics.frames.clone(),
                    config.graphics.frames_per_sec,
                    config.graphics.is_loop,
                ),
                need_clear_path: config.need_clear_path,
            });
        }

        for (from, event, to) in &piece_type.transitions {
            if let (Some(from), Some(to)) = (graph.find(from), graph.find(to)) {
                graph.set_transition(from, event, to);
            }
        }

        let idle = graph
            .initial()
            .ok_or_else(|| FactoryError::MissingIdleState(code.to_string()))?;
        graph.reset_state(idle, &Command::idle(0, id.as_str(), cell));
        Ok(Piece::new(id, graph, idle))
    }
}

// =============================================================================
// LAYOUT
// =============================================================================

/// Parse a board layout: one row per line, comma-separated piece codes,
/// blank fields are empty cells.
pub fn parse_layout(text: &str) -> Result<Vec<(String, Cell)>, LayoutError> {
    let mut placements = Vec::new();
    for (row, line) in text.lines().enumerate() {
        for (col, field) in line.split(',').enumerate() {
            let code = field.trim();
            if !code.is_empty() {
                placements.push((code.to_string(), Cell::new(row as i32, col as i32)));
            }
        }
    }
    if placements.is_empty() {
        return Err(LayoutError::Empty);
    }
    Ok(placements)
}
