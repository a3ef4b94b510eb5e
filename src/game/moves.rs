//! Move Legality
//!
//! A per-state ruleset of relative moves `(dr, dc, tag)`. Every reachable
//! offset is listed explicitly; path clearing for gliding pieces is checked
//! separately against the live occupancy map.
//!
//! Text format, one move per line:
//!
//! ```text
//! # comment
//! 1,0               # any
//! -1,0:non_capture  # only onto an empty cell
//! -1,1:capture      # only onto an enemy
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

use crate::core::cell::{Cell, Color};
use crate::game::occupancy::{Occupancy, Occupant};

/// Occupancy requirement of a relative move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MoveTag {
    /// Legal whatever the destination holds
    Any,
    /// Destination must hold an enemy piece
    Capture,
    /// Destination must be empty
    NonCapture,
}

impl MoveTag {
    /// Parse the text after `:`; empty means `Any`.
    pub fn parse(s: &str) -> Option<MoveTag> {
        match s.trim() {
            "" => Some(MoveTag::Any),
            "capture" => Some(MoveTag::Capture),
            "non_capture" => Some(MoveTag::NonCapture),
            _ => None,
        }
    }
}

/// Immutable ruleset for one FSM state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Moves {
    rules: BTreeMap<(i32, i32), MoveTag>,
    rows: i32,
    cols: i32,
}

/// Parse one non-comment line into `(dr, dc, tag)`.
fn parse_line(line: &str) -> Option<(i32, i32, MoveTag)> {
    let (coords, tag) = match line.split_once(':') {
        Some((coords, tag)) => (coords, tag),
        None => (line, ""),
    };
    let (dr, dc) = coords.split_once(',')?;
    let dr = dr.trim().parse().ok()?;
    let dc = dc.trim().parse().ok()?;
    Some((dr, dc, MoveTag::parse(tag)?))
}

impl Moves {
    /// A ruleset permitting no moves.
    pub fn empty(dims: (i32, i32)) -> Self {
        Self {
            rules: BTreeMap::new(),
            rows: dims.0,
            cols: dims.1,
        }
    }

    /// Build from explicit rules on a `(rows, cols)` board.
    pub fn from_rules<I>(rules: I, dims: (i32, i32)) -> Self
    where
        I: IntoIterator<Item = (i32, i32, MoveTag)>,
    {
        let mut moves = Self::empty(dims);
        for (dr, dc, tag) in rules {
            moves.rules.insert((dr, dc), tag);
        }
        moves
    }

    /// Parse move-table text. Unparsable lines are skipped.
    pub fn parse(text: &str, dims: (i32, i32)) -> Self {
        let mut moves = Self::empty(dims);
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((dr, dc, tag)) => {
                    moves.rules.insert((dr, dc), tag);
                }
                None => warn!("Skipping malformed move line {}: {:?}", lineno + 1, raw),
            }
        }
        moves
    }

    /// Load a move table from disk. A missing file yields an empty ruleset.
    pub fn load(path: &Path, dims: (i32, i32)) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, dims),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No move table at {}, state permits no moves", path.display());
                Self::empty(dims)
            }
            Err(e) => {
                warn!("Cannot read move table {}: {}", path.display(), e);
                Self::empty(dims)
            }
        }
    }

    /// Tag for an exact relative offset.
    #[inline]
    pub fn tag_for(&self, dr: i32, dc: i32) -> Option<MoveTag> {
        self.rules.get(&(dr, dc)).copied()
    }

    /// Number of listed offsets.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the ruleset permits nothing.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check the offset against the destination's occupants.
    pub fn is_dst_cell_valid(&self, dr: i32, dc: i32, dst: &[Occupant], my_color: Color) -> bool {
        match self.tag_for(dr, dc) {
            None => false,
            Some(MoveTag::Any) => true,
            Some(MoveTag::NonCapture) => dst.is_empty(),
            Some(MoveTag::Capture) => dst.iter().any(|o| o.color != my_color),
        }
    }

    /// Full legality check of `src -> dst`.
    pub fn is_valid(
        &self,
        src: Cell,
        dst: Cell,
        occupancy: &Occupancy,
        need_clear_path: bool,
        my_color: Color,
    ) -> bool {
        if !dst.in_bounds(self.rows, self.cols) {
            return false;
        }

        let (dr, dc) = src.delta_to(dst);
        if !self.is_dst_cell_valid(dr, dc, occupancy.at(dst), my_color) {
            return false;
        }

        if need_clear_path && !Self::path_is_clear(src, dst, occupancy, my_color) {
            return false;
        }

        true
    }

    /// Walk the straight line between the endpoints (both excluded).
    /// Enemy pieces never block; own-colour blockers do.
    fn path_is_clear(src: Cell, dst: Cell, occupancy: &Occupancy, my_color: Color) -> bool {
        let (dr, dc) = src.delta_to(dst);
        let steps = dr.abs().max(dc.abs());
        if steps <= 1 {
            return true;
        }

        let step_r = dr as f64 / steps as f64;
        let step_c = dc as f64 / steps as f64;
        (1..steps).all(|i| {
            let cell = Cell::new(
                src.row + (i as f64 * step_r).round() as i32,
                src.col + (i as f64 * step_c).round() as i32,
            );
            if occupancy.blocks_path(cell, my_color) {
                debug!("Path {} -> {} blocked at {}", src, dst, cell);
                return false;
            }
            true
        })
    }
}
