//! Board Geometry and Render Surface
//!
//! Converts between discrete cells, metric positions and pixels.
//! The board also owns the surface the external renderer draws on.

use std::fmt;
use std::sync::{Arc, Mutex};
use serde::{Serialize, Deserialize};

use crate::core::cell::Cell;
use crate::core::vec2::PosM;

/// Immutable grid geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardGeometry {
    /// Cell height in pixels
    pub cell_h_pix: i32,
    /// Cell width in pixels
    pub cell_w_pix: i32,
    /// Number of rows
    pub rows: i32,
    /// Number of columns
    pub cols: i32,
    /// Cell height in metres
    pub cell_h_m: f64,
    /// Cell width in metres
    pub cell_w_m: f64,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            cell_h_pix: 64,
            cell_w_pix: 64,
            rows: 8,
            cols: 8,
            cell_h_m: 1.0,
            cell_w_m: 1.0,
        }
    }
}

/// Slack absorbing float error in `value / cell` before truncation.
const INDEX_EPSILON: f64 = 1e-9;

/// Index along one axis; a non-positive cell size maps everything to 0.
#[inline]
fn axis_index(value_m: f64, cell_m: f64) -> i32 {
    if cell_m > 0.0 {
        // `as` truncates toward zero
        (value_m / cell_m + INDEX_EPSILON) as i32
    } else {
        0
    }
}

#[inline]
fn axis_pixels(value_m: f64, cell_m: f64, cell_pix: i32) -> i32 {
    if cell_m > 0.0 {
        ((value_m / cell_m) * cell_pix as f64).round() as i32
    } else {
        0
    }
}

impl BoardGeometry {
    /// Square board of `rows x cols` with the given pixel and metric cell size.
    pub fn square_cells(rows: i32, cols: i32, cell_pix: i32, cell_m: f64) -> Self {
        Self {
            cell_h_pix: cell_pix,
            cell_w_pix: cell_pix,
            rows,
            cols,
            cell_h_m: cell_m,
            cell_w_m: cell_m,
        }
    }

    /// Metric position to the cell containing it (truncating).
    #[inline]
    pub fn m_to_cell(&self, pos: PosM) -> Cell {
        Cell::new(axis_index(pos.y, self.cell_h_m), axis_index(pos.x, self.cell_w_m))
    }

    /// Top-left corner of a cell in metres.
    #[inline]
    pub fn cell_to_m(&self, cell: Cell) -> PosM {
        PosM::new(cell.col as f64 * self.cell_w_m, cell.row as f64 * self.cell_h_m)
    }

    /// Metric position to pixel coordinates `(x, y)` (rounding).
    #[inline]
    pub fn m_to_pix(&self, pos: PosM) -> (i32, i32) {
        (
            axis_pixels(pos.x, self.cell_w_m, self.cell_w_pix),
            axis_pixels(pos.y, self.cell_h_m, self.cell_h_pix),
        )
    }

    /// Check if a cell lies on the board.
    #[inline]
    pub fn contains(&self, cell: Cell) -> bool {
        cell.in_bounds(self.rows, self.cols)
    }

    /// Board dimensions as `(rows, cols)`.
    #[inline]
    pub fn dims(&self) -> (i32, i32) {
        (self.rows, self.cols)
    }
}

// =============================================================================
// RENDER SURFACE
// =============================================================================

/// A drawable image owned by the board.
///
/// Image decoding and windowing live outside the engine; implementations
/// adapt whatever backend the application uses.
pub trait Surface: Send {
    /// Deep copy of the surface.
    fn clone_box(&self) -> Box<dyn Surface>;

    /// Paste a sprite with its top-left corner at pixel `(x, y)`.
    fn draw_sprite(&mut self, sprite: &str, x: i32, y: i32);

    /// Outline a rectangle.
    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 3]);

    /// Present the surface.
    fn show(&self);
}

/// One recorded drawing operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawOp {
    /// A sprite paste
    Sprite {
        /// Sprite key
        sprite: String,
        /// Pixel x
        x: i32,
        /// Pixel y
        y: i32,
    },
    /// A rectangle outline
    Rect {
        /// Pixel x
        x: i32,
        /// Pixel y
        y: i32,
        /// Width in pixels
        w: i32,
        /// Height in pixels
        h: i32,
        /// RGB colour
        color: [u8; 3],
    },
}

/// Surface that records draw calls instead of rasterizing.
///
/// Every `show()` appends the current operation list to a log shared by all
/// clones, so a test can inspect what each frame contained.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    ops: Vec<DrawOp>,
    frames: Arc<Mutex<Vec<Vec<DrawOp>>>>,
}

impl RecordingSurface {
    /// Create an empty recording surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations drawn on this copy so far.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Handle to the frame log shared by all clones.
    pub fn frame_log(&self) -> Arc<Mutex<Vec<Vec<DrawOp>>>> {
        Arc::clone(&self.frames)
    }
}

impl Surface for RecordingSurface {
    fn clone_box(&self) -> Box<dyn Surface> {
        Box::new(self.clone())
    }

    fn draw_sprite(&mut self, sprite: &str, x: i32, y: i32) {
        self.ops.push(DrawOp::Sprite { sprite: sprite.to_string(), x, y });
    }

    fn draw_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: [u8; 3]) {
        self.ops.push(DrawOp::Rect { x, y, w, h, color });
    }

    fn show(&self) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(self.ops.clone());
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// Grid geometry plus the owned render surface.
pub struct Board {
    /// Geometry (immutable after construction)
    pub geometry: BoardGeometry,
    surface: Box<dyn Surface>,
}

impl Board {
    /// Create a board drawing on `surface`.
    pub fn new(geometry: BoardGeometry, surface: Box<dyn Surface>) -> Self {
        Self { geometry, surface }
    }

    /// Board backed by a fresh `RecordingSurface`.
    pub fn headless(geometry: BoardGeometry) -> Self {
        Self::new(geometry, Box::new(RecordingSurface::new()))
    }

    /// Mutable access to the surface for drawing.
    pub fn surface_mut(&mut self) -> &mut dyn Surface {
        self.surface.as_mut()
    }

    /// Present the surface.
    pub fn show(&self) {
        self.surface.show();
    }

    /// See [`BoardGeometry::m_to_cell`].
    pub fn m_to_cell(&self, pos: PosM) -> Cell {
        self.geometry.m_to_cell(pos)
    }

    /// See [`BoardGeometry::cell_to_m`].
    pub fn cell_to_m(&self, cell: Cell) -> PosM {
        self.geometry.cell_to_m(cell)
    }

    /// See [`BoardGeometry::m_to_pix`].
    pub fn m_to_pix(&self, pos: PosM) -> (i32, i32) {
        self.geometry.m_to_pix(pos)
    }
}

impl Clone for Board {
    fn clone(&self) -> Self {
        Self {
            geometry: self.geometry,
            surface: self.surface.clone_box(),
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("geometry", &self.geometry)
            .finish_non_exhaustive()
    }
}
