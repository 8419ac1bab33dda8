//! Grid layout planning
//!
//! Turns a stream count, the desktop geometry and the native size of the
//! first stream into one rectangle per stream:
//!
//! 1. The grid is `ceil(sqrt(n))` columns by as many rows as needed
//! 2. The work area is split evenly into base cells
//! 3. The base cell is shrunk to the aspect ratio of stream 0
//! 4. Cells are emitted row-major, one per stream
//!
//! Only stream 0 governs geometry. Every other stream is scaled into
//! whatever cell results, regardless of its own aspect ratio.

use crate::error::{PlayerError, Result};
use crate::geometry::DesktopGeometry;

/// How streams are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// One surface per stream, tiled across the desktop
    Windowed,
    /// All streams composed into a single canvas
    Stitch,
}

impl LayoutMode {
    pub fn from_stitch(stitch: bool) -> Self {
        if stitch { Self::Stitch } else { Self::Windowed }
    }

    pub fn is_stitch(&self) -> bool {
        matches!(self, Self::Stitch)
    }
}

/// Number of grid columns and rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub columns: u32,
    pub rows: u32,
}

impl GridShape {
    /// Smallest near-square grid holding `count` cells.
    pub fn for_count(count: usize) -> Result<Self> {
        if count == 0 {
            return Err(PlayerError::Layout(
                "cannot plan a grid for zero streams".to_string(),
            ));
        }

        let mut columns = (count as f64).sqrt() as usize;
        while columns * columns < count {
            columns += 1;
        }
        while columns > 1 && (columns - 1) * (columns - 1) >= count {
            columns -= 1;
        }
        let rows = count.div_ceil(columns);

        Ok(Self {
            columns: columns as u32,
            rows: rows as u32,
        })
    }

    /// Total number of cells in the grid.
    pub fn capacity(&self) -> usize {
        self.columns as usize * self.rows as usize
    }
}

/// Rectangle assigned to one stream, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutCell {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl LayoutCell {
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Whether two cells share any pixel.
    pub fn overlaps(&self, other: &LayoutCell) -> bool {
        (self.x as i64) < other.right()
            && (other.x as i64) < self.right()
            && (self.y as i64) < other.bottom()
            && (other.y as i64) < self.bottom()
    }
}

/// Result of planning: grid shape, uniform cell size and one cell per stream.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    pub shape: GridShape,
    pub mode: LayoutMode,
    pub cell_width: u32,
    pub cell_height: u32,
    pub title_bar_height: u32,
    pub cells: Vec<LayoutCell>,
}

impl LayoutPlan {
    /// Size of the composed canvas in stitch mode.
    pub fn canvas_size(&self) -> (u32, u32) {
        (
            self.cell_width * self.shape.columns,
            self.cell_height * self.shape.rows,
        )
    }

    /// Size a frame is scaled to before presentation.
    ///
    /// In windowed mode the title bar is part of the cell but not of the
    /// drawable content.
    pub fn frame_size(&self) -> (u32, u32) {
        match self.mode {
            LayoutMode::Stitch => (self.cell_width, self.cell_height),
            LayoutMode::Windowed => (
                self.cell_width,
                self.cell_height - self.title_bar_height,
            ),
        }
    }
}

/// Plan the grid for `stream_count` streams.
///
/// `first_stream_size` is the native `(width, height)` of stream 0.
pub fn plan(
    stream_count: usize,
    geometry: &DesktopGeometry,
    first_stream_size: (u32, u32),
    mode: LayoutMode,
) -> Result<LayoutPlan> {
    let shape = GridShape::for_count(stream_count)?;

    let (stream_width, stream_height) = first_stream_size;
    if stream_width == 0 || stream_height == 0 {
        return Err(PlayerError::Layout(format!(
            "first stream has a degenerate size {}x{}",
            stream_width, stream_height
        )));
    }

    let title = geometry.title_bar_height;
    let mut cell_width = geometry.work_area_width / shape.columns;
    let mut cell_height = geometry.work_area_height / shape.rows;

    if cell_width == 0 || cell_height <= title {
        return Err(PlayerError::Layout(format!(
            "work area {}x{} is too small for a {}x{} grid",
            geometry.work_area_width, geometry.work_area_height, shape.columns, shape.rows
        )));
    }

    let ratio = stream_height as f64 / stream_width as f64;
    let content_ratio = match mode {
        LayoutMode::Windowed => (cell_height - title) as f64 / cell_width as f64,
        LayoutMode::Stitch => cell_height as f64 / cell_width as f64,
    };

    if content_ratio > ratio {
        // Cell is too tall: keep the width, cut the height
        cell_height = (cell_width as f64 * ratio) as u32;
        if mode == LayoutMode::Windowed {
            cell_height += title;
        }
    } else if content_ratio < ratio {
        // Cell is too wide: keep the content height, cut the width
        if mode == LayoutMode::Stitch {
            cell_height -= title;
        }
        let content_height = match mode {
            LayoutMode::Windowed => cell_height - title,
            LayoutMode::Stitch => cell_height,
        };
        cell_width = (content_height as f64 / ratio) as u32;
    }

    let content_height = match mode {
        LayoutMode::Windowed => cell_height.saturating_sub(title),
        LayoutMode::Stitch => cell_height,
    };
    if cell_width == 0 || content_height == 0 {
        return Err(PlayerError::Layout(format!(
            "aspect ratio {:.4} of the first stream leaves an empty cell",
            ratio
        )));
    }

    let (start_x, start_y) = match mode {
        LayoutMode::Stitch => (0, 0),
        LayoutMode::Windowed => (geometry.origin_left, geometry.origin_top),
    };

    let mut cells = Vec::with_capacity(stream_count);
    let mut y = start_y;
    'rows: for _ in 0..shape.rows {
        let mut x = start_x;
        for _ in 0..shape.columns {
            if cells.len() == stream_count {
                break 'rows;
            }
            cells.push(LayoutCell {
                x,
                y,
                width: cell_width,
                height: cell_height,
            });
            x += cell_width as i32;
        }
        y += cell_height as i32;
    }

    log::debug!(
        "Planned {}x{} grid for {} stream(s): cell {}x{} ({:?})",
        shape.columns,
        shape.rows,
        stream_count,
        cell_width,
        cell_height,
        mode
    );

    Ok(LayoutPlan {
        shape,
        mode,
        cell_width,
        cell_height,
        title_bar_height: title,
        cells,
    })
}
