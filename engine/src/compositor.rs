//! Frame preparation and stitch-mode canvas composition.

use image::Rgba;
use image::imageops::{self, FilterType};

use crate::Frame;
use crate::geometry::DesktopGeometry;
use crate::layout::{LayoutCell, LayoutPlan};

/// Stream label color.
pub const LABEL_COLOR: Rgba<u8> = Rgba([118, 185, 0, 255]);

/// Fill of canvas pixels no stream has drawn on.
pub const CANVAS_BACKGROUND: Rgba<u8> = Rgba([100, 100, 100, 255]);

pub const LEGEND_BACKGROUND: Rgba<u8> = Rgba([240, 240, 240, 255]);
pub const LEGEND_TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Stream labels sit at this fraction of the frame height.
pub const LABEL_POSITION: f32 = 0.8;

pub const LEGEND_TEXT: &str = "Space     - Toggle play/pause\n\
                               .         - Forward one frame\n\
                               ,         - Backward one frame\n\
                               a/A       - Forward 10 frames\n\
                               l/L       - Toggle Legend window\n\
                               Esc       - Exit\n";

/// Renders text into frames.
pub trait TextPainter {
    /// Draw `text` one line per `\n`. Each line moves down by twice its
    /// height before drawing, starting from `y`.
    fn draw_text(&mut self, frame: &mut Frame, text: &str, y: u32, color: Rgba<u8>);
}

/// Painter used when no font is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoText;

impl TextPainter for NoText {
    fn draw_text(&mut self, _frame: &mut Frame, _text: &str, _y: u32, _color: Rgba<u8>) {}
}

/// Scale `frame` to exactly `width`x`height`.
pub fn fit_to_cell(frame: &Frame, width: u32, height: u32) -> Frame {
    if frame.dimensions() == (width, height) {
        return frame.clone();
    }
    imageops::resize(frame, width, height, FilterType::Triangle)
}

/// Opaque black frame shown for a stream that produced nothing.
pub fn placeholder(width: u32, height: u32) -> Frame {
    Frame::from_pixel(width.max(1), height.max(1), Rgba([0, 0, 0, 255]))
}

/// Stamp the stream label onto a frame that has already been fitted.
pub fn draw_label(painter: &mut dyn TextPainter, frame: &mut Frame, label: &str) {
    let y = (frame.height() as f32 * LABEL_POSITION) as u32;
    painter.draw_text(frame, label, y, LABEL_COLOR);
}

/// Key binding help sized to a fifth of the work area height and a quarter
/// of its width.
pub fn legend_frame(geometry: &DesktopGeometry, painter: &mut dyn TextPainter) -> Frame {
    let width = (geometry.work_area_width / 4).max(1);
    let height = (geometry.work_area_height / 5).max(1);
    let mut frame = Frame::from_pixel(width, height, LEGEND_BACKGROUND);
    painter.draw_text(&mut frame, LEGEND_TEXT, 0, LEGEND_TEXT_COLOR);
    frame
}

/// Shared stitch-mode canvas.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: Frame,
}

impl Canvas {
    /// Blank canvas sized for the plan's full grid.
    pub fn for_plan(plan: &LayoutPlan) -> Self {
        let (width, height) = plan.canvas_size();
        Self {
            image: Frame::from_pixel(width, height, CANVAS_BACKGROUND),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Copy `frame` into `cell`, clipped to the canvas.
    pub fn blit(&mut self, cell: &LayoutCell, frame: &Frame) {
        imageops::replace(&mut self.image, frame, cell.x as i64, cell.y as i64);
    }

    pub fn image(&self) -> &Frame {
        &self.image
    }
}
