//! Text rendering for stream labels and the legend.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use engine::Frame;
use engine::compositor::TextPainter;
use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use image::Rgba;

use crate::config::LabelSettings;

/// Pixel size of a line drawn at scale 1.0.
const BASE_FONT_PX: f32 = 30.0;
const START_SCALE: f32 = 0.5;
const SHRINK_FACTOR: f32 = 0.95;
const MIN_FONT_PX: f32 = 4.0;
/// Lines advance by this many line heights.
const LINE_SPACING: f32 = 2.0;
/// Fraction of the frame width kept free on each side.
const INDENT: f32 = 0.05;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/noto/NotoSansMono-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSansMono-Regular.ttf",
];

struct GlyphBitmap {
    width: usize,
    height: usize,
    bitmap: Vec<u8>,
}

/// Draws text with a TrueType font, shrinking lines that do not fit.
pub struct FontPainter {
    font: Font,
    color_override: Option<Rgba<u8>>,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
}

impl FontPainter {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read font {}", path.display()))?;
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| anyhow!("Failed to parse font {}: {}", path.display(), e))?;
        log::debug!("Loaded label font {}", path.display());
        Ok(Self {
            font,
            color_override: None,
            glyph_cache: HashMap::new(),
        })
    }

    /// Load the configured font, falling back to well-known system fonts.
    pub fn load(settings: &LabelSettings) -> Result<Self> {
        let candidates: Vec<PathBuf> = match &settings.font {
            Some(path) => vec![path.clone()],
            None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
        };

        let mut last_error = None;
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::from_file(path) {
                Ok(painter) => return Ok(painter),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or_else(|| anyhow!("No usable font found")))
    }

    /// Replace the stream label color. Legend text keeps its own color.
    pub fn with_label_color(mut self, color: Rgba<u8>) -> Self {
        self.color_override = Some(color);
        self
    }

    fn line_width(&self, line: &str, px: f32) -> f32 {
        line.chars()
            .map(|c| self.font.metrics(c, px).advance_width)
            .sum()
    }

    fn line_height(&self, px: f32) -> f32 {
        self.font
            .horizontal_line_metrics(px)
            .map(|m| m.ascent)
            .unwrap_or(px)
    }

    /// Largest size at or below the starting size that fits `available`.
    fn fitted_px(&self, line: &str, available: f32) -> f32 {
        let mut scale = START_SCALE;
        while BASE_FONT_PX * scale > MIN_FONT_PX
            && self.line_width(line, BASE_FONT_PX * scale) > available
        {
            scale *= SHRINK_FACTOR;
        }
        BASE_FONT_PX * scale
    }

    fn draw_line(
        &mut self,
        frame: &mut Frame,
        x: f32,
        baseline: f32,
        px: f32,
        text: &str,
        color: Rgba<u8>,
    ) {
        let top = baseline - self.line_height(px);
        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y: top,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, px, 0));

        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let font = &self.font;
            let bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (_, bitmap) = font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: glyph.width,
                    height: glyph.height,
                    bitmap,
                }
            });
            blend_glyph(
                frame,
                glyph.x.round() as i64,
                glyph.y.round() as i64,
                bitmap,
                color,
            );
        }
    }
}

impl TextPainter for FontPainter {
    fn draw_text(&mut self, frame: &mut Frame, text: &str, y: u32, color: Rgba<u8>) {
        let color = match self.color_override {
            Some(label) if color == engine::compositor::LABEL_COLOR => label,
            _ => color,
        };
        let width = frame.width() as f32;
        let indent = (width * INDENT).round();
        let available = width - 2.0 * indent;

        let mut baseline = y as f32;
        for line in text.lines() {
            let px = self.fitted_px(line, available);
            baseline += self.line_height(px) * LINE_SPACING;
            self.draw_line(frame, indent, baseline, px, line, color);
        }
    }
}

/// Alpha-blend a coverage bitmap onto the frame, clipped to its bounds.
fn blend_glyph(frame: &mut Frame, x: i64, y: i64, glyph: &GlyphBitmap, color: Rgba<u8>) {
    let (width, height) = (frame.width() as i64, frame.height() as i64);
    for row in 0..glyph.height {
        let py = y + row as i64;
        if py < 0 || py >= height {
            continue;
        }
        for col in 0..glyph.width {
            let px = x + col as i64;
            if px < 0 || px >= width {
                continue;
            }
            let coverage = glyph.bitmap[row * glyph.width + col] as u32;
            if coverage == 0 {
                continue;
            }
            let dst = frame.get_pixel_mut(px as u32, py as u32);
            for channel in 0..3 {
                let src = color[channel] as u32;
                let old = dst[channel] as u32;
                dst[channel] = ((src * coverage + old * (255 - coverage)) / 255) as u8;
            }
        }
    }
}
