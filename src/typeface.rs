use std::path::Path;

use fontdue::{Font, FontSettings};
use tracing::info;

use crate::error::{CaptionError, CaptionResult};

/// Placement of a single glyph bitmap relative to the pen position on the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    /// Offset from the pen to the left edge of the bitmap.
    pub xmin: i32,
    /// Offset from the baseline to the bottom edge of the bitmap (positive is up).
    pub ymin: i32,
    pub width: usize,
    pub height: usize,
    pub advance_width: f32,
}

/// Vertical font metrics, both as positive distances from the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMetrics {
    pub ascent: f32,
    pub descent: f32,
}

/// Source of glyph shapes and metrics for caption layout.
pub trait Typeface {
    fn vertical_metrics(&self, px: f32) -> VerticalMetrics;

    fn glyph_metrics(&self, ch: char, px: f32) -> GlyphMetrics;

    /// Coverage bitmap, row-major, `width * height` bytes.
    fn rasterize(&self, ch: char, px: f32) -> (GlyphMetrics, Vec<u8>);

    fn kern(&self, _left: char, _right: char, _px: f32) -> f32 {
        0.0
    }
}

impl Typeface for Font {
    fn vertical_metrics(&self, px: f32) -> VerticalMetrics {
        match self.horizontal_line_metrics(px) {
            Some(line) => VerticalMetrics {
                ascent: line.ascent,
                descent: -line.descent,
            },
            None => VerticalMetrics {
                ascent: px * 0.8,
                descent: px * 0.2,
            },
        }
    }

    fn glyph_metrics(&self, ch: char, px: f32) -> GlyphMetrics {
        convert_metrics(self.metrics(ch, px))
    }

    fn rasterize(&self, ch: char, px: f32) -> (GlyphMetrics, Vec<u8>) {
        let (metrics, bitmap) = Font::rasterize(self, ch, px);
        (convert_metrics(metrics), bitmap)
    }

    fn kern(&self, left: char, right: char, px: f32) -> f32 {
        self.horizontal_kern(left, right, px).unwrap_or(0.0)
    }
}

fn convert_metrics(metrics: fontdue::Metrics) -> GlyphMetrics {
    GlyphMetrics {
        xmin: metrics.xmin,
        ymin: metrics.ymin,
        width: metrics.width,
        height: metrics.height,
        advance_width: metrics.advance_width,
    }
}

pub fn load_font(path: &Path) -> CaptionResult<Font> {
    info!("📝 Loading font: {}", path.display());

    let font_error = |reason: String| CaptionError::Font {
        path: path.to_path_buf(),
        reason,
    };

    if !path.exists() {
        return Err(font_error("file not found".to_string()));
    }

    let font_data = std::fs::read(path).map_err(|e| font_error(e.to_string()))?;
    Font::from_bytes(font_data.as_slice(), FontSettings::default())
        .map_err(|e| font_error(e.to_string()))
}

/// Horizontal ink bounds of a string, relative to the starting pen position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InkExtent {
    pub left: i32,
    pub right: i32,
}

impl InkExtent {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }
}

/// Pen positions for every glyph of `text`, with kerning applied.
fn pen_positions<F: Typeface + ?Sized>(face: &F, text: &str, px: f32) -> Vec<(char, f32)> {
    let mut pen = 0.0;
    let mut prev = None;
    let mut positions = Vec::with_capacity(text.len());
    for ch in text.chars() {
        if let Some(prev) = prev {
            pen += face.kern(prev, ch, px);
        }
        positions.push((ch, pen));
        pen += face.glyph_metrics(ch, px).advance_width;
        prev = Some(ch);
    }
    positions
}

/// Width of the inked pixels of `text` at `px`, the way captions are measured for wrapping.
pub fn measure<F: Typeface + ?Sized>(face: &F, text: &str, px: f32) -> InkExtent {
    let mut extent: Option<InkExtent> = None;
    for (ch, pen) in pen_positions(face, text, px) {
        let metrics = face.glyph_metrics(ch, px);
        if metrics.width == 0 || metrics.height == 0 {
            continue;
        }
        let left = pen.round() as i32 + metrics.xmin;
        let right = left + metrics.width as i32;
        extent = Some(match extent {
            Some(e) => InkExtent {
                left: e.left.min(left),
                right: e.right.max(right),
            },
            None => InkExtent { left, right },
        });
    }
    extent.unwrap_or_default()
}

/// Coverage mask for a run of text, positioned relative to a draw origin whose
/// top edge sits `ascent` above the baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMask {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

impl TextMask {
    pub fn render<F: Typeface + ?Sized>(face: &F, text: &str, px: f32) -> Self {
        let baseline = face.vertical_metrics(px).ascent.round() as i32;

        let mut glyphs = Vec::new();
        for (ch, pen) in pen_positions(face, text, px) {
            let (metrics, bitmap) = face.rasterize(ch, px);
            if metrics.width == 0 || metrics.height == 0 {
                continue;
            }
            let x = pen.round() as i32 + metrics.xmin;
            let y = baseline - (metrics.ymin + metrics.height as i32);
            glyphs.push((x, y, metrics, bitmap));
        }

        let (Some(left), Some(top)) = (
            glyphs.iter().map(|(x, ..)| *x).min(),
            glyphs.iter().map(|(_, y, ..)| *y).min(),
        ) else {
            return TextMask {
                left: 0,
                top: 0,
                width: 0,
                height: 0,
                coverage: Vec::new(),
            };
        };
        let right = glyphs
            .iter()
            .map(|(x, _, m, _)| x + m.width as i32)
            .max()
            .unwrap_or(left);
        let bottom = glyphs
            .iter()
            .map(|(_, y, m, _)| y + m.height as i32)
            .max()
            .unwrap_or(top);

        let width = (right - left) as u32;
        let height = (bottom - top) as u32;
        let mut coverage = vec![0u8; (width * height) as usize];

        for (x, y, metrics, bitmap) in glyphs {
            for (i, &alpha) in bitmap.iter().enumerate() {
                if alpha == 0 {
                    continue;
                }
                let cx = (x - left) as usize + i % metrics.width;
                let cy = (y - top) as usize + i / metrics.width;
                let cell = &mut coverage[cy * width as usize + cx];
                *cell = (*cell).max(alpha);
            }
        }

        TextMask {
            left,
            top,
            width,
            height,
            coverage,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
