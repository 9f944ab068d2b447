use std::ops::Range;

use fontdue::Font;
use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};

use crate::config::{RenderConfig, parse_hex_color};
use crate::error::CaptionResult;
use crate::typeface::{TextMask, Typeface, load_font, measure};

/// Gap between words on a line, in layout pixels at unit scale.
const WORD_SPACING: f32 = 28.0;
/// Extra horizontal room beyond the wrap width and margins.
const WIDTH_HEADROOM: i32 = 100;
const MARGIN_RATIO: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub font_size: u32,
    pub stroke_width: u32,
    /// Wrap budget in pixels at full scale.
    pub max_width: u32,
    pub line_spacing: u32,
    /// Directional drop shadow instead of a symmetric outline.
    pub text_shadow: bool,
    pub highlight_enabled: bool,
    /// Lay out at this multiple of the final size, then shrink.
    pub downscale_factor: Option<f32>,
    pub shadow_offset: (i32, i32),
    pub text_color: Rgba<u8>,
    pub stroke_color: Rgba<u8>,
    pub highlight_color: Rgba<u8>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        CaptionStyle {
            font_size: 80,
            stroke_width: 12,
            max_width: 1000,
            line_spacing: 3,
            text_shadow: true,
            highlight_enabled: false,
            downscale_factor: None,
            shadow_offset: (3, 3),
            text_color: Rgba([255, 255, 255, 255]),
            stroke_color: Rgba([0, 0, 0, 255]),
            highlight_color: Rgba([255, 255, 0, 255]),
        }
    }
}

impl CaptionStyle {
    pub fn from_config(config: &RenderConfig) -> CaptionResult<Self> {
        let opaque = |hex: &str| parse_hex_color(hex).map(|[r, g, b]| Rgba([r, g, b, 255]));

        Ok(CaptionStyle {
            font_size: config.font_size,
            stroke_width: config.stroke_width,
            max_width: config.max_width,
            line_spacing: config.line_spacing,
            text_shadow: config.text_shadow,
            highlight_enabled: config.highlight_enabled,
            downscale_factor: config
                .downscale_enabled
                .then_some(config.downscale_factor),
            shadow_offset: (config.shadow_offset[0], config.shadow_offset[1]),
            text_color: opaque(&config.text_color)?,
            stroke_color: opaque(&config.stroke_color)?,
            highlight_color: opaque(&config.highlight_color)?,
        })
    }

    fn scaled(&self) -> ScaledStyle {
        match self.downscale_factor {
            Some(scale) => {
                let by = |value: f32| (value * scale) as i32;
                ScaledStyle {
                    scale: Some(scale),
                    font_px: by(self.font_size as f32).max(1) as f32,
                    stroke_width: by(self.stroke_width as f32).max(1),
                    max_width: by(self.max_width as f32),
                    line_spacing: by(self.line_spacing as f32),
                    shadow_offset: (
                        by(self.shadow_offset.0 as f32),
                        by(self.shadow_offset.1 as f32),
                    ),
                    word_spacing: by(WORD_SPACING),
                }
            }
            None => ScaledStyle {
                scale: None,
                font_px: self.font_size as f32,
                stroke_width: self.stroke_width as i32,
                max_width: self.max_width as i32,
                line_spacing: self.line_spacing as i32,
                shadow_offset: self.shadow_offset,
                word_spacing: WORD_SPACING as i32,
            },
        }
    }
}

/// Style values in layout pixels, after the downscale factor is applied.
#[derive(Debug, Clone, Copy)]
struct ScaledStyle {
    scale: Option<f32>,
    font_px: f32,
    stroke_width: i32,
    max_width: i32,
    line_spacing: i32,
    shadow_offset: (i32, i32),
    word_spacing: i32,
}

/// Wrapped layout of one caption, in layout pixels (before any downscale).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionLayout {
    /// Word index ranges, one per line.
    pub lines: Vec<Range<usize>>,
    pub width: u32,
    pub height: u32,
    pub margin: i32,
    pub line_height: i32,
}

impl CaptionLayout {
    fn block_height(&self) -> i32 {
        self.lines.len() as i32 * self.line_height
    }
}

/// Rasterizes caption chunks into transparent images, one call per chunk/highlight pair.
pub struct CaptionRenderer<F = Font> {
    face: F,
    style: CaptionStyle,
}

impl CaptionRenderer<Font> {
    pub fn from_config(config: &RenderConfig) -> CaptionResult<Self> {
        let font = load_font(&config.font_path)?;
        Ok(Self::new(font, CaptionStyle::from_config(config)?))
    }
}

impl<F: Typeface> CaptionRenderer<F> {
    pub fn new(face: F, style: CaptionStyle) -> Self {
        Self { face, style }
    }

    pub fn style(&self) -> &CaptionStyle {
        &self.style
    }

    pub fn layout(&self, words: &[&str]) -> CaptionLayout {
        self.layout_scaled(words, &self.style.scaled())
    }

    fn layout_scaled(&self, words: &[&str], scaled: &ScaledStyle) -> CaptionLayout {
        let px = scaled.font_px;

        // Greedy wrap on the space-joined line; an over-wide word still gets a line of its own.
        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut current = String::new();
        for (i, word) in words.iter().enumerate() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&self.face, &candidate, px).width() <= scaled.max_width {
                current = candidate;
            } else {
                if i > line_start {
                    lines.push(line_start..i);
                }
                line_start = i;
                current = word.to_string();
            }
        }
        if line_start < words.len() {
            lines.push(line_start..words.len());
        }

        let widest_line = lines
            .iter()
            .map(|line| self.line_width(&words[line.clone()], scaled))
            .max()
            .unwrap_or(0);

        let metrics = self.face.vertical_metrics(px);
        let line_height =
            metrics.ascent.round() as i32 + metrics.descent.round() as i32 + scaled.line_spacing;
        let margin = (px * MARGIN_RATIO).round() as i32;

        let width = scaled.max_width.max(widest_line) + margin * 2 + WIDTH_HEADROOM;
        let height = lines.len() as i32 * line_height + margin * 2;

        CaptionLayout {
            lines,
            width: width.max(1) as u32,
            height: height.max(1) as u32,
            margin,
            line_height,
        }
    }

    fn line_width(&self, words: &[&str], scaled: &ScaledStyle) -> i32 {
        let ink: i32 = words
            .iter()
            .map(|word| measure(&self.face, word, scaled.font_px).width())
            .sum();
        ink + scaled.word_spacing * (words.len() as i32 - 1).max(0)
    }

    /// Draws `words` as a centered caption block. `highlight_index` recolors one word
    /// when highlighting is enabled; `None` renders every word in the fill color.
    pub fn render(&self, words: &[&str], highlight_index: Option<usize>) -> RgbaImage {
        let scaled = self.style.scaled();
        let layout = self.layout_scaled(words, &scaled);
        let mut img = RgbaImage::new(layout.width, layout.height);

        let highlight = highlight_index.filter(|_| self.style.highlight_enabled);
        let mut y = (layout.height as i32 - layout.block_height()) / 2;

        for line in &layout.lines {
            let masks: Vec<TextMask> = words[line.clone()]
                .iter()
                .map(|word| TextMask::render(&self.face, word, scaled.font_px))
                .collect();
            let line_width = masks.iter().map(|mask| mask.width as i32).sum::<i32>()
                + scaled.word_spacing * (masks.len() as i32 - 1);
            let mut x = (layout.width as i32 - line_width) / 2;

            for (word_index, mask) in line.clone().zip(&masks) {
                let fill = if highlight == Some(word_index) {
                    self.style.highlight_color
                } else {
                    self.style.text_color
                };

                self.draw_stroke(&mut img, mask, x, y, &scaled);
                draw_mask(&mut img, mask, x, y, fill);
                x += mask.width as i32 + scaled.word_spacing;
            }

            y += layout.line_height;
        }

        match scaled.scale {
            Some(scale) => {
                let width = ((layout.width as f32 / scale) as u32).max(1);
                let height = ((layout.height as f32 / scale) as u32).max(1);
                resize_premultiplied(&img, width, height)
            }
            None => img,
        }
    }

    fn draw_stroke(
        &self,
        img: &mut RgbaImage,
        mask: &TextMask,
        x: i32,
        y: i32,
        scaled: &ScaledStyle,
    ) {
        let color = self.style.stroke_color;
        let radius = scaled.stroke_width;

        if self.style.text_shadow {
            let (sx, sy) = scaled.shadow_offset;
            for i in 0..radius {
                draw_mask(img, mask, x + sx + i, y + sy + i, color);
            }
        } else {
            for dx in -radius..=radius {
                for dy in -radius..=radius {
                    if dx * dx + dy * dy <= radius * radius {
                        draw_mask(img, mask, x + dx, y + dy, color);
                    }
                }
            }
        }
    }
}

/// Composites `mask` in `color` with its draw origin at `(x, y)`, clipping to the image.
fn draw_mask(img: &mut RgbaImage, mask: &TextMask, x: i32, y: i32, color: Rgba<u8>) {
    if mask.is_empty() {
        return;
    }
    let (img_w, img_h) = (img.width() as i32, img.height() as i32);
    let origin_x = x + mask.left;
    let origin_y = y + mask.top;

    for (i, &coverage) in mask.coverage.iter().enumerate() {
        if coverage == 0 {
            continue;
        }
        let px = origin_x + (i % mask.width as usize) as i32;
        let py = origin_y + (i / mask.width as usize) as i32;
        if px < 0 || px >= img_w || py < 0 || py >= img_h {
            continue;
        }
        blend_over(img.get_pixel_mut(px as u32, py as u32), color, coverage);
    }
}

/// Lanczos resize in premultiplied alpha, so transparent pixels do not bleed
/// their color into anti-aliased edges.
fn resize_premultiplied(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let premultiplied = Rgba32FImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0.map(|c| c as f32 / 255.0);
        Rgba([r * a, g * a, b * a, a])
    });
    let resized = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = resized.get_pixel(x, y).0;
        let alpha = (a * 255.0).round().clamp(0.0, 255.0) as u8;
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let straight = |c: f32| (c / a * 255.0).round().clamp(0.0, 255.0) as u8;
        Rgba([straight(r), straight(g), straight(b), alpha])
    })
}

fn blend_over(dst: &mut Rgba<u8>, color: Rgba<u8>, coverage: u8) {
    let src_a = (coverage as f32 / 255.0) * (color[3] as f32 / 255.0);
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for i in 0..3 {
        let blended = (color[i] as f32 * src_a + dst[i] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[i] = blended.round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}
