// Shared by the unit tests in src/typeface.rs and the integration tests via `include!`.

/// Fixed-pitch face drawing every non-space glyph as a solid block.
/// At 80px: advance 48, ink 40x60 starting 4px right of the pen, ascent 60, descent 20.
pub struct BlockFace;

impl Typeface for BlockFace {
    fn vertical_metrics(&self, px: f32) -> VerticalMetrics {
        VerticalMetrics {
            ascent: px * 0.75,
            descent: px * 0.25,
        }
    }

    fn glyph_metrics(&self, ch: char, px: f32) -> GlyphMetrics {
        let advance_width = (px * 0.6).round();
        if ch.is_whitespace() {
            return GlyphMetrics {
                xmin: 0,
                ymin: 0,
                width: 0,
                height: 0,
                advance_width,
            };
        }
        GlyphMetrics {
            xmin: (px * 0.05).round() as i32,
            ymin: 0,
            width: (px * 0.5).round() as usize,
            height: (px * 0.75).round() as usize,
            advance_width,
        }
    }

    fn rasterize(&self, ch: char, px: f32) -> (GlyphMetrics, Vec<u8>) {
        let metrics = self.glyph_metrics(ch, px);
        (metrics, vec![255; metrics.width * metrics.height])
    }
}
