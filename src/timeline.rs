use image::RgbaImage;
use tracing::{debug, info};

use crate::error::{CaptionError, CaptionResult};
use crate::grouping::group_words;
use crate::renderer::CaptionRenderer;
use crate::transcriber::Word;
use crate::typeface::Typeface;

/// Hold time after the last word of the whole transcript.
pub const TRAILING_PAD: f64 = 0.1;
pub const MIN_CLIP_DURATION: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

/// A caption image shown during `[start, start + duration)`, centered on the canvas.
#[derive(Debug, Clone)]
pub struct TimedClip {
    pub image: RgbaImage,
    pub start: f64,
    pub duration: f64,
    /// Top-left corner on the canvas; may be negative if the image outgrows it.
    pub position: (i64, i64),
}

impl TimedClip {
    fn centered(image: RgbaImage, canvas: CanvasSize, start: f64, end: f64) -> Self {
        let position = (
            (canvas.width as i64 - image.width() as i64) / 2,
            (canvas.height as i64 - image.height() as i64) / 2,
        );
        TimedClip {
            image,
            start,
            duration: (end - start).max(MIN_CLIP_DURATION),
            position,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn is_active(&self, t: f64) -> bool {
        t >= self.start && t < self.end()
    }
}

/// Smallest even canvas that fits every caption chunk plus `padding` on each side.
///
/// Every group is probe-rendered without highlighting; highlight color never changes
/// glyph metrics, so the probe footprint equals the final one.
pub fn compute_canvas<F: Typeface>(
    words: &[Word],
    group_size: usize,
    renderer: &CaptionRenderer<F>,
    padding: u32,
) -> CaptionResult<CanvasSize> {
    let groups = group_words(words, group_size)?;
    if groups.is_empty() {
        return Err(CaptionError::EmptyTranscript);
    }

    let (mut max_w, mut max_h) = (1, 1);
    for group in &groups {
        let img = renderer.render(&group.texts(), None);
        max_w = max_w.max(img.width());
        max_h = max_h.max(img.height());
    }

    let canvas = CanvasSize {
        width: padded_even(max_w, padding)?,
        height: padded_even(max_h, padding)?,
    };
    info!(
        "📐 Canvas {}x{} from {} caption groups",
        canvas.width,
        canvas.height,
        groups.len()
    );
    Ok(canvas)
}

/// `extent + 2 * padding`, rounded up to even.
fn padded_even(extent: u32, padding: u32) -> CaptionResult<u32> {
    padding
        .checked_mul(2)
        .and_then(|both_sides| extent.checked_add(both_sides))
        .and_then(|value| value.checked_add(value % 2))
        .ok_or_else(|| CaptionError::InvalidConfig {
            field: "auto_padding",
            reason: format!("{padding}px of padding overflows the canvas size"),
        })
}

/// Renders every caption group (or every word, when highlighting is enabled) into a
/// clip timed from the transcript, in transcript order.
pub fn build_timeline<F: Typeface>(
    words: &[Word],
    canvas: CanvasSize,
    group_size: usize,
    renderer: &CaptionRenderer<F>,
) -> CaptionResult<Vec<TimedClip>> {
    let groups = group_words(words, group_size)?;
    if groups.is_empty() {
        return Err(CaptionError::EmptyTranscript);
    }
    let highlight = renderer.style().highlight_enabled;
    let mut clips = Vec::with_capacity(if highlight { words.len() } else { groups.len() });

    for (gi, group) in groups.iter().enumerate() {
        let texts = group.texts();
        let group_start = group.start();
        let group_end = match groups.get(gi + 1) {
            Some(next) => next.start(),
            None => group.end() + TRAILING_PAD,
        };

        if !highlight {
            let img = renderer.render(&texts, None);
            clips.push(TimedClip::centered(img, canvas, group_start, group_end));
            continue;
        }

        let members = group.words();
        for (hi, word) in members.iter().enumerate() {
            let word_end = match members.get(hi + 1) {
                Some(next) => next.start,
                None => group_end,
            };
            let img = renderer.render(&texts, Some(hi));
            clips.push(TimedClip::centered(img, canvas, word.start, word_end));
        }
        debug!("Rendered {} highlight frames for group {}", texts.len(), gi);
    }

    info!("🎞️  Built {} caption clips", clips.len());
    Ok(clips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::CaptionStyle;
    use crate::typeface::tests::BlockFace;

    fn renderer(highlight_enabled: bool) -> CaptionRenderer<BlockFace> {
        CaptionRenderer::new(
            BlockFace,
            CaptionStyle {
                highlight_enabled,
                ..CaptionStyle::default()
            },
        )
    }

    fn transcript(texts: &[&str]) -> Vec<Word> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| Word::new(*text, i as f64 * 0.4, i as f64 * 0.4 + 0.3))
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn two_word_sentence_is_one_clip_with_trailing_pad() {
        let words = vec![Word::new("Hi", 0.0, 0.3), Word::new("there.", 0.3, 0.8)];
        let renderer = renderer(false);
        let canvas = compute_canvas(&words, 7, &renderer, 80).unwrap();
        let clips = build_timeline(&words, canvas, 7, &renderer).unwrap();

        assert_eq!(clips.len(), 1);
        assert!(approx(clips[0].start, 0.0));
        assert!(approx(clips[0].end(), 0.9));
    }

    #[test]
    fn one_clip_per_group_without_highlighting() {
        let words = transcript(&[
            "a", "b", "c,", "d", "e", "f", "g", "h", "i", "j", "k", "l.",
        ]);
        let renderer = renderer(false);
        let canvas = compute_canvas(&words, 7, &renderer, 0).unwrap();
        let clips = build_timeline(&words, canvas, 7, &renderer).unwrap();

        // "a b c," | "d".."j" | "k l."
        assert_eq!(clips.len(), 3);
        assert!(approx(clips[0].end(), words[3].start));
        assert!(approx(clips[1].start, words[3].start));
        assert!(approx(clips[1].end(), words[10].start));
        assert!(approx(clips[2].end(), words[11].end + TRAILING_PAD));
        for pair in clips.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
        assert!(clips.iter().all(|clip| clip.start < clip.end()));
    }

    #[test]
    fn one_clip_per_word_with_highlighting() {
        let words = transcript(&["one", "two,", "three", "four", "five."]);
        let renderer = renderer(true);
        let canvas = compute_canvas(&words, 7, &renderer, 80).unwrap();
        let clips = build_timeline(&words, canvas, 7, &renderer).unwrap();

        assert_eq!(clips.len(), words.len());
        for (clip, word) in clips.iter().zip(&words) {
            assert!(approx(clip.start, word.start));
            assert!(clip.duration >= MIN_CLIP_DURATION);
        }
        // Last word of a group holds until the next group starts.
        assert!(approx(clips[1].end(), words[2].start));
        assert!(approx(clips[4].end(), words[4].end + TRAILING_PAD));
    }

    #[test]
    fn overlapping_words_get_minimum_duration() {
        let words = vec![
            Word::new("fast", 1.0, 1.2),
            Word::new("talk", 1.0, 1.2),
            Word::new("here", 0.9, 1.4),
        ];
        let renderer = renderer(true);
        let canvas = compute_canvas(&words, 7, &renderer, 10).unwrap();
        let clips = build_timeline(&words, canvas, 7, &renderer).unwrap();

        assert!(approx(clips[0].duration, MIN_CLIP_DURATION));
        assert!(approx(clips[1].duration, MIN_CLIP_DURATION));
        assert!(approx(clips[2].end(), 1.5));
    }

    #[test]
    fn canvas_is_even_and_fits_every_clip() {
        let words = transcript(&["a", "much", "longer", "caption", "line", "here"]);
        let renderer = renderer(false);
        for padding in [0, 1, 7, 80] {
            let canvas = compute_canvas(&words, 2, &renderer, padding).unwrap();
            assert_eq!(canvas.width % 2, 0);
            assert_eq!(canvas.height % 2, 0);

            let clips = build_timeline(&words, canvas, 2, &renderer).unwrap();
            for clip in &clips {
                assert!(clip.image.width() + 2 * padding <= canvas.width);
                assert!(clip.image.height() + 2 * padding <= canvas.height);
                assert!(clip.position.0 >= padding as i64);
                assert!(clip.position.1 >= padding as i64);
            }
        }
    }

    #[test]
    fn padding_grows_canvas_by_twice_the_delta() {
        let words = transcript(&["Hello", "world,", "there"]);
        let renderer = renderer(false);
        let base = compute_canvas(&words, 7, &renderer, 40).unwrap();
        for delta in [1, 5, 40] {
            let grown = compute_canvas(&words, 7, &renderer, 40 + delta).unwrap();
            assert_eq!(grown.width, base.width + 2 * delta);
            assert_eq!(grown.height, base.height + 2 * delta);
        }
    }

    #[test]
    fn canvas_probe_ignores_highlighting() {
        let words = transcript(&["some", "words", "to", "measure"]);
        let plain = compute_canvas(&words, 7, &renderer(false), 80).unwrap();
        let highlighted = compute_canvas(&words, 7, &renderer(true), 80).unwrap();
        assert_eq!(plain, highlighted);
    }

    #[test]
    fn empty_transcript_fails() {
        let renderer = renderer(false);
        assert!(matches!(
            compute_canvas(&[], 7, &renderer, 80),
            Err(CaptionError::EmptyTranscript)
        ));
    }

    #[test]
    fn empty_transcript_has_no_timeline() {
        let renderer = renderer(true);
        let canvas = CanvasSize {
            width: 100,
            height: 100,
        };
        assert!(matches!(
            build_timeline(&[], canvas, 7, &renderer),
            Err(CaptionError::EmptyTranscript)
        ));
    }

    #[test]
    fn oversized_padding_is_rejected() {
        let words = transcript(&["hi"]);
        let renderer = renderer(false);
        assert!(matches!(
            compute_canvas(&words, 7, &renderer, u32::MAX / 2),
            Err(CaptionError::InvalidConfig {
                field: "auto_padding",
                ..
            })
        ));
        assert_eq!(padded_even(u32::MAX - 1, 0).unwrap(), u32::MAX - 1);
        assert!(padded_even(u32::MAX, 0).is_err());
    }

    #[test]
    fn clip_activity_window_is_half_open() {
        let clip = TimedClip::centered(
            RgbaImage::new(2, 2),
            CanvasSize {
                width: 10,
                height: 6,
            },
            1.0,
            2.0,
        );
        assert_eq!(clip.position, (4, 2));
        assert!(!clip.is_active(0.99));
        assert!(clip.is_active(1.0));
        assert!(clip.is_active(1.99));
        assert!(!clip.is_active(2.0));
    }
}
