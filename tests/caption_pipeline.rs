mod common;

use std::fs;

use captionviz::config::{AsrConfig, Config, RenderConfig};
use captionviz::pipeline::{caption_timeline, transcribe};
use captionviz::transcriber::parse_transcript;
use captionviz::{CaptionError, CaptionRenderer, CaptionStyle, Compositor, Word};
use common::BlockFace;
use image::Rgb;

const GRAY: Rgb<u8> = Rgb([115, 115, 115]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

fn renderer(config: &RenderConfig) -> CaptionRenderer<BlockFace> {
    CaptionRenderer::new(BlockFace, CaptionStyle::from_config(config).unwrap())
}

#[test]
fn short_sentence_renders_one_centered_caption() {
    let words = parse_transcript(
        r#"[{"word": "Hi", "start": 0.0, "end": 0.3},
            {"word": "there.", "start": 0.3, "end": 0.8}]"#,
    )
    .unwrap();
    let config = RenderConfig::default();
    let (canvas, clips) = caption_timeline(&words, &config, &renderer(&config)).unwrap();

    // 1196x179 caption plus 80px padding, rounded up to even.
    assert_eq!((canvas.width, canvas.height), (1356, 340));
    assert_eq!(clips.len(), 1);
    assert_eq!(clips[0].position, (80, 80));
    assert!((clips[0].end() - 0.9).abs() < 1e-9);

    let compositor = Compositor::new(canvas, config.background_rgb().unwrap());
    let frame = compositor.render_frame(&clips, 0.5);
    // "Hi there." is 396px wide, so the first glyph's ink starts at 80 + 400 + 4.
    assert_eq!(*frame.get_pixel(485, 150), WHITE);
    assert_eq!(*frame.get_pixel(10, 10), GRAY);

    let after = compositor.render_frame(&clips, 0.95);
    assert!(after.pixels().all(|p| *p == GRAY));
}

#[test]
fn highlighted_word_follows_the_narration() {
    let words = vec![
        Word::new("one", 0.0, 0.4),
        Word::new("two", 0.5, 0.9),
        Word::new("three.", 1.0, 1.4),
        Word::new("four", 1.6, 2.0),
    ];
    let config = RenderConfig {
        highlight_enabled: true,
        ..RenderConfig::default()
    };
    let (canvas, clips) = caption_timeline(&words, &config, &renderer(&config)).unwrap();
    assert_eq!(clips.len(), words.len());

    let compositor = Compositor::new(canvas, config.background_rgb().unwrap());
    for word in &words {
        let frame = compositor.render_frame(&clips, word.start + 0.1);
        assert!(frame.pixels().any(|p| *p == YELLOW));
        assert!(frame.pixels().any(|p| *p == WHITE) || word.text == "four");
    }

    // Exactly one clip is visible at any instant inside the timeline.
    for step in 0..21 {
        let t = step as f64 * 0.1;
        assert_eq!(Compositor::active_clips(&clips, t).len(), 1, "t = {t}");
    }
    assert!(Compositor::active_clips(&clips, 2.2).is_empty());
}

#[test]
fn precomputed_aligned_transcript_skips_recognition() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.json");
    fs::write(
        &path,
        r#"{"segments": [
            {"text": "Hello world.", "words": [
                {"word": "Hello", "start": 0.1, "end": 0.4, "score": 0.9},
                {"word": "world.", "start": 0.5, "end": 0.9}
            ]},
            {"text": "2024", "words": [{"word": "2024"}]}
        ]}"#,
    )
    .unwrap();

    let asr = AsrConfig {
        transcript_path: Some(path),
        ..AsrConfig::default()
    };
    let words = transcribe(&asr, &dir.path().join("unused.wav")).unwrap();
    assert_eq!(
        words,
        vec![Word::new("Hello", 0.1, 0.4), Word::new("world.", 0.5, 0.9)]
    );
}

#[test]
fn empty_transcript_stops_the_render() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("words.json");
    fs::write(&path, "[]").unwrap();

    let asr = AsrConfig {
        transcript_path: Some(path),
        ..AsrConfig::default()
    };
    let err = transcribe(&asr, &dir.path().join("unused.wav")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CaptionError>(),
        Some(CaptionError::EmptyTranscript)
    ));
}

#[test]
fn config_file_drives_grouping_and_colors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("captionviz.toml");
    fs::write(
        &path,
        "[render]\ngroup_words = 2\nbg_color = \"#102030\"\n\n[asr]\nlanguage = \"de\"\n",
    )
    .unwrap();

    let config = Config::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.asr.language, "de");
    assert_eq!(config.render.background_rgb().unwrap(), [16, 32, 48]);
    assert_eq!(config.render.font_size, 80);

    let words: Vec<Word> = ["a", "b", "c", "d", "e"]
        .iter()
        .enumerate()
        .map(|(i, text)| Word::new(*text, i as f64, i as f64 + 0.5))
        .collect();
    let (_, clips) =
        caption_timeline(&words, &config.render, &renderer(&config.render)).unwrap();
    assert_eq!(clips.len(), 3);
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("captionviz.toml");
    fs::write(&path, "[render]\ngroup_words = 0\n").unwrap();
    assert!(Config::load_or_default(Some(&path)).is_err());

    fs::write(&path, "[render]\nhighlight_color = \"yellow\"\n").unwrap();
    assert!(Config::load_or_default(Some(&path)).is_err());
}
