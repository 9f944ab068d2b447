use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::audio::{audio_duration, resolve_narration};
use crate::config::{AsrConfig, Config, RenderConfig};
use crate::error::CaptionError;
use crate::renderer::CaptionRenderer;
use crate::timeline::{CanvasSize, TimedClip, build_timeline, compute_canvas};
use crate::transcriber::{Transcriber, Word, load_transcript};
use crate::tts::{Synthesizer, resolve_text};
use crate::typeface::Typeface;
use crate::video::{Compositor, VideoGenerator};

/// Text-to-speech stage. Returns the absolute path of the new narration WAV.
pub fn synthesize(config: &Config, text: Option<&str>, input: Option<&Path>) -> Result<PathBuf> {
    let input_path = input.unwrap_or(&config.tts.input_path);
    let text = resolve_text(text, input_path)?;
    Synthesizer::new(config.tts.clone()).synthesize(&text)
}

/// Word-level transcript for `audio_path`, from a precomputed file when configured.
pub fn transcribe(config: &AsrConfig, audio_path: &Path) -> Result<Vec<Word>> {
    let words = match &config.transcript_path {
        Some(path) => {
            info!("📄 Using precomputed transcript {}", path.display());
            load_transcript(path)?
        }
        None => {
            let transcriber = Transcriber::new(config)?;
            let words = transcriber.transcribe(audio_path)?;
            info!("ASR ran on {}", transcriber.device().as_str());
            words
        }
    };

    if words.is_empty() {
        return Err(CaptionError::EmptyTranscript).context("ASR returned no aligned words");
    }
    Ok(words)
}

/// Sizing pass followed by the rendering pass.
pub fn caption_timeline<F: Typeface>(
    words: &[Word],
    config: &RenderConfig,
    renderer: &CaptionRenderer<F>,
) -> Result<(CanvasSize, Vec<TimedClip>)> {
    let canvas = compute_canvas(words, config.group_words, renderer, config.auto_padding)?;
    let clips = build_timeline(words, canvas, config.group_words, renderer)?;
    Ok((canvas, clips))
}

/// Rendering stage: transcribe the narration, lay out captions and export the video.
/// `audio` overrides the configured narration lookup.
pub fn render(config: &Config, audio: Option<&Path>) -> Result<PathBuf> {
    let render_config = &config.render;

    // Everything that can fail on configuration alone is checked before any heavy work.
    let audio_path = match audio {
        Some(path) if path.exists() => path.to_path_buf(),
        Some(path) => anyhow::bail!("Audio file not found: {}", path.display()),
        None => resolve_narration(render_config)?,
    };
    let background = render_config.background_rgb()?;
    let renderer = CaptionRenderer::from_config(render_config)?;
    info!("🎵 Processing audio: {}", audio_path.display());

    let words = transcribe(&config.asr, &audio_path)?;
    let narration_duration = audio_duration(&audio_path)?;

    let (canvas, clips) = caption_timeline(&words, render_config, &renderer)?;
    let compositor = Compositor::new(canvas, background);

    VideoGenerator::new(render_config.clone()).generate(
        &compositor,
        &clips,
        &audio_path,
        narration_duration,
    )
}
