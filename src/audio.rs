use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

use crate::config::{AudioSource, RenderConfig};

/// Newest file in `folder` whose extension matches `ext` (case-insensitive, no dot).
pub fn find_latest_file(folder: &Path, ext: &str) -> Result<Option<PathBuf>> {
    if !folder.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(folder)
        .with_context(|| format!("Failed to list '{}'", folder.display()))?
    {
        let path = entry?.path();
        let matches = path.is_file()
            && path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if !matches {
            continue;
        }

        let modified = fs::metadata(&path)?.modified()?;
        if latest.as_ref().is_none_or(|(best, _)| modified > *best) {
            latest = Some((modified, path));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

/// Picks the narration track the render stage should caption.
pub fn resolve_narration(config: &RenderConfig) -> Result<PathBuf> {
    let resolved = match config.audio_source {
        AudioSource::Latest => find_latest_file(config.audio_dir(), "wav")?,
        AudioSource::Path => Some(config.audio_path.clone()).filter(|p| p.exists()),
    };

    resolved.ok_or_else(|| {
        anyhow::anyhow!(
            "No audio found. Set render.audio_source/audio_dir/audio_path correctly \
             (looked in '{}')",
            match config.audio_source {
                AudioSource::Latest => config.audio_dir().display(),
                AudioSource::Path => config.audio_path.display(),
            }
        )
    })
}

/// Length of the first decodable audio track, in seconds.
pub fn audio_duration<P: AsRef<Path>>(audio_path: P) -> Result<f64> {
    let audio_path = audio_path.as_ref();
    let src = fs::File::open(audio_path)
        .with_context(|| format!("Failed to open audio '{}'", audio_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = audio_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Unsupported audio format '{}'", audio_path.display()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| anyhow::anyhow!("No supported audio tracks"))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| anyhow::anyhow!("Audio track has no sample rate"))?;

    if let Some(frames) = track.codec_params.n_frames {
        let duration = frames as f64 / sample_rate as f64;
        info!("🎵 Narration: {:.2}s @ {}Hz", duration, sample_rate);
        return Ok(duration);
    }

    // Container without a frame count: decode and count.
    debug!("No frame count in header, decoding to measure duration");
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Unsupported audio codec")?;
    let mut frames = 0u64;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        frames += decoder.decode(&packet)?.frames() as u64;
    }

    let duration = frames as f64 / sample_rate as f64;
    info!("🎵 Narration: {:.2}s @ {}Hz", duration, sample_rate);
    Ok(duration)
}
