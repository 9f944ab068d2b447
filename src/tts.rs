use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::TtsConfig;
use crate::utils::{check_ffmpeg_available, file_timestamp};

const LOUDNORM_FILTER: &str = "loudnorm=I=-16:LRA=11:TP=-1.5";
const OUTPUT_SAMPLE_RATE: &str = "44100";

/// Picks the narration text: inline text wins over a text file.
pub fn resolve_text(inline: Option<&str>, input_path: &Path) -> Result<String> {
    if let Some(text) = inline.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(text.to_string());
    }

    if !input_path.exists() {
        anyhow::bail!("Input file not found: {}", input_path.display());
    }
    let text = fs::read_to_string(input_path)
        .with_context(|| format!("Failed to read input file '{}'", input_path.display()))?;
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Empty text in '{}'", input_path.display());
    }
    Ok(text.to_string())
}

/// Text-to-speech stage: `edge-tts` for synthesis, ffmpeg for conversion to WAV.
pub struct Synthesizer {
    config: TtsConfig,
}

impl Synthesizer {
    pub fn new(config: TtsConfig) -> Self {
        Self { config }
    }

    /// Synthesizes `text` into `out_dir/voice_<ts>.wav` and returns its absolute path.
    pub fn synthesize(&self, text: &str) -> Result<PathBuf> {
        check_ffmpeg_available()?;

        let out_dir = &self.config.out_dir;
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output dir '{}'", out_dir.display()))?;

        let ts = file_timestamp();
        let tmp_mp3 = out_dir.join(format!("tts_tmp_{ts}.mp3"));
        let out_wav = out_dir.join(format!("voice_{ts}.wav"));

        info!(
            "🗣️  Synthesizing {} chars with voice {}",
            text.chars().count(),
            self.config.voice
        );
        self.synthesize_to_mp3(text, &tmp_mp3)
            .context("Edge TTS failed")?;

        let converted = mp3_to_wav(&tmp_mp3, &out_wav, self.config.normalize);
        if let Err(e) = fs::remove_file(&tmp_mp3) {
            warn!("Could not remove {}: {}", tmp_mp3.display(), e);
        }
        converted?;

        let out_wav = fs::canonicalize(&out_wav).unwrap_or(out_wav);
        info!("✅ Narration written to {}", out_wav.display());
        Ok(out_wav)
    }

    fn synthesize_to_mp3(&self, text: &str, mp3_path: &Path) -> Result<()> {
        let output = Command::new("edge-tts")
            .args(self.edge_tts_args(text))
            .arg("--write-media")
            .arg(mp3_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .context("Failed to run edge-tts - is it installed and on PATH?")?;

        if !output.status.success() {
            anyhow::bail!(
                "edge-tts exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        Ok(())
    }

    fn edge_tts_args(&self, text: &str) -> Vec<String> {
        vec![
            "--voice".to_string(),
            self.config.voice.clone(),
            format!("--rate={}", self.config.rate),
            format!("--volume={}", self.config.volume),
            "--text".to_string(),
            text.to_string(),
        ]
    }
}

fn ffmpeg_convert_args(mp3_path: &Path, wav_path: &Path, normalize: bool) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        mp3_path.display().to_string(),
    ];
    if normalize {
        args.extend(["-af".to_string(), LOUDNORM_FILTER.to_string()]);
    }
    args.extend([
        "-ar".to_string(),
        OUTPUT_SAMPLE_RATE.to_string(),
        wav_path.display().to_string(),
    ]);
    args
}

pub fn mp3_to_wav(mp3_path: &Path, wav_path: &Path, normalize: bool) -> Result<()> {
    let status = Command::new("ffmpeg")
        .args(ffmpeg_convert_args(mp3_path, wav_path, normalize))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .context("ffmpeg not found in PATH.")?;

    if !status.success() {
        anyhow::bail!("ffmpeg failed converting {}", mp3_path.display());
    }
    Ok(())
}
