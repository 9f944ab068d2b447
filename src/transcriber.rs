use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::config::{AsrConfig, Device};
use crate::error::CaptionError;

/// One aligned transcript token. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    #[serde(rename = "word", alias = "text")]
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Word {
            text: text.into(),
            start,
            end,
        }
    }
}

// Aligners leave words they could not place without timings, so every field is optional here.
#[derive(Debug, Deserialize)]
struct RawWord {
    #[serde(alias = "text")]
    word: Option<String>,
    start: Option<f64>,
    end: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    #[serde(default)]
    words: Vec<RawWord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptFile {
    Aligned { segments: Vec<RawSegment> },
    Flat(Vec<RawWord>),
}

/// Parses a word-level transcript, either a flat word array or aligner output with
/// `segments[].words[]`. Entries missing text or timings are dropped.
pub fn parse_transcript(json: &str) -> Result<Vec<Word>> {
    let file: TranscriptFile =
        serde_json::from_str(json).context("Transcript is not a word list or segment list")?;

    let raw_words: Vec<RawWord> = match file {
        TranscriptFile::Aligned { segments } => {
            segments.into_iter().flat_map(|seg| seg.words).collect()
        }
        TranscriptFile::Flat(words) => words,
    };

    let total = raw_words.len();
    let words: Vec<Word> = raw_words
        .into_iter()
        .filter_map(|raw| match (raw.word, raw.start, raw.end) {
            (Some(text), Some(start), Some(end)) if !text.trim().is_empty() => {
                Some(Word::new(text, start, end))
            }
            _ => None,
        })
        .collect();

    if words.len() < total {
        debug!(
            "Dropped {} transcript entries without text or timings",
            total - words.len()
        );
    }

    Ok(words)
}

pub fn load_transcript<P: AsRef<Path>>(path: P) -> Result<Vec<Word>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript '{}'", path.display()))?;
    parse_transcript(&content)
        .with_context(|| format!("Failed to parse transcript '{}'", path.display()))
}

/// Handle on the external forced-alignment ASR tool (`whisperx`).
///
/// Created once per run; owns a scratch directory for the tool's output that is
/// removed when the handle is dropped.
pub struct Transcriber {
    device: Device,
    compute_type: &'static str,
    model_name: String,
    vad_method: String,
    language: String,
    scratch: TempDir,
}

impl Transcriber {
    pub fn new(config: &AsrConfig) -> Result<Self> {
        let device = resolve_device(config.device, cuda_available());
        if config.device == Some(Device::Cuda) && device == Device::Cpu {
            warn!("CUDA requested but not available, falling back to CPU");
        }

        let scratch = tempfile::Builder::new()
            .prefix("captionviz-asr")
            .tempdir()
            .context("Failed to create ASR scratch directory")?;

        Ok(Transcriber {
            device,
            compute_type: compute_type(device),
            model_name: config.model_name.clone(),
            vad_method: config.vad_method.clone(),
            language: config.language.clone(),
            scratch,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn transcribe<P: AsRef<Path>>(&self, audio_path: P) -> Result<Vec<Word>> {
        let audio_path = audio_path.as_ref();
        info!(
            "🤖 Transcribing {} with whisperx model '{}' on {}",
            audio_path.display(),
            self.model_name,
            self.device.as_str()
        );

        let output = Command::new("whisperx")
            .arg(audio_path)
            .args(["--model", &self.model_name])
            .args(["--language", &self.language])
            .args(["--device", self.device.as_str()])
            .args(["--compute_type", self.compute_type])
            .args(["--vad_method", &self.vad_method])
            .args(["--output_format", "json"])
            .arg("--output_dir")
            .arg(self.scratch.path())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .context("Failed to run whisperx - is it installed and on PATH?")?;

        if !output.status.success() {
            anyhow::bail!(
                "whisperx failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let words = load_transcript(self.output_path(audio_path)?)?;
        if words.is_empty() {
            return Err(CaptionError::EmptyTranscript.into());
        }

        info!("📝 Transcription complete: {} aligned words", words.len());
        Ok(words)
    }

    fn output_path(&self, audio_path: &Path) -> Result<PathBuf> {
        let stem = audio_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid audio file path"))?;
        Ok(self.scratch.path().join(format!("{stem}.json")))
    }
}

fn resolve_device(preference: Option<Device>, cuda_available: bool) -> Device {
    match preference {
        Some(Device::Cuda) | None if cuda_available => Device::Cuda,
        _ => Device::Cpu,
    }
}

fn compute_type(device: Device) -> &'static str {
    match device {
        Device::Cuda => "float32",
        Device::Cpu => "int8",
    }
}

fn cuda_available() -> bool {
    Command::new("nvidia-smi")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
