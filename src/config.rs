use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{CaptionError, CaptionResult};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "captionviz.toml";

/// Upper bound on `render.auto_padding`, per side.
pub const MAX_AUTO_PADDING: u32 = 10_000;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    pub tts: TtsConfig,
    pub asr: AsrConfig,
    pub render: RenderConfig,
}

impl Config {
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file '{}' does not exist", path.display());
                }
                Self::from_file(path)?
            }
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_PATH);
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    Config::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let file_content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&file_content).with_context(|| {
            format!(
                "Failed to parse config file '{}' - check TOML syntax",
                path.display()
            )
        })?;

        Ok(config)
    }

    /// Rejects out-of-range values before any work starts.
    pub fn validate(&self) -> CaptionResult<()> {
        self.render.validate()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TtsConfig {
    pub out_dir: PathBuf,
    pub input_path: PathBuf,
    pub voice: String,
    pub rate: String,
    pub volume: String,
    pub normalize: bool,
}

impl Default for TtsConfig {
    fn default() -> Self {
        TtsConfig {
            out_dir: PathBuf::from("outputs"),
            input_path: Path::new("inputs").join("sample.txt"),
            voice: "en-US-JennyNeural".to_string(),
            rate: "+0%".to_string(),
            volume: "+0%".to_string(),
            normalize: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AsrConfig {
    pub model_name: String,
    pub vad_method: String,
    pub language: String,
    pub device: Option<Device>,
    /// Precomputed word-level transcript; skips the ASR tool when set.
    pub transcript_path: Option<PathBuf>,
}

impl Default for AsrConfig {
    fn default() -> Self {
        AsrConfig {
            model_name: "small".to_string(),
            vad_method: "silero".to_string(),
            language: "en".to_string(),
            device: None,
            transcript_path: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    #[serde(rename = "cpu")]
    Cpu,
    #[serde(rename = "cuda")]
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioSource {
    /// Newest `.wav` in `audio_dir`.
    #[serde(rename = "latest")]
    Latest,
    #[serde(rename = "path")]
    Path,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RenderConfig {
    pub out_dir: PathBuf,
    pub font_path: PathBuf,
    pub audio_source: AudioSource,
    pub audio_dir: Option<PathBuf>,
    pub audio_path: PathBuf,

    pub bg_color: String,
    pub fps: u32,
    pub auto_padding: u32,
    pub debug_mode: bool,
    pub fast_mode: bool,
    pub fast_duration: f64,

    pub group_words: usize,
    pub font_size: u32,
    pub stroke_width: u32,
    pub max_width: u32,
    pub line_spacing: u32,
    pub text_shadow: bool,
    pub highlight_enabled: bool,
    pub downscale_enabled: bool,
    pub downscale_factor: f32,
    pub shadow_offset: [i32; 2],

    pub text_color: String,
    pub stroke_color: String,
    pub highlight_color: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let out_dir = PathBuf::from("outputs");
        RenderConfig {
            audio_path: out_dir.join("my_voice.wav"),
            out_dir,
            font_path: Path::new("assets").join("fonts").join("MikadoBold.otf"),
            audio_source: AudioSource::Latest,
            audio_dir: None,

            bg_color: "#737373".to_string(),
            fps: 24,
            auto_padding: 80,
            debug_mode: false,
            fast_mode: false,
            fast_duration: 30.0,

            group_words: 7,
            font_size: 80,
            stroke_width: 12,
            max_width: 1000,
            line_spacing: 3,
            text_shadow: true,
            highlight_enabled: false,
            downscale_enabled: false,
            downscale_factor: 1.0,
            shadow_offset: [3, 3],

            text_color: "#FFFFFF".to_string(),
            stroke_color: "#000000".to_string(),
            highlight_color: "#FFFF00".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn audio_dir(&self) -> &Path {
        self.audio_dir.as_deref().unwrap_or(&self.out_dir)
    }

    pub fn background_rgb(&self) -> CaptionResult<[u8; 3]> {
        parse_hex_color(&self.bg_color)
    }

    fn validate(&self) -> CaptionResult<()> {
        if self.group_words == 0 {
            return Err(CaptionError::InvalidGroupSize(self.group_words));
        }
        if !(self.downscale_factor.is_finite() && self.downscale_factor > 0.0) {
            return Err(invalid(
                "downscale_factor",
                format!("must be positive, got {}", self.downscale_factor),
            ));
        }
        if self.font_size == 0 {
            return Err(invalid("font_size", "must be at least 1".to_string()));
        }
        if self.max_width == 0 {
            return Err(invalid("max_width", "must be at least 1".to_string()));
        }
        if self.fps == 0 {
            return Err(invalid("fps", "must be at least 1".to_string()));
        }
        if self.auto_padding > MAX_AUTO_PADDING {
            return Err(invalid(
                "auto_padding",
                format!("must be at most {MAX_AUTO_PADDING}, got {}", self.auto_padding),
            ));
        }
        if !(self.fast_duration.is_finite() && self.fast_duration > 0.0) {
            return Err(invalid(
                "fast_duration",
                format!("must be positive, got {}", self.fast_duration),
            ));
        }

        for color in [
            &self.bg_color,
            &self.text_color,
            &self.stroke_color,
            &self.highlight_color,
        ] {
            parse_hex_color(color)?;
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> CaptionError {
    CaptionError::InvalidConfig { field, reason }
}

/// Parses `#RRGGBB` (leading `#` and surrounding whitespace optional).
pub fn parse_hex_color(hex: &str) -> CaptionResult<[u8; 3]> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CaptionError::InvalidColor(hex.to_string()));
    }

    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16)
            .map_err(|_| CaptionError::InvalidColor(hex.to_string()))
    };

    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.render.group_words, 7);
        assert_eq!(config.render.font_size, 80);
        assert_eq!(config.render.background_rgb().unwrap(), [0x73, 0x73, 0x73]);
        assert_eq!(config.render.audio_dir(), Path::new("outputs"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r##"
            [render]
            group_words = 4
            highlight_enabled = true
            bg_color = "#102030"

            [asr]
            device = "cuda"
            "##,
        )
        .unwrap();

        assert_eq!(config.render.group_words, 4);
        assert!(config.render.highlight_enabled);
        assert_eq!(config.render.stroke_width, 12);
        assert_eq!(config.render.background_rgb().unwrap(), [0x10, 0x20, 0x30]);
        assert_eq!(config.asr.device, Some(Device::Cuda));
        assert_eq!(config.tts.voice, "en-US-JennyNeural");
    }

    #[test]
    fn zero_group_size_is_rejected() {
        let mut config = Config::default();
        config.render.group_words = 0;
        assert!(matches!(
            config.validate(),
            Err(CaptionError::InvalidGroupSize(0))
        ));
    }

    #[test]
    fn non_positive_downscale_factor_is_rejected() {
        let mut config = Config::default();
        config.render.downscale_factor = 0.0;
        assert!(matches!(
            config.validate(),
            Err(CaptionError::InvalidConfig {
                field: "downscale_factor",
                ..
            })
        ));
    }

    #[test]
    fn huge_auto_padding_is_rejected() {
        let mut config = Config::default();
        config.render.auto_padding = MAX_AUTO_PADDING;
        assert!(config.validate().is_ok());

        config.render.auto_padding = u32::MAX;
        assert!(matches!(
            config.validate(),
            Err(CaptionError::InvalidConfig {
                field: "auto_padding",
                ..
            })
        ));
    }

    #[test]
    fn bad_color_is_rejected() {
        let mut config = Config::default();
        config.render.highlight_color = "yellow".to_string();
        assert!(matches!(
            config.validate(),
            Err(CaptionError::InvalidColor(_))
        ));
    }

    #[test]
    fn parse_hex_color_accepts_optional_hash() {
        assert_eq!(parse_hex_color("#FFD700").unwrap(), [255, 215, 0]);
        assert_eq!(parse_hex_color(" 00ff7f ").unwrap(), [0, 255, 127]);
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#12345G").is_err());
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let result = Config::load_or_default(Some(Path::new("/definitely/not/here.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn load_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[render]\ndownscale_factor = -2.0\n").unwrap();
        assert!(Config::load_or_default(Some(&path)).is_err());

        fs::write(&path, "[render]\nfps = 30\n").unwrap();
        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.render.fps, 30);
    }
}
