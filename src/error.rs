use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the caption layout core and configuration validation.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("transcript contains no aligned words; no captions can be laid out")]
    EmptyTranscript,

    #[error("group size must be at least 1, got {0}")]
    InvalidGroupSize(usize),

    #[error("invalid config value for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("failed to load font '{}': {reason}", path.display())]
    Font { path: PathBuf, reason: String },
}

pub type CaptionResult<T> = std::result::Result<T, CaptionError>;
