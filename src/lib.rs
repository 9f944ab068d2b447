pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod grouping;
pub mod pipeline;
pub mod renderer;
pub mod timeline;
pub mod transcriber;
pub mod tts;
pub mod typeface;
pub mod utils;
pub mod video;

pub use cli::Cli;
pub use config::Config;
pub use error::CaptionError;
pub use grouping::{CaptionGroup, group_words};
pub use renderer::{CaptionLayout, CaptionRenderer, CaptionStyle};
pub use timeline::{CanvasSize, TimedClip, build_timeline, compute_canvas};
pub use transcriber::{Transcriber, Word};
pub use typeface::Typeface;
pub use video::{Compositor, VideoGenerator};
