use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Sets a custom config file
    #[arg(long, global = true, value_name = "CONFIG FILE")]
    pub config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synthesize a narration WAV from text
    Tts(TtsArgs),
    /// Transcribe a narration and export the captioned video
    Render {
        /// Narration file, instead of the configured lookup
        #[arg(short, long, value_name = "AUDIO FILE")]
        audio: Option<PathBuf>,
        #[command(flatten)]
        args: RenderArgs,
    },
    /// Synthesize a narration, then render it (always captions the fresh narration)
    Run {
        #[command(flatten)]
        tts: TtsArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args)]
pub struct TtsArgs {
    /// Text to speak (takes precedence over the input file)
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Text file to speak
    #[arg(short, long, value_name = "TEXT FILE")]
    pub input: Option<PathBuf>,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Custom font file (TTF, OTF)
    #[arg(
        short,
        long,
        value_name = "FONT FILE",
        help = "Custom font file to use for caption rendering"
    )]
    pub font: Option<PathBuf>,

    /// Word-level transcript JSON, skipping speech recognition
    #[arg(long, value_name = "TRANSCRIPT FILE")]
    pub transcript: Option<PathBuf>,
}
