use std::path::Path;

use anyhow::Result;
use captionviz::cli::{Cli, Commands, RenderArgs};
use captionviz::config::{AudioSource, Config};
use captionviz::pipeline;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    info!("✅ Configuration loaded successfully!");

    match cli.command {
        Commands::Tts(tts) => {
            let wav = pipeline::synthesize(&config, tts.text.as_deref(), tts.input.as_deref())?;
            println!("{}", wav.display());
        }
        Commands::Render { audio, args } => {
            apply_render_overrides(&mut config, args, audio.as_deref());
            let video = pipeline::render(&config, audio.as_deref())?;
            println!("{}", video.display());
        }
        Commands::Run { tts, render } => {
            apply_render_overrides(&mut config, render, None);
            let wav = pipeline::synthesize(&config, tts.text.as_deref(), tts.input.as_deref())?;
            info!("\n🎬 Rendering captions for fresh narration...");
            let video = pipeline::render(&config, Some(&wav))?;
            println!("{}", video.display());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Folds render flags into the config.
fn apply_render_overrides(config: &mut Config, args: RenderArgs, audio: Option<&Path>) {
    if let Some(font) = args.font {
        config.render.font_path = font;
    }
    if let Some(transcript) = args.transcript {
        config.asr.transcript_path = Some(transcript);
    }
    if let Some(audio) = audio {
        config.render.audio_source = AudioSource::Path;
        config.render.audio_path = audio.to_path_buf();
    }
}
