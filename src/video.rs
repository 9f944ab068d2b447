use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::RenderConfig;
use crate::timeline::{CanvasSize, TimedClip};
use crate::utils::{check_ffmpeg_available, file_timestamp};

const DEBUG_FRAME_PATH: &str = "debug_frame.png";
const DEBUG_FRAME_TIME: f64 = 1.0;

/// Stacks timed caption clips over a solid background, one frame at a time.
pub struct Compositor {
    width: u32,
    height: u32,
    background: Rgb<u8>,
}

impl Compositor {
    /// Odd canvas dimensions are cropped down to even for the encoder.
    pub fn new(canvas: CanvasSize, background: [u8; 3]) -> Self {
        Self {
            width: (canvas.width - canvas.width % 2).max(2),
            height: (canvas.height - canvas.height % 2).max(2),
            background: Rgb(background),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Indices of the clips visible at `t`, in stacking order.
    pub fn active_clips(clips: &[TimedClip], t: f64) -> Vec<usize> {
        clips
            .iter()
            .enumerate()
            .filter(|(_, clip)| clip.is_active(t))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn render_frame(&self, clips: &[TimedClip], t: f64) -> RgbImage {
        self.compose(clips, &Self::active_clips(clips, t))
    }

    fn compose(&self, clips: &[TimedClip], active: &[usize]) -> RgbImage {
        let mut frame = RgbImage::from_pixel(self.width, self.height, self.background);
        for &index in active {
            overlay_clip(&mut frame, &clips[index]);
        }
        frame
    }
}

fn overlay_clip(frame: &mut RgbImage, clip: &TimedClip) {
    let (frame_w, frame_h) = (frame.width() as i64, frame.height() as i64);
    let (ox, oy) = clip.position;

    for (x, y, pixel) in clip.image.enumerate_pixels() {
        let alpha = pixel[3];
        if alpha == 0 {
            continue;
        }
        let fx = ox + x as i64;
        let fy = oy + y as i64;
        if fx < 0 || fx >= frame_w || fy < 0 || fy >= frame_h {
            continue;
        }

        let dst = frame.get_pixel_mut(fx as u32, fy as u32);
        let alpha_f = alpha as f32 / 255.0;
        for i in 0..3 {
            dst.0[i] =
                ((1.0 - alpha_f) * dst.0[i] as f32 + alpha_f * pixel.0[i] as f32).round() as u8;
        }
    }
}

pub fn frame_count(duration: f64, fps: u32) -> u64 {
    (duration * fps as f64).ceil().max(0.0) as u64
}

/// Writes the final H.264/AAC video for a caption timeline.
pub struct VideoGenerator {
    config: RenderConfig,
}

impl VideoGenerator {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Encodes `clips` over the background with the narration as audio track and
    /// returns the path of the written `render_<ts>.mp4`.
    pub fn generate(
        &self,
        compositor: &Compositor,
        clips: &[TimedClip],
        audio_path: &Path,
        narration_duration: f64,
    ) -> Result<PathBuf> {
        check_ffmpeg_available()?;

        let out_dir = &self.config.out_dir;
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output dir '{}'", out_dir.display()))?;
        let output_path = out_dir.join(format!("render_{}.mp4", file_timestamp()));

        let duration = output_duration(&self.config, narration_duration);
        let fps = self.config.fps;
        let total_frames = frame_count(duration, fps);
        info!(
            "🎬 Duration: {:.2}s, FPS: {}, Total frames: {}",
            duration, fps, total_frames
        );

        if self.config.debug_mode {
            save_debug_frame(compositor, clips, Path::new(DEBUG_FRAME_PATH))?;
        }

        self.generate_streaming(
            compositor,
            clips,
            audio_path,
            &output_path,
            duration,
            total_frames,
        )?;

        let output_path = fs::canonicalize(&output_path).unwrap_or(output_path);
        info!("📁 Output: {}", output_path.display());
        Ok(output_path)
    }

    fn generate_streaming(
        &self,
        compositor: &Compositor,
        clips: &[TimedClip],
        audio_path: &Path,
        output_path: &Path,
        duration: f64,
        total_frames: u64,
    ) -> Result<()> {
        let video_encoder = get_best_available_encoder()?;
        let (width, height) = compositor.size();
        let fps = self.config.fps;
        debug!(
            "Encoding {}x{} @ {}fps for {:.2}s with {}",
            width, height, fps, duration, video_encoder
        );

        let mut ffmpeg_cmd = Command::new("ffmpeg")
            .args(encode_args(width, height, fps))
            .arg("-i")
            .arg(audio_path)
            .args(["-map", "0:v:0", "-map", "1:a:0"])
            .args(["-c:v", video_encoder.as_str()])
            .args(preset_args(&video_encoder))
            .args(["-c:a", "aac", "-pix_fmt", "yuv420p"])
            .args(["-t", &format!("{duration:.3}")])
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to start ffmpeg")?;

        let stdin = ffmpeg_cmd
            .stdin
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("Failed to open FFmpeg stdin"))?;

        let progress = ProgressBar::new(total_frames);
        progress.set_style(
            ProgressStyle::with_template(
                "🎬 {bar:40.cyan/blue} {percent}% ({pos}/{len} frames) [{elapsed_precise}]",
            )?
            .progress_chars("█░ "),
        );

        let mut previous: Option<(Vec<usize>, Vec<u8>)> = None;
        for frame_num in 0..total_frames {
            let t = frame_num as f64 / fps as f64;
            let active = Compositor::active_clips(clips, t);

            // Caption changes are rare relative to the frame rate.
            let raw_bytes = match previous.take() {
                Some((last_active, bytes)) if last_active == active => (last_active, bytes),
                _ => {
                    let bytes = compositor.compose(clips, &active).into_raw();
                    (active, bytes)
                }
            };

            if let Err(e) = stdin.write_all(&raw_bytes.1) {
                if e.kind() == std::io::ErrorKind::BrokenPipe {
                    debug!("FFmpeg closed its input early at frame {}", frame_num);
                    break;
                }
                let _ = ffmpeg_cmd.kill();
                let output = ffmpeg_cmd.wait_with_output()?;
                anyhow::bail!(
                    "FFmpeg write failed: {}\nFFmpeg error: {}",
                    e,
                    String::from_utf8_lossy(&output.stderr)
                );
            }

            previous = Some(raw_bytes);
            progress.inc(1);
        }
        progress.finish_and_clear();

        // Close stdin to signal end of video stream
        drop(ffmpeg_cmd.stdin.take());

        info!("🔄 Finalizing video...");
        let output = ffmpeg_cmd.wait_with_output()?;
        if !output.status.success() {
            anyhow::bail!("FFmpeg failed: {}", String::from_utf8_lossy(&output.stderr));
        }

        Ok(())
    }
}

/// Length of the exported video: the narration, or a fast-mode preview no longer than it.
pub fn output_duration(config: &RenderConfig, narration_duration: f64) -> f64 {
    if config.fast_mode {
        config.fast_duration.min(narration_duration)
    } else {
        narration_duration
    }
}

/// Writes the composited frame at the debug timestamp as a PNG.
pub fn save_debug_frame(compositor: &Compositor, clips: &[TimedClip], path: &Path) -> Result<()> {
    compositor
        .render_frame(clips, DEBUG_FRAME_TIME)
        .save(path)
        .with_context(|| format!("Failed to save debug frame '{}'", path.display()))?;
    info!("🐞 Debug frame saved to {}", path.display());
    Ok(())
}

/// Raw RGB24 frames on stdin as the first input.
fn encode_args(width: u32, height: u32, fps: u32) -> Vec<String> {
    let size = format!("{width}x{height}");
    let rate = fps.to_string();
    [
        "-y", "-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgb24", "-s", &size, "-r",
        &rate, "-i", "pipe:0",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn preset_args(encoder: &str) -> Vec<&'static str> {
    if encoder == "libx264" {
        vec!["-preset", "ultrafast"]
    } else {
        Vec::new()
    }
}

fn get_best_available_encoder() -> Result<String> {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()?;
    let encoders_output = String::from_utf8_lossy(&output.stdout);

    // Try encoders in order of preference
    let preferred_encoders = ["libx264", "mpeg4", "mpeg2video"];
    for encoder in &preferred_encoders {
        if encoders_output.contains(encoder) {
            info!("✅ Using video encoder: {}", encoder);
            return Ok(encoder.to_string());
        }
    }

    anyhow::bail!("No suitable video encoder found")
}
