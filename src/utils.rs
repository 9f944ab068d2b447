use std::process::{Command, Stdio};

use anyhow::Result;

pub fn check_ffmpeg_available() -> Result<()> {
    let status = Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(status) if status.success() => Ok(()),
        _ => anyhow::bail!(
            "FFmpeg not found! Please install FFmpeg:\n\
            Fedora: sudo dnf install ffmpeg\n\
            Ubuntu: sudo apt install ffmpeg\n\
            macOS: brew install ffmpeg"
        ),
    }
}

/// Timestamp used in generated file names, e.g. `20250101_120000`.
pub fn file_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_has_expected_shape() {
        let ts = file_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }
}
