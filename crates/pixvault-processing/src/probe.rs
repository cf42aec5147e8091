//! Media probing.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use pixvault_core::{AppError, FormatSupport};

use crate::thumbnail::picture_dimensions;

/// Result of probing a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

/// Probes a local media file for dimensions and format.
///
/// Probing happens before any storage side effect; a failure surfaces as
/// [`AppError::UnrecognizedMedia`] and aborts the import cleanly.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path, kind: FormatSupport) -> Result<MediaInfo, AppError>;
}

/// Production prober: decodes pictures with the `image` crate and probes
/// videos with `ffprobe`.
pub struct StandardProber {
    ffprobe_path: String,
}

#[derive(Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    codec_name: Option<String>,
}

impl StandardProber {
    pub fn new(ffprobe_path: String) -> Self {
        Self { ffprobe_path }
    }

    async fn probe_picture(&self, path: &Path) -> Result<MediaInfo, AppError> {
        let data = tokio::fs::read(path).await?;
        let (width, height, format) = picture_dimensions(&data)?;
        Ok(MediaInfo {
            width,
            height,
            format,
        })
    }

    async fn probe_video(&self, path: &Path) -> Result<MediaInfo, AppError> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,codec_name",
                "-of",
                "json",
            ])
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to execute ffprobe: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::ImageProcessing(format!(
                "ffprobe failed: {}",
                stderr.trim()
            )));
        }

        let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| AppError::ImageProcessing(format!("Invalid ffprobe output: {}", e)))?;

        let stream = parsed
            .streams
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ImageProcessing("No video stream found".to_string()))?;

        match (stream.width, stream.height) {
            (Some(width), Some(height)) => Ok(MediaInfo {
                width,
                height,
                format: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
            }),
            _ => Err(AppError::ImageProcessing(
                "Video stream has no dimensions".to_string(),
            )),
        }
    }
}

#[async_trait]
impl MediaProber for StandardProber {
    #[tracing::instrument(skip(self), fields(media.path = %path.display()))]
    async fn probe(&self, path: &Path, kind: FormatSupport) -> Result<MediaInfo, AppError> {
        let result = match kind {
            FormatSupport::Picture => self.probe_picture(path).await,
            FormatSupport::Video => self.probe_video(path).await,
        };

        result.map_err(|e| {
            tracing::debug!(error = %e, "Probe failed");
            AppError::UnrecognizedMedia(path.display().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn write_test_png(dir: &Path, width: u32, height: u32) -> std::path::PathBuf {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Png).unwrap();
        let path = dir.join("probe.png");
        std::fs::write(&path, buffer.into_inner()).unwrap();
        path
    }

    #[tokio::test]
    async fn probes_picture_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_png(dir.path(), 640, 480);

        let prober = StandardProber::new("ffprobe".to_string());
        let info = prober.probe(&path, FormatSupport::Picture).await.unwrap();
        assert_eq!(info.width, 640);
        assert_eq!(info.height, 480);
        assert_eq!(info.format, "png");
    }

    #[tokio::test]
    async fn unreadable_picture_is_unrecognized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        let prober = StandardProber::new("ffprobe".to_string());
        let result = prober.probe(&path, FormatSupport::Picture).await;
        assert!(matches!(result, Err(AppError::UnrecognizedMedia(_))));
    }
}
