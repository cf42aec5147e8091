//! Synthetic media and mock prober/transcoder implementations.

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::Path;

use pixvault_core::{AppError, FormatSupport};
use pixvault_processing::thumbnail::picture_dimensions;
use pixvault_processing::{MediaInfo, MediaProber, VideoTranscoder};

/// Byte size of the MP4 rendition produced by [`MockTranscoder`].
pub const MOCK_MP4_LEN: usize = 131_072;

/// Gradient JPEG; compresses worse than a flat fill so thumbnail byte sizes
/// track pixel counts.
pub fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Jpeg)
        .expect("encoding a synthetic JPEG cannot fail");
    buffer.into_inner()
}

/// Prober that decodes pictures for real and reports fixed dimensions for
/// videos (no ffprobe on test machines).
pub struct TestProber;

#[async_trait]
impl MediaProber for TestProber {
    async fn probe(&self, path: &Path, kind: FormatSupport) -> Result<MediaInfo, AppError> {
        match kind {
            FormatSupport::Picture => {
                let data = tokio::fs::read(path).await?;
                let (width, height, format) = picture_dimensions(&data)
                    .map_err(|_| AppError::UnrecognizedMedia(path.display().to_string()))?;
                Ok(MediaInfo {
                    width,
                    height,
                    format,
                })
            }
            FormatSupport::Video => Ok(MediaInfo {
                width: 640,
                height: 480,
                format: "h264".to_string(),
            }),
        }
    }
}

/// Transcoder that fabricates deterministic outputs instead of running
/// ffmpeg: a gradient JPEG frame and an MP4 of [`MOCK_MP4_LEN`] bytes.
pub struct MockTranscoder;

#[async_trait]
impl VideoTranscoder for MockTranscoder {
    async fn extract_frame(
        &self,
        _video_path: &Path,
        output_path: &Path,
        _timestamp_seconds: f64,
    ) -> Result<(), AppError> {
        tokio::fs::write(output_path, sample_jpeg(800, 600)).await?;
        Ok(())
    }

    async fn transcode_to_mp4(
        &self,
        _video_path: &Path,
        output_path: &Path,
    ) -> Result<(), AppError> {
        tokio::fs::write(output_path, vec![0x4d; MOCK_MP4_LEN]).await?;
        Ok(())
    }
}
