//! Video transcoding and frame extraction.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use pixvault_core::AppError;

/// Fallible video operations used by the job pipeline.
#[async_trait]
pub trait VideoTranscoder: Send + Sync {
    /// Write a single JPEG frame taken `timestamp_seconds` into the video.
    async fn extract_frame(
        &self,
        video_path: &Path,
        output_path: &Path,
        timestamp_seconds: f64,
    ) -> Result<(), AppError>;

    /// Transcode the whole video to MP4 (H.264/AAC).
    async fn transcode_to_mp4(
        &self,
        video_path: &Path,
        output_path: &Path,
    ) -> Result<(), AppError>;
}

/// Production transcoder shelling out to the `ffmpeg` binary.
pub struct FfmpegService {
    ffmpeg_path: String,
}

impl FfmpegService {
    pub fn new(ffmpeg_path: String) -> Self {
        Self { ffmpeg_path }
    }

    async fn run(&self, args: &[&str]) -> Result<(), AppError> {
        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to execute ffmpeg: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::MediaConversion(format!(
                "ffmpeg failed: {}",
                last_lines(&stderr, 5)
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl VideoTranscoder for FfmpegService {
    #[tracing::instrument(skip(self), fields(video.path = %video_path.display()))]
    async fn extract_frame(
        &self,
        video_path: &Path,
        output_path: &Path,
        timestamp_seconds: f64,
    ) -> Result<(), AppError> {
        let timestamp = format!("{:.3}", timestamp_seconds);
        let input = video_path.to_string_lossy().to_string();
        let output = output_path.to_string_lossy().to_string();

        self.run(&[
            "-ss", &timestamp, "-i", &input, "-frames:v", "1", "-q:v", "2", "-y", &output,
        ])
        .await
    }

    #[tracing::instrument(skip(self), fields(video.path = %video_path.display()))]
    async fn transcode_to_mp4(
        &self,
        video_path: &Path,
        output_path: &Path,
    ) -> Result<(), AppError> {
        let input = video_path.to_string_lossy().to_string();
        let output = output_path.to_string_lossy().to_string();

        self.run(&[
            "-i",
            &input,
            "-c:v",
            "libx264",
            "-preset",
            "fast",
            "-c:a",
            "aac",
            "-b:a",
            "128k",
            "-movflags",
            "+faststart",
            "-y",
            &output,
        ])
        .await
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_lines_keeps_the_tail() {
        let text = "one\ntwo\nthree\nfour";
        assert_eq!(last_lines(text, 2), "three\nfour");
        assert_eq!(last_lines(text, 10), text);
    }

    #[tokio::test]
    async fn missing_binary_reports_an_internal_error() {
        let service = FfmpegService::new("/nonexistent/ffmpeg".to_string());
        let result = service
            .transcode_to_mp4(Path::new("in.mov"), Path::new("out.mp4"))
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
