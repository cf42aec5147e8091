//! Environment configuration.
//!
//! Settings are read from `PIXVAULT_`-prefixed environment variables (with a
//! `.env` file loaded first when present).

use serde::Deserialize;

use crate::error::AppError;

fn default_blob_root() -> String {
    "/var/lib/pixvault/blobs".to_string()
}

fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_worker_prefetch() -> usize {
    10
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_max_redeliveries() -> u32 {
    5
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_blob_root")]
    pub blob_root: String,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
    /// Maximum number of queue deliveries handled concurrently.
    #[serde(default = "default_worker_prefetch")]
    pub worker_prefetch: usize,
    /// Capacity of the in-process job channel.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Deliveries of a single message before it is abandoned as a dead letter.
    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        envy::prefixed("PIXVAULT_")
            .from_env()
            .map_err(|e| AppError::Validation(format!("Invalid configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config: Config =
            envy::prefixed("PIXVAULT_TEST_NONE_").from_iter(vec![(
                "PIXVAULT_TEST_NONE_DATABASE_URL".to_string(),
                "postgres://localhost/pixvault".to_string(),
            )])
            .unwrap();
        assert_eq!(config.worker_prefetch, 10);
        assert_eq!(config.max_redeliveries, 5);
        assert_eq!(config.ffprobe_path, "ffprobe");
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let result: Result<Config, _> =
            envy::prefixed("PIXVAULT_TEST_EMPTY_").from_iter(Vec::<(String, String)>::new());
        assert!(result.is_err());
    }
}
