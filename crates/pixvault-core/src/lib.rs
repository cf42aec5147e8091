//! Pixvault core library
//!
//! Domain models, error types, job-message definitions, supported-format
//! tables, and configuration shared across all Pixvault components.

pub mod config;
pub mod constants;
pub mod error;
pub mod file_types;
pub mod messages;
pub mod models;
pub mod thumbnails;

pub use config::Config;
pub use error::AppError;
pub use file_types::FormatSupport;
pub use messages::JobMessage;
pub use thumbnails::ThumbnailSize;
