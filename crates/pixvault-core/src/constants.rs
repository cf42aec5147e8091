//! Shared constants.

/// Timestamp (seconds into the video) of the frame used for video thumbnails.
pub const FRAME_EXTRACT_SECONDS: f64 = 2.0;

/// Mime type served for generated thumbnails.
pub const THUMBNAIL_MIME_TYPE: &str = "image/jpeg";

/// Mime type served for converted videos.
pub const CONVERTED_VIDEO_MIME_TYPE: &str = "video/mp4";
