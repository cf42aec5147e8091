use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::file_types;
use crate::thumbnails::ThumbnailSize;

/// A picture or video stored in a library folder.
///
/// Created with `is_processing = true`; the flag clears only once every
/// asynchronous artifact (three thumbnails, plus the MP4 conversion for
/// non-MP4 videos) has been produced. `path` caches the blob path of the
/// original, relative to the library prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct MediaFile {
    pub id: Uuid,
    pub library_id: Uuid,
    pub folder_id: Uuid,
    /// Unique within the folder, case-insensitively.
    pub name: String,
    pub mime_type: String,
    pub is_video: bool,
    pub width: i32,
    pub height: i32,
    pub original_bytes: i64,
    /// 0 until a video conversion completes.
    pub converted_bytes: i64,
    /// 0 until the corresponding thumbnail is generated.
    pub thumb_sm_bytes: i64,
    pub thumb_md_bytes: i64,
    pub thumb_lg_bytes: i64,
    pub is_processing: bool,
    pub path: String,

    // Extracted metadata, populated during async processing.
    pub title: Option<String>,
    pub comments: Option<String>,
    pub tags: Vec<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_altitude: Option<f64>,
    pub captured_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaFile {
    pub fn thumbnail_bytes(&self, size: ThumbnailSize) -> i64 {
        match size {
            ThumbnailSize::Sm => self.thumb_sm_bytes,
            ThumbnailSize::Md => self.thumb_md_bytes,
            ThumbnailSize::Lg => self.thumb_lg_bytes,
        }
    }

    /// True for videos whose original is not MP4.
    pub fn needs_mp4_conversion(&self) -> bool {
        self.is_video && file_types::needs_mp4_conversion(&self.name)
    }
}

/// Row-creation data for a newly imported file.
#[derive(Debug, Clone)]
pub struct FileAdd {
    pub folder_id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub is_video: bool,
    pub width: i32,
    pub height: i32,
    pub original_bytes: i64,
    pub path: String,
}

/// User-editable fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub comments: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Metadata recovered from the media itself (EXIF) during processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedMetadata {
    pub title: Option<String>,
    pub comments: Option<String>,
    pub tags: Vec<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_altitude: Option<f64>,
    pub captured_at: Option<DateTime<Utc>>,
}

impl CapturedMetadata {
    /// True when at least one field was recovered.
    pub fn has_any(&self) -> bool {
        self.title.is_some()
            || self.comments.is_some()
            || !self.tags.is_empty()
            || self.camera_make.is_some()
            || self.camera_model.is_some()
            || self.gps_latitude.is_some()
            || self.gps_longitude.is_some()
            || self.gps_altitude.is_some()
            || self.captured_at.is_some()
    }
}

#[cfg(test)]
impl MediaFile {
    /// Blank fixture for unit tests; override fields as needed.
    pub fn test_fixture() -> Self {
        let id = Uuid::new_v4();
        MediaFile {
            id,
            library_id: Uuid::new_v4(),
            folder_id: Uuid::new_v4(),
            name: "photo.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            is_video: false,
            width: 0,
            height: 0,
            original_bytes: 0,
            converted_bytes: 0,
            thumb_sm_bytes: 0,
            thumb_md_bytes: 0,
            thumb_lg_bytes: 0,
            is_processing: true,
            path: id.to_string(),
            title: None,
            comments: None,
            tags: Vec::new(),
            camera_make: None,
            camera_model: None,
            gps_latitude: None,
            gps_longitude: None,
            gps_altitude: None,
            captured_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_needed_only_for_non_mp4_videos() {
        let mut file = MediaFile::test_fixture();
        file.is_video = true;
        file.name = "clip.mov".to_string();
        assert!(file.needs_mp4_conversion());

        file.name = "clip.mp4".to_string();
        assert!(!file.needs_mp4_conversion());

        file.is_video = false;
        file.name = "photo.jpg".to_string();
        assert!(!file.needs_mp4_conversion());
    }

    #[test]
    fn captured_metadata_has_any() {
        assert!(!CapturedMetadata::default().has_any());
        let meta = CapturedMetadata {
            camera_make: Some("Canon".to_string()),
            ..Default::default()
        };
        assert!(meta.has_any());
    }
}
