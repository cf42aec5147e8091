use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::thumbnails::ThumbnailSize;

use super::file::MediaFile;

/// Aggregate statistics stored on every folder row.
///
/// Invariant: a folder's stats equal the sum of its direct files'
/// contributions plus the sum of its direct children's stats. The statistics
/// engine maintains this bottom-up, one folder per queue message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FolderStats {
    pub file_count: i64,
    /// Original bytes only; thumbnails and conversions have their own columns.
    pub total_bytes: i64,
    pub thumb_sm_bytes: i64,
    pub thumb_md_bytes: i64,
    pub thumb_lg_bytes: i64,
    pub converted_bytes: i64,
}

impl FolderStats {
    /// Fold one direct file into this aggregate.
    pub fn add_file(&mut self, file: &MediaFile) {
        self.file_count += 1;
        self.total_bytes += file.original_bytes;
        self.thumb_sm_bytes += file.thumb_sm_bytes;
        self.thumb_md_bytes += file.thumb_md_bytes;
        self.thumb_lg_bytes += file.thumb_lg_bytes;
        self.converted_bytes += file.converted_bytes;
    }

    /// Fold a direct child folder's stored aggregate into this one.
    pub fn add_child(&mut self, child: &FolderStats) {
        self.file_count += child.file_count;
        self.total_bytes += child.total_bytes;
        self.thumb_sm_bytes += child.thumb_sm_bytes;
        self.thumb_md_bytes += child.thumb_md_bytes;
        self.thumb_lg_bytes += child.thumb_lg_bytes;
        self.converted_bytes += child.converted_bytes;
    }

    pub fn thumbnail_bytes(&self, size: ThumbnailSize) -> i64 {
        match size {
            ThumbnailSize::Sm => self.thumb_sm_bytes,
            ThumbnailSize::Md => self.thumb_md_bytes,
            ThumbnailSize::Lg => self.thumb_lg_bytes,
        }
    }
}

/// Node in a library's folder tree.
///
/// `path` is the slash-joined chain of ancestor folder IDs (the folder's own
/// ID last). The root folder has `parent_id = None` and an empty path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Folder {
    pub id: Uuid,
    pub library_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub path: String,
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub stats: FolderStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// The root folder is created with its library and is never deletable.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Blob path (relative to the library) for an item directly in this folder.
    pub fn item_path(&self, item: &str) -> String {
        if self.path.is_empty() {
            item.to_string()
        } else {
            format!("{}/{}", self.path, item)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder_with_path(path: &str) -> Folder {
        Folder {
            id: Uuid::new_v4(),
            library_id: Uuid::new_v4(),
            parent_id: Some(Uuid::new_v4()),
            name: "vacation".to_string(),
            path: path.to_string(),
            stats: FolderStats::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn item_path_at_root_omits_the_separator() {
        let root = Folder {
            parent_id: None,
            ..folder_with_path("")
        };
        assert_eq!(root.item_path("abc"), "abc");
        assert!(root.is_root());
    }

    #[test]
    fn item_path_nests_under_the_folder_path() {
        let folder = folder_with_path("p1/p2");
        assert_eq!(folder.item_path("abc"), "p1/p2/abc");
        assert!(!folder.is_root());
    }

    #[test]
    fn stats_fold_files_and_children() {
        let mut file = MediaFile::test_fixture();
        file.original_bytes = 100;
        file.thumb_sm_bytes = 1;
        file.thumb_md_bytes = 2;
        file.thumb_lg_bytes = 3;
        file.converted_bytes = 50;

        let child = FolderStats {
            file_count: 2,
            total_bytes: 400,
            thumb_sm_bytes: 4,
            thumb_md_bytes: 5,
            thumb_lg_bytes: 6,
            converted_bytes: 0,
        };

        let mut stats = FolderStats::default();
        stats.add_file(&file);
        stats.add_child(&child);

        assert_eq!(stats.file_count, 3);
        assert_eq!(stats.total_bytes, 500);
        assert_eq!(stats.thumbnail_bytes(ThumbnailSize::Sm), 5);
        assert_eq!(stats.thumbnail_bytes(ThumbnailSize::Md), 7);
        assert_eq!(stats.thumbnail_bytes(ThumbnailSize::Lg), 9);
        assert_eq!(stats.converted_bytes, 50);
    }
}
