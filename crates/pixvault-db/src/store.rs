//! Metadata store abstraction trait.

use async_trait::async_trait;
use pixvault_core::models::{
    CapturedMetadata, FileAdd, FileUpdate, Folder, FolderStats, Library, LibraryAdd, MediaFile,
};
use pixvault_core::{AppError, ThumbnailSize};
use uuid::Uuid;

/// Transactional metadata storage.
///
/// Each method is an atomic operation on one entity (or, for creation, one
/// entity plus its mandatory companions). Per-entity atomicity is the only
/// mutual exclusion the rest of the system relies on: concurrent writers to
/// the same row are serialized here, not by the callers.
///
/// Entity IDs are supplied by the caller, because blob-store prefixes and
/// keys derived from those IDs are written *before* the row exists
/// (store-then-record with compensation).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // Libraries

    /// Insert a library together with its root folder row.
    async fn add_library(
        &self,
        library_id: Uuid,
        root_folder_id: Uuid,
        add: LibraryAdd,
    ) -> Result<Library, AppError>;

    async fn get_library(&self, library_id: Uuid) -> Result<Option<Library>, AppError>;

    async fn list_libraries(&self) -> Result<Vec<Library>, AppError>;

    /// Delete the library and everything in it. Returns false when the
    /// library does not exist.
    async fn delete_library(&self, library_id: Uuid) -> Result<bool, AppError>;

    // Folders

    /// Insert a folder. `path` is the slash-joined ancestor-ID path including
    /// the folder's own ID.
    async fn add_folder(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
        parent_id: Uuid,
        name: &str,
        path: &str,
    ) -> Result<Folder, AppError>;

    async fn get_folder(&self, library_id: Uuid, folder_id: Uuid)
        -> Result<Option<Folder>, AppError>;

    async fn get_root_folder(&self, library_id: Uuid) -> Result<Option<Folder>, AppError>;

    async fn list_child_folders(
        &self,
        library_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Folder>, AppError>;

    /// Replace a folder's aggregate stats in one atomic write and return the
    /// updated row (the caller needs `parent_id` to continue propagation).
    async fn update_folder_stats(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
        stats: FolderStats,
    ) -> Result<Folder, AppError>;

    /// Delete an empty, non-root folder. Returns false when it does not exist.
    async fn delete_folder(&self, library_id: Uuid, folder_id: Uuid) -> Result<bool, AppError>;

    // Files

    /// Insert a file row with `is_processing = true`.
    async fn add_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        add: FileAdd,
    ) -> Result<MediaFile, AppError>;

    async fn get_file(&self, library_id: Uuid, file_id: Uuid)
        -> Result<Option<MediaFile>, AppError>;

    async fn list_files(&self, library_id: Uuid, folder_id: Uuid)
        -> Result<Vec<MediaFile>, AppError>;

    /// Apply user-editable fields. `None` fields are left unchanged.
    async fn update_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        update: FileUpdate,
    ) -> Result<MediaFile, AppError>;

    /// Write metadata extracted from the media itself (EXIF).
    async fn apply_captured_metadata(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        meta: &CapturedMetadata,
    ) -> Result<(), AppError>;

    async fn update_file_thumbnail(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        size: ThumbnailSize,
        bytes: i64,
    ) -> Result<(), AppError>;

    async fn update_file_converted(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        bytes: i64,
    ) -> Result<(), AppError>;

    async fn set_file_processing(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        processing: bool,
    ) -> Result<(), AppError>;

    /// Delete a file row. Returns false when it does not exist.
    async fn delete_file(&self, library_id: Uuid, file_id: Uuid) -> Result<bool, AppError>;
}
