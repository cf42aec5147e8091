//! Ingestion coordinator.
//!
//! Every mutating operation follows store-then-record: the blob-store side
//! effect happens first, and a failure recording it in the metadata store
//! compensates the blob write before rethrowing. Deletions run the other way
//! around (rows first, blobs best-effort) because the database is the
//! authoritative state.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use pixvault_core::models::{FileAdd, FileUpdate, Folder, Library, LibraryAdd, MediaFile};
use pixvault_core::{constants, file_types, AppError, FormatSupport, JobMessage, ThumbnailSize};
use pixvault_db::MetadataStore;
use pixvault_processing::MediaProber;
use pixvault_storage::{keys, BlobStore, ByteStream};
use pixvault_worker::JobQueue;

/// Orchestrates imports and other library mutations across the metadata
/// store, the blob store, and the jobs queue.
pub struct IngestionCoordinator {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    prober: Arc<dyn MediaProber>,
    queue: Arc<dyn JobQueue>,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        prober: Arc<dyn MediaProber>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            store,
            blobs,
            prober,
            queue,
        }
    }

    /// Import a local file into a library folder.
    ///
    /// The returned row has `is_processing = true`; thumbnails, extracted
    /// metadata, and (for non-MP4 videos) the converted rendition arrive
    /// asynchronously.
    #[tracing::instrument(skip(self, local_path))]
    pub async fn import_file(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
        local_path: &Path,
        filename: &str,
        mime_type: &str,
        size_bytes: i64,
    ) -> Result<MediaFile, AppError> {
        // Unsupported extensions fail before any side effect.
        let ext = file_types::file_extension(filename)
            .ok_or_else(|| AppError::Validation(format!("Missing file extension: {}", filename)))?;
        let support = file_types::support_for_extension(&ext)
            .ok_or_else(|| AppError::Validation(format!("Invalid file type: {}", ext)))?;

        let info = self.prober.probe(local_path, support).await?;

        let folder = self
            .store
            .get_folder(library_id, folder_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("folder {}", folder_id)))?;

        let siblings = self.store.list_files(library_id, folder_id).await?;
        let sibling_names: Vec<&str> = siblings.iter().map(|f| f.name.as_str()).collect();
        let name = disambiguate_name(&sibling_names, filename);

        let file_id = Uuid::new_v4();
        let key = keys::original_key(library_id, &folder.path, file_id);

        let data = tokio::fs::read(local_path).await?;
        self.blobs.put(&key, data).await?;

        let add = FileAdd {
            folder_id,
            name,
            mime_type: mime_type.to_string(),
            is_video: support == FormatSupport::Video,
            width: info.width as i32,
            height: info.height as i32,
            original_bytes: size_bytes,
            path: folder.item_path(&file_id.to_string()),
        };

        let file = match self.store.add_file(library_id, file_id, add).await {
            Ok(file) => file,
            Err(err) => {
                // The blob landed but the row did not; undo the blob so
                // nothing orphaned remains, then surface the original error.
                tracing::error!(
                    file_id = %file_id,
                    error = %err,
                    "File row insert failed after blob write, removing blob"
                );
                if let Err(cleanup) = self.blobs.delete(&key).await {
                    let inconsistency = AppError::StoreInconsistency(format!(
                        "orphaned blob {} after failed insert: {}",
                        key, cleanup
                    ));
                    tracing::error!(error = %inconsistency, "Compensation failed");
                }
                return Err(err);
            }
        };

        let message = if file.is_video {
            JobMessage::ProcessVideo {
                library_id,
                file_id,
                convert_to_mp4: file_types::needs_mp4_conversion(&file.name),
            }
        } else {
            JobMessage::ProcessPicture {
                library_id,
                file_id,
            }
        };

        if let Err(err) = self.queue.publish(&message).await {
            // The row is valid and stays; it just never leaves the
            // processing state until an external sweep retries the enqueue.
            tracing::error!(
                file_id = %file_id,
                error = %err,
                "Job enqueue failed; file remains marked as processing"
            );
            return Err(err.into());
        }

        tracing::info!(file_id = %file_id, name = %file.name, "File imported");
        Ok(file)
    }

    /// Create a library and its root folder.
    pub async fn create_library(&self, add: LibraryAdd) -> Result<Library, AppError> {
        let library_id = Uuid::new_v4();
        let root_folder_id = Uuid::new_v4();
        let prefix = keys::library_prefix(library_id);

        self.blobs.create_prefix(&prefix).await?;

        match self
            .store
            .add_library(library_id, root_folder_id, add)
            .await
        {
            Ok(library) => {
                tracing::info!(library_id = %library_id, name = %library.name, "Library created");
                Ok(library)
            }
            Err(err) => {
                tracing::error!(
                    library_id = %library_id,
                    error = %err,
                    "Library row insert failed, removing blob prefix"
                );
                if let Err(cleanup) = self.blobs.delete_prefix(&prefix).await {
                    let inconsistency = AppError::StoreInconsistency(format!(
                        "orphaned prefix {} after failed insert: {}",
                        prefix, cleanup
                    ));
                    tracing::error!(error = %inconsistency, "Compensation failed");
                }
                Err(err)
            }
        }
    }

    /// Delete a library with everything in it. Rows go first; the blob
    /// prefix removal is best effort and only logged on failure.
    pub async fn delete_library(&self, library_id: Uuid) -> Result<(), AppError> {
        let deleted = self.store.delete_library(library_id).await?;
        if !deleted {
            return Err(AppError::NotFound(format!("library {}", library_id)));
        }

        if let Err(err) = self
            .blobs
            .delete_prefix(&keys::library_prefix(library_id))
            .await
        {
            tracing::error!(
                library_id = %library_id,
                error = %err,
                "Library rows deleted but blob prefix removal failed; prefix may need cleanup"
            );
        }

        Ok(())
    }

    /// Create a folder under `parent_id`.
    pub async fn create_folder(
        &self,
        library_id: Uuid,
        parent_id: Uuid,
        name: &str,
    ) -> Result<Folder, AppError> {
        let parent = self
            .store
            .get_folder(library_id, parent_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("folder {}", parent_id)))?;

        let folder_id = Uuid::new_v4();
        let path = parent.item_path(&folder_id.to_string());
        let prefix = keys::folder_prefix(library_id, &path);

        self.blobs.create_prefix(&prefix).await?;

        match self
            .store
            .add_folder(library_id, folder_id, parent_id, name, &path)
            .await
        {
            Ok(folder) => Ok(folder),
            Err(err) => {
                tracing::error!(
                    folder_id = %folder_id,
                    error = %err,
                    "Folder row insert failed, removing blob prefix"
                );
                if let Err(cleanup) = self.blobs.delete_prefix(&prefix).await {
                    let inconsistency = AppError::StoreInconsistency(format!(
                        "orphaned prefix {} after failed insert: {}",
                        prefix, cleanup
                    ));
                    tracing::error!(error = %inconsistency, "Compensation failed");
                }
                Err(err)
            }
        }
    }

    /// Delete an empty, non-root folder and trigger a parent recalculation.
    pub async fn delete_folder(&self, library_id: Uuid, folder_id: Uuid) -> Result<(), AppError> {
        let folder = self
            .store
            .get_folder(library_id, folder_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("folder {}", folder_id)))?;

        let Some(parent_id) = folder.parent_id else {
            return Err(AppError::Validation(
                "The root folder cannot be deleted".to_string(),
            ));
        };

        self.store.delete_folder(library_id, folder_id).await?;

        if let Err(err) = self
            .blobs
            .delete_prefix(&keys::folder_prefix(library_id, &folder.path))
            .await
        {
            tracing::error!(
                folder_id = %folder_id,
                error = %err,
                "Folder row deleted but blob prefix removal failed; prefix may need cleanup"
            );
        }

        self.queue
            .publish(&JobMessage::RecalculateFolder {
                library_id,
                folder_id: parent_id,
            })
            .await?;

        Ok(())
    }

    /// Apply user edits to a file. A rename must keep the extension and must
    /// not collide with a sibling.
    pub async fn update_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        update: FileUpdate,
    ) -> Result<MediaFile, AppError> {
        if let Some(ref new_name) = update.name {
            let current = self
                .store
                .get_file(library_id, file_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;

            if !file_types::extensions_match(&current.name, new_name) {
                return Err(AppError::Validation(
                    "File extensions must match".to_string(),
                ));
            }

            let siblings = self.store.list_files(library_id, current.folder_id).await?;
            let collision = siblings
                .iter()
                .any(|f| f.id != file_id && f.name.eq_ignore_ascii_case(new_name));
            if collision {
                return Err(AppError::Validation(format!(
                    "A file named '{}' already exists in this folder",
                    new_name
                )));
            }
        }

        self.store.update_file(library_id, file_id, update).await
    }

    /// Delete a file and every derived blob, then trigger a folder
    /// recalculation.
    pub async fn delete_file(&self, library_id: Uuid, file_id: Uuid) -> Result<(), AppError> {
        let file = self
            .store
            .get_file(library_id, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;

        let deleted = self.store.delete_file(library_id, file_id).await?;
        if !deleted {
            return Err(AppError::NotFound(format!("file {}", file_id)));
        }

        let folder_path = keys::parent_path(&file.path);
        let mut blob_keys = vec![keys::original_key(library_id, folder_path, file_id)];
        for size in ThumbnailSize::ALL {
            blob_keys.push(keys::thumbnail_key(library_id, folder_path, file_id, size));
        }
        blob_keys.push(keys::converted_key(library_id, folder_path, file_id));

        for key in blob_keys {
            if let Err(err) = self.blobs.delete(&key).await {
                tracing::error!(
                    file_id = %file_id,
                    key = %key,
                    error = %err,
                    "File row deleted but blob removal failed; blob may need cleanup"
                );
            }
        }

        self.queue
            .publish(&JobMessage::RecalculateFolder {
                library_id,
                folder_id: file.folder_id,
            })
            .await?;

        Ok(())
    }

    /// Stream a file's contents. Non-MP4 videos are served from their
    /// converted MP4 rendition.
    pub async fn open_original(
        &self,
        library_id: Uuid,
        file_id: Uuid,
    ) -> Result<(ByteStream, String), AppError> {
        let file = self
            .store
            .get_file(library_id, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;

        let folder_path = keys::parent_path(&file.path);
        let (key, mime_type) = if file.needs_mp4_conversion() {
            (
                keys::converted_key(library_id, folder_path, file_id),
                constants::CONVERTED_VIDEO_MIME_TYPE.to_string(),
            )
        } else {
            (
                keys::original_key(library_id, folder_path, file_id),
                file.mime_type.clone(),
            )
        };

        let stream = self.blobs.get_stream(&key).await?;
        Ok((stream, mime_type))
    }

    /// Stream one thumbnail variant of a file.
    pub async fn open_thumbnail(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        size: ThumbnailSize,
    ) -> Result<(ByteStream, String), AppError> {
        let file = self
            .store
            .get_file(library_id, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))?;

        let folder_path = keys::parent_path(&file.path);
        let key = keys::thumbnail_key(library_id, folder_path, file_id, size);
        let stream = self.blobs.get_stream(&key).await?;
        Ok((stream, constants::THUMBNAIL_MIME_TYPE.to_string()))
    }

    // Read-side pass-throughs.

    pub async fn get_library(&self, library_id: Uuid) -> Result<Option<Library>, AppError> {
        self.store.get_library(library_id).await
    }

    pub async fn get_folder(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
    ) -> Result<Option<Folder>, AppError> {
        self.store.get_folder(library_id, folder_id).await
    }

    pub async fn get_root_folder(&self, library_id: Uuid) -> Result<Option<Folder>, AppError> {
        self.store.get_root_folder(library_id).await
    }

    pub async fn list_folders(
        &self,
        library_id: Uuid,
        parent_id: Uuid,
    ) -> Result<Vec<Folder>, AppError> {
        self.store.list_child_folders(library_id, parent_id).await
    }

    pub async fn get_file(
        &self,
        library_id: Uuid,
        file_id: Uuid,
    ) -> Result<Option<MediaFile>, AppError> {
        self.store.get_file(library_id, file_id).await
    }

    pub async fn list_files(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
    ) -> Result<Vec<MediaFile>, AppError> {
        self.store.list_files(library_id, folder_id).await
    }
}

/// Pick a sibling-unique name for `wanted`, comparing case-insensitively and
/// appending `(n)` before the extension, counting from 2.
fn disambiguate_name(existing: &[&str], wanted: &str) -> String {
    let taken: HashSet<String> = existing.iter().map(|n| n.to_ascii_lowercase()).collect();

    if !taken.contains(&wanted.to_ascii_lowercase()) {
        return wanted.to_string();
    }

    let (stem, ext) = match wanted.rfind('.') {
        Some(index) => (&wanted[..index], &wanted[index..]),
        None => (wanted, ""),
    };

    let mut n = 2;
    loop {
        let candidate = format!("{}({}){}", stem, n, ext);
        if !taken.contains(&candidate.to_ascii_lowercase()) {
            return candidate;
        }
        n += 1;
    }
}
