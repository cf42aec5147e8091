//! Job processor.
//!
//! One handler invocation per queue message. A handler that returns `Err`
//! causes the whole message to be rejected and redelivered; no partial work
//! is compensated mid-job. Every write targets a key or column that a re-run
//! simply overwrites, so redelivery is safe.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use uuid::Uuid;

use pixvault_core::models::MediaFile;
use pixvault_core::{constants, AppError, JobMessage, ThumbnailSize};
use pixvault_db::MetadataStore;
use pixvault_processing::exif_data::extract_captured_metadata;
use pixvault_processing::{generate_thumbnail, VideoTranscoder};
use pixvault_storage::{keys, BlobStore};
use pixvault_worker::{JobHandler, JobQueue};

use crate::stats::FolderStatsEngine;

/// Executes queued jobs against the stores.
pub struct JobProcessor {
    store: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn JobQueue>,
    transcoder: Arc<dyn VideoTranscoder>,
    stats: FolderStatsEngine,
}

impl JobProcessor {
    pub fn new(
        store: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        queue: Arc<dyn JobQueue>,
        transcoder: Arc<dyn VideoTranscoder>,
    ) -> Self {
        let stats = FolderStatsEngine::new(store.clone());
        Self {
            store,
            blobs,
            queue,
            transcoder,
            stats,
        }
    }

    async fn load_file(&self, library_id: Uuid, file_id: Uuid) -> Result<MediaFile, AppError> {
        self.store
            .get_file(library_id, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("file {}", file_id)))
    }

    /// Generate the three thumbnail variants of `source` as concurrent
    /// tasks. Each completed artifact is written to the blob store, recorded
    /// on the file row, and counted down on `outstanding` exactly once.
    async fn produce_thumbnails(
        &self,
        library_id: Uuid,
        file: &MediaFile,
        source: Arc<Vec<u8>>,
        outstanding: &Arc<AtomicUsize>,
    ) -> Result<(), AppError> {
        let folder_path = Arc::new(keys::parent_path(&file.path).to_string());
        let file_id = file.id;

        let mut tasks = Vec::with_capacity(ThumbnailSize::ALL.len());
        for size in ThumbnailSize::ALL {
            let blobs = self.blobs.clone();
            let store = self.store.clone();
            let source = source.clone();
            let outstanding = outstanding.clone();
            let folder_path = folder_path.clone();

            tasks.push(tokio::spawn(async move {
                let bytes = generate_thumbnail(&source, size)?;
                let byte_count = bytes.len() as i64;
                let key = keys::thumbnail_key(library_id, &folder_path, file_id, size);
                blobs.put(&key, bytes).await?;
                store
                    .update_file_thumbnail(library_id, file_id, size, byte_count)
                    .await?;
                outstanding.fetch_sub(1, Ordering::SeqCst);
                tracing::debug!(file_id = %file_id, size = %size, bytes = byte_count, "Thumbnail stored");
                Ok::<(), AppError>(())
            }));
        }

        for task in tasks {
            task.await
                .map_err(|e| AppError::Internal(format!("Thumbnail task failed: {}", e)))??;
        }

        Ok(())
    }

    /// Once every expected artifact has reported back, clear the processing
    /// flag and trigger the folder recalculation.
    async fn finish_if_settled(
        &self,
        library_id: Uuid,
        file: &MediaFile,
        outstanding: &AtomicUsize,
    ) -> Result<(), AppError> {
        if outstanding.load(Ordering::SeqCst) != 0 {
            return Ok(());
        }

        self.store
            .set_file_processing(library_id, file.id, false)
            .await?;
        self.queue
            .publish(&JobMessage::RecalculateFolder {
                library_id,
                folder_id: file.folder_id,
            })
            .await?;

        tracing::info!(file_id = %file.id, "File processing complete");
        Ok(())
    }

    async fn process_picture(&self, library_id: Uuid, file_id: Uuid) -> Result<(), AppError> {
        let file = self.load_file(library_id, file_id).await?;
        let folder_path = keys::parent_path(&file.path).to_string();

        let data = self
            .blobs
            .get(&keys::original_key(library_id, &folder_path, file_id))
            .await?;

        if let Some(meta) = extract_captured_metadata(&data) {
            if meta.has_any() {
                self.store
                    .apply_captured_metadata(library_id, file_id, &meta)
                    .await?;
            }
        }

        let outstanding = Arc::new(AtomicUsize::new(ThumbnailSize::ALL.len()));
        self.produce_thumbnails(library_id, &file, Arc::new(data), &outstanding)
            .await?;

        self.finish_if_settled(library_id, &file, &outstanding).await
    }

    async fn process_video(
        &self,
        library_id: Uuid,
        file_id: Uuid,
        convert_to_mp4: bool,
    ) -> Result<(), AppError> {
        let file = self.load_file(library_id, file_id).await?;
        let folder_path = keys::parent_path(&file.path).to_string();

        // All local artifacts live in one scoped directory, removed when
        // this handler returns, success or not.
        let workdir = tempfile::tempdir()?;

        let data = self
            .blobs
            .get(&keys::original_key(library_id, &folder_path, file_id))
            .await?;
        let input_path = workdir.path().join("source");
        tokio::fs::write(&input_path, &data).await?;
        drop(data);

        let frame_path = workdir.path().join("frame.jpg");
        self.transcoder
            .extract_frame(&input_path, &frame_path, constants::FRAME_EXTRACT_SECONDS)
            .await?;
        let frame = tokio::fs::read(&frame_path).await?;

        let expected = ThumbnailSize::ALL.len() + usize::from(convert_to_mp4);
        let outstanding = Arc::new(AtomicUsize::new(expected));

        self.produce_thumbnails(library_id, &file, Arc::new(frame), &outstanding)
            .await?;

        if convert_to_mp4 {
            let mp4_path = workdir.path().join("converted.mp4");
            self.transcoder
                .transcode_to_mp4(&input_path, &mp4_path)
                .await?;

            let mp4 = tokio::fs::read(&mp4_path).await?;
            let byte_count = mp4.len() as i64;
            self.blobs
                .put(&keys::converted_key(library_id, &folder_path, file_id), mp4)
                .await?;
            self.store
                .update_file_converted(library_id, file_id, byte_count)
                .await?;
            outstanding.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(file_id = %file_id, bytes = byte_count, "Converted video stored");
        }

        self.finish_if_settled(library_id, &file, &outstanding).await
    }

    async fn recalculate_folder(&self, library_id: Uuid, folder_id: Uuid) -> Result<(), AppError> {
        let folder = self.stats.recalculate(library_id, folder_id).await?;

        // Propagation is one level per message; a deep tree settles over
        // depth-many queue round trips.
        if let Some(parent_id) = folder.parent_id {
            self.queue
                .publish(&JobMessage::RecalculateFolder {
                    library_id,
                    folder_id: parent_id,
                })
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl JobHandler for JobProcessor {
    #[tracing::instrument(skip(self, message), fields(job.kind = message.kind()))]
    async fn handle(&self, message: &JobMessage) -> anyhow::Result<()> {
        match message {
            JobMessage::ProcessPicture {
                library_id,
                file_id,
            } => self
                .process_picture(*library_id, *file_id)
                .await
                .context("Picture processing failed"),
            JobMessage::ProcessVideo {
                library_id,
                file_id,
                convert_to_mp4,
            } => self
                .process_video(*library_id, *file_id, *convert_to_mp4)
                .await
                .context("Video processing failed"),
            JobMessage::RecalculateFolder {
                library_id,
                folder_id,
            } => self
                .recalculate_folder(*library_id, *folder_id)
                .await
                .context("Folder recalculation failed"),
        }
    }
}
