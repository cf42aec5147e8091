//! Folder statistics engine.

use std::sync::Arc;

use uuid::Uuid;

use pixvault_core::models::{Folder, FolderStats};
use pixvault_core::AppError;
use pixvault_db::MetadataStore;

/// Recomputes one folder's aggregate statistics from current row state.
///
/// Direct files are summed per byte category; direct child folders
/// contribute their already-stored aggregates rather than being re-walked,
/// since children were recalculated bottom-up by their own triggering
/// events. The result is written in a single atomic update, so the engine
/// stays correct under arbitrary interleaving of uploads, deletes, and
/// other recalculations: it never accumulates deltas, only re-reads.
pub struct FolderStatsEngine {
    store: Arc<dyn MetadataStore>,
}

impl FolderStatsEngine {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Recalculate one folder and return the updated row. The caller checks
    /// `parent_id` on the result to continue propagating upward, one level
    /// per queue message.
    #[tracing::instrument(skip(self))]
    pub async fn recalculate(
        &self,
        library_id: Uuid,
        folder_id: Uuid,
    ) -> Result<Folder, AppError> {
        let files = self.store.list_files(library_id, folder_id).await?;
        let children = self.store.list_child_folders(library_id, folder_id).await?;

        let mut stats = FolderStats::default();
        for file in &files {
            stats.add_file(file);
        }
        for child in &children {
            stats.add_child(&child.stats);
        }

        let folder = self
            .store
            .update_folder_stats(library_id, folder_id, stats)
            .await?;

        tracing::debug!(
            file_count = stats.file_count,
            total_bytes = stats.total_bytes,
            converted_bytes = stats.converted_bytes,
            "Folder statistics recalculated"
        );

        Ok(folder)
    }
}
