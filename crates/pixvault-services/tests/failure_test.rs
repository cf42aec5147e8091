//! Failure handling: compensation, redelivery, and the accepted
//! inconsistency windows.

mod support;

use pixvault_core::{AppError, JobMessage};
use pixvault_db::MetadataStore;
use pixvault_services::test_helpers::sample_jpeg;
use pixvault_worker::JobQueue;
use support::Harness;
use uuid::Uuid;

#[tokio::test]
async fn failed_file_insert_compensates_the_blob_write() {
    let h = Harness::new().await;
    let path = h.write_local("photo.jpg", &sample_jpeg(80, 80)).await;

    h.store.fail_next_add_file();

    let result = h
        .coordinator
        .import_file(h.library.id, h.root.id, &path, "photo.jpg", "image/jpeg", 100)
        .await;

    // The caller sees the original store error, not a compensation error.
    assert!(matches!(result, Err(AppError::Internal(_))));
    // The just-written blob was deleted again.
    assert!(h.blobs.is_empty(), "remaining: {:?}", h.blobs.keys());
    assert!(h.queue.is_idle());
}

#[tokio::test]
async fn failed_library_insert_compensates_the_prefix() {
    let h = Harness::new().await;

    h.store.fail_next_add_library();

    let result = h
        .coordinator
        .create_library(pixvault_core::models::LibraryAdd {
            name: "Doomed".to_string(),
            description: None,
            time_zone: chrono_tz::UTC,
        })
        .await;

    assert!(matches!(result, Err(AppError::Internal(_))));
    // Only the harness library's prefix remains.
    assert!(h.blobs.has_prefix(&h.library.id.to_string()));
    assert_eq!(
        h.store.list_libraries().await.unwrap().len(),
        1,
        "only the harness library exists"
    );
}

#[tokio::test]
async fn rejected_processing_is_redelivered_and_stays_single_counted() {
    let h = Harness::new().await;
    let data = sample_jpeg(120, 120);
    let original_len = data.len() as i64;

    // First delivery fails mid-thumbnails, gets rejected, and is
    // redelivered; the re-run overwrites the same keys.
    h.store.fail_next_thumbnail_update();

    let file = h.import_picture(h.root.id, "flaky.jpg", data).await;
    h.settle().await;

    assert_eq!(h.queue.dead_letters(), 0);

    let file = h.reload_file(file.id).await;
    assert!(!file.is_processing);
    assert!(file.thumb_sm_bytes > 0);

    let root = h.reload_folder(h.root.id).await;
    assert_eq!(root.stats.file_count, 1, "stats are not double-counted");
    assert_eq!(root.stats.total_bytes, original_len);
    assert_eq!(root.stats.thumb_sm_bytes, file.thumb_sm_bytes);

    assert_eq!(h.blobs.len(), 4);
}

#[tokio::test]
async fn enqueue_failure_leaves_a_valid_row_in_the_processing_state() {
    let h = Harness::new().await;
    let path = h.write_local("stuck.jpg", &sample_jpeg(90, 90)).await;

    h.queue.fail_next_publish();

    let result = h
        .coordinator
        .import_file(h.library.id, h.root.id, &path, "stuck.jpg", "image/jpeg", 50)
        .await;

    assert!(matches!(result, Err(AppError::Queue(_))));

    // The insert is not rolled back: the row and the original blob stay,
    // waiting for an external reconciliation sweep.
    let files = h
        .coordinator
        .list_files(h.library.id, h.root.id)
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].is_processing);
    assert_eq!(h.blobs.len(), 1);
}

#[tokio::test]
async fn unprocessable_recalculation_is_dead_lettered_not_stuck() {
    let h = Harness::new().await;

    h.queue
        .publish(&JobMessage::RecalculateFolder {
            library_id: h.library.id,
            folder_id: Uuid::new_v4(),
        })
        .await
        .unwrap();

    h.settle().await;

    assert_eq!(h.queue.dead_letters(), 1);
}
