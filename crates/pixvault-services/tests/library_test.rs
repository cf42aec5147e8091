//! Library and folder lifecycle.

mod support;

use pixvault_core::AppError;
use pixvault_services::test_helpers::sample_jpeg;
use support::Harness;

#[tokio::test]
async fn creating_a_library_creates_its_root_folder() {
    let h = Harness::new().await;

    assert!(h.root.is_root());
    assert_eq!(h.root.path, "");
    assert_eq!(h.root.library_id, h.library.id);
    assert!(h.blobs.has_prefix(&h.library.id.to_string()));
}

#[tokio::test]
async fn deleting_a_library_removes_rows_and_blobs() {
    let h = Harness::new().await;

    h.import_picture(h.root.id, "photo.jpg", sample_jpeg(50, 50))
        .await;
    h.settle().await;
    assert!(!h.blobs.is_empty());

    h.coordinator.delete_library(h.library.id).await.unwrap();

    assert!(h.blobs.is_empty());
    assert!(h
        .coordinator
        .get_library(h.library.id)
        .await
        .unwrap()
        .is_none());

    let result = h.coordinator.delete_library(h.library.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn duplicate_sibling_folder_names_are_rejected() {
    let h = Harness::new().await;

    h.coordinator
        .create_folder(h.library.id, h.root.id, "2024")
        .await
        .unwrap();

    let result = h
        .coordinator
        .create_folder(h.library.id, h.root.id, "2024")
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn the_root_folder_is_not_deletable() {
    let h = Harness::new().await;

    let result = h.coordinator.delete_folder(h.library.id, h.root.id).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn non_empty_folders_are_not_deletable() {
    let h = Harness::new().await;

    let child = h
        .coordinator
        .create_folder(h.library.id, h.root.id, "full")
        .await
        .unwrap();
    h.import_picture(child.id, "keep.jpg", sample_jpeg(40, 40))
        .await;
    h.settle().await;

    let result = h.coordinator.delete_folder(h.library.id, child.id).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    // Still listed under the root.
    let children = h
        .coordinator
        .list_folders(h.library.id, h.root.id)
        .await
        .unwrap();
    assert_eq!(children.len(), 1);
}

#[tokio::test]
async fn folder_paths_chain_ancestor_ids() {
    let h = Harness::new().await;

    let child = h
        .coordinator
        .create_folder(h.library.id, h.root.id, "child")
        .await
        .unwrap();
    let grandchild = h
        .coordinator
        .create_folder(h.library.id, child.id, "grandchild")
        .await
        .unwrap();

    assert_eq!(child.path, child.id.to_string());
    assert_eq!(
        grandchild.path,
        format!("{}/{}", child.id, grandchild.id)
    );
}
