//! Shared harness for pipeline integration tests: in-memory stores and
//! queue, the real thumbnail pipeline, and a mock transcoder.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use pixvault_core::models::{Folder, Library, LibraryAdd, MediaFile};
use pixvault_services::test_helpers::{
    sample_jpeg, InMemoryMetadataStore, MockTranscoder, TestProber,
};
use pixvault_services::{IngestionCoordinator, JobProcessor};
use pixvault_storage::MemoryBlobStore;
use pixvault_worker::{InMemoryJobQueue, WorkerPool, WorkerPoolConfig};

pub struct Harness {
    pub store: Arc<InMemoryMetadataStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub queue: Arc<InMemoryJobQueue>,
    pub coordinator: IngestionCoordinator,
    pub pool: WorkerPool,
    pub library: Library,
    pub root: Folder,
    scratch: tempfile::TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(InMemoryMetadataStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let queue = Arc::new(InMemoryJobQueue::new(256, 5));

        let coordinator = IngestionCoordinator::new(
            store.clone(),
            blobs.clone(),
            Arc::new(TestProber),
            queue.clone(),
        );

        let processor = Arc::new(JobProcessor::new(
            store.clone(),
            blobs.clone(),
            queue.clone(),
            Arc::new(MockTranscoder),
        ));

        let pool = WorkerPool::start(queue.clone(), processor, WorkerPoolConfig { prefetch: 4 });

        let library = coordinator
            .create_library(LibraryAdd {
                name: "Test Library".to_string(),
                description: None,
                time_zone: chrono_tz::UTC,
            })
            .await
            .expect("library creation");

        let root = coordinator
            .get_root_folder(library.id)
            .await
            .expect("root folder lookup")
            .expect("root folder exists");

        Self {
            store,
            blobs,
            queue,
            coordinator,
            pool,
            library,
            root,
            scratch: tempfile::tempdir().expect("scratch dir"),
        }
    }

    /// Write bytes to a local scratch file, as if received from an upload.
    pub async fn write_local(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.scratch.path().join(name);
        tokio::fs::write(&path, data).await.expect("scratch write");
        path
    }

    pub async fn import_picture(&self, folder_id: Uuid, name: &str, data: Vec<u8>) -> MediaFile {
        let path = self.write_local(name, &data).await;
        self.coordinator
            .import_file(
                self.library.id,
                folder_id,
                &path,
                name,
                "image/jpeg",
                data.len() as i64,
            )
            .await
            .expect("picture import")
    }

    pub async fn import_video(&self, folder_id: Uuid, name: &str, data: Vec<u8>) -> MediaFile {
        let path = self.write_local(name, &data).await;
        self.coordinator
            .import_file(
                self.library.id,
                folder_id,
                &path,
                name,
                "video/quicktime",
                data.len() as i64,
            )
            .await
            .expect("video import")
    }

    /// Wait until every triggered job has been processed.
    pub async fn settle(&self) {
        assert!(
            self.queue.settled(Duration::from_secs(10)).await,
            "queue did not settle"
        );
    }

    pub async fn reload_file(&self, file_id: Uuid) -> MediaFile {
        self.coordinator
            .get_file(self.library.id, file_id)
            .await
            .expect("file lookup")
            .expect("file exists")
    }

    pub async fn reload_folder(&self, folder_id: Uuid) -> Folder {
        self.coordinator
            .get_folder(self.library.id, folder_id)
            .await
            .expect("folder lookup")
            .expect("folder exists")
    }
}

/// A JPEG carrying EXIF camera and timestamp fields, built the way a camera
/// would write it: a TIFF-structured EXIF block in an APP1 segment.
pub fn jpeg_with_exif(width: u32, height: u32) -> Vec<u8> {
    use exif::experimental::Writer;
    use exif::{Field, In, Tag, Value};
    use img_parts::{jpeg::Jpeg, ImageEXIF};

    let make = Field {
        tag: Tag::Make,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"Canon".to_vec()]),
    };
    let model = Field {
        tag: Tag::Model,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"EOS R5".to_vec()]),
    };
    let taken = Field {
        tag: Tag::DateTimeOriginal,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"2024:06:15 10:30:00".to_vec()]),
    };

    let mut writer = Writer::new();
    writer.push_field(&make);
    writer.push_field(&model);
    writer.push_field(&taken);

    let mut exif_block = std::io::Cursor::new(Vec::new());
    writer.write(&mut exif_block, false).expect("exif encode");

    let mut jpeg = Jpeg::from_bytes(sample_jpeg(width, height).into()).expect("jpeg parse");
    jpeg.set_exif(Some(exif_block.into_inner().into()));
    jpeg.encoder().bytes().to_vec()
}
