//! In-memory fakes for testing the pipeline without a database, an object
//! store, or the ffmpeg binaries.

pub mod media;
pub mod memory_store;

pub use media::{sample_jpeg, MockTranscoder, TestProber, MOCK_MP4_LEN};
pub use memory_store::InMemoryMetadataStore;
