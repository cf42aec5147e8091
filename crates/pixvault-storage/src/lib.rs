//! Blob storage for Pixvault.
//!
//! A key-addressed byte store with no atomicity across keys. Consistency with
//! the metadata store is the caller's responsibility (store-then-record with
//! compensation on the record side).
//!
//! Keys are library-scoped hierarchical paths; see [`keys`].

pub mod keys;
pub mod local;
pub mod memory;
pub mod traits;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use traits::{BlobResult, BlobStore, BlobStoreError, ByteStream};
