//! Pixvault core services.
//!
//! The asynchronous processing and consistency subsystem:
//!
//! - [`IngestionCoordinator`] imports media with store-then-record
//!   compensation across the blob store and the metadata store;
//! - [`JobProcessor`] consumes queue messages (thumbnails, video conversion,
//!   folder recalculation) with ack/reject discipline;
//! - [`FolderStatsEngine`] maintains the tree-additive folder statistics,
//!   one folder per queue message, propagating upward.
//!
//! All three take their store and queue handles as constructor parameters so
//! tests can substitute the in-memory fakes from [`test_helpers`].

pub mod ingest;
pub mod processor;
pub mod stats;
pub mod test_helpers;

pub use ingest::IngestionCoordinator;
pub use processor::JobProcessor;
pub use stats::FolderStatsEngine;
