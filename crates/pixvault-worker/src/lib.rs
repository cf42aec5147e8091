//! Job queue and worker pool for Pixvault.
//!
//! The queue is an at-least-once ack/reject channel: a delivery that is
//! rejected (or whose consumer dies before acknowledging) is delivered again.
//! The worker pool bounds concurrent handling with a prefetch limit so a
//! backlog cannot overwhelm local resources (temp disk, codec processes).

pub mod pool;
pub mod queue;

pub use pool::{JobHandler, WorkerPool, WorkerPoolConfig};
pub use queue::{Delivery, InMemoryJobQueue, JobConsumer, JobQueue, QueueError};
