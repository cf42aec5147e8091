//! Job queue: publish side, consume side, and the in-memory implementation.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use pixvault_core::{AppError, JobMessage};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Queue closed")]
    Closed,
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        AppError::Queue(err.to_string())
    }
}

/// Publish side of the jobs queue. Publish failures surface synchronously and
/// are not retried internally.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn publish(&self, message: &JobMessage) -> Result<(), QueueError>;
}

/// Consume side: yields one delivery at a time. `Ok(None)` means the queue
/// has shut down.
#[async_trait]
pub trait JobConsumer: Send + Sync {
    async fn next_delivery(&self) -> Result<Option<Delivery>, QueueError>;
}

/// Acknowledgment backend of a delivery; implemented per queue backend.
/// `reject` receives the message back so the backend can requeue it.
#[async_trait]
pub trait Acknowledge: Send {
    async fn ack(self: Box<Self>);
    async fn reject(self: Box<Self>, message: JobMessage);
}

/// One in-flight message. Must be settled exactly once: [`Delivery::ack`]
/// after the corresponding store mutations are durably applied, or
/// [`Delivery::reject`] to requeue for redelivery.
pub struct Delivery {
    pub message: JobMessage,
    /// How many times this message was delivered before this delivery.
    pub redeliveries: u32,
    acker: Box<dyn Acknowledge>,
}

impl Delivery {
    /// Assemble a delivery; used by queue backends.
    pub fn new(message: JobMessage, redeliveries: u32, acker: Box<dyn Acknowledge>) -> Self {
        Self {
            message,
            redeliveries,
            acker,
        }
    }

    pub async fn ack(self) {
        self.acker.ack().await;
    }

    pub async fn reject(self) {
        self.acker.reject(self.message).await;
    }
}

struct Envelope {
    message: JobMessage,
    redeliveries: u32,
}

struct QueueInner {
    tx: mpsc::Sender<Envelope>,
    rx: Mutex<mpsc::Receiver<Envelope>>,
    queued: AtomicUsize,
    in_flight: AtomicUsize,
    dead_letters: AtomicUsize,
    max_redeliveries: u32,
    fail_next_publish: AtomicBool,
}

/// In-process jobs queue.
///
/// At-least-once within the process: a rejected delivery goes back on the
/// channel with an incremented redelivery count, and is abandoned (dead
/// lettered, with an error event) once the count exceeds `max_redeliveries`.
/// Unacknowledged deliveries do not survive a process crash; a broker-backed
/// implementation of the same traits would redeliver them.
#[derive(Clone)]
pub struct InMemoryJobQueue {
    inner: Arc<QueueInner>,
}

impl InMemoryJobQueue {
    pub fn new(capacity: usize, max_redeliveries: u32) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(QueueInner {
                tx,
                rx: Mutex::new(rx),
                queued: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                dead_letters: AtomicUsize::new(0),
                max_redeliveries,
                fail_next_publish: AtomicBool::new(false),
            }),
        }
    }

    /// No queued messages and no unsettled deliveries.
    pub fn is_idle(&self) -> bool {
        self.inner.queued.load(Ordering::SeqCst) == 0
            && self.inner.in_flight.load(Ordering::SeqCst) == 0
    }

    /// Messages abandoned after exhausting their redeliveries.
    pub fn dead_letters(&self) -> usize {
        self.inner.dead_letters.load(Ordering::SeqCst)
    }

    /// Poll until the queue is idle or `timeout` elapses. Returns whether the
    /// queue settled.
    pub async fn settled(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_idle() {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Make the next `publish` fail, for exercising enqueue-failure paths.
    pub fn fail_next_publish(&self) {
        self.inner.fail_next_publish.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn publish(&self, message: &JobMessage) -> Result<(), QueueError> {
        if self.inner.fail_next_publish.swap(false, Ordering::SeqCst) {
            return Err(QueueError::Publish("injected publish failure".to_string()));
        }

        self.inner.queued.fetch_add(1, Ordering::SeqCst);
        let envelope = Envelope {
            message: message.clone(),
            redeliveries: 0,
        };
        if self.inner.tx.send(envelope).await.is_err() {
            self.inner.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(QueueError::Closed);
        }

        tracing::debug!(job.kind = message.kind(), "Job published");
        Ok(())
    }
}

#[async_trait]
impl JobConsumer for InMemoryJobQueue {
    async fn next_delivery(&self) -> Result<Option<Delivery>, QueueError> {
        let envelope = {
            let mut rx = self.inner.rx.lock().await;
            rx.recv().await
        };

        match envelope {
            Some(envelope) => {
                // in_flight rises before queued falls so the queue never
                // looks idle while a message changes hands.
                self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
                self.inner.queued.fetch_sub(1, Ordering::SeqCst);
                Ok(Some(Delivery::new(
                    envelope.message,
                    envelope.redeliveries,
                    Box::new(MemoryAcker {
                        inner: self.inner.clone(),
                        redeliveries: envelope.redeliveries,
                    }),
                )))
            }
            None => Ok(None),
        }
    }
}

struct MemoryAcker {
    inner: Arc<QueueInner>,
    redeliveries: u32,
}

#[async_trait]
impl Acknowledge for MemoryAcker {
    async fn ack(self: Box<Self>) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    async fn reject(self: Box<Self>, message: JobMessage) {
        let redeliveries = self.redeliveries + 1;
        if redeliveries > self.inner.max_redeliveries {
            tracing::error!(
                job.kind = message.kind(),
                redeliveries = self.redeliveries,
                "Job abandoned after exhausting redeliveries"
            );
            self.inner.dead_letters.fetch_add(1, Ordering::SeqCst);
            self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
            return;
        }

        self.inner.queued.fetch_add(1, Ordering::SeqCst);
        if self
            .inner
            .tx
            .send(Envelope {
                message,
                redeliveries,
            })
            .await
            .is_err()
        {
            self.inner.queued.fetch_sub(1, Ordering::SeqCst);
            tracing::warn!("Queue closed while requeueing a rejected job");
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn message() -> JobMessage {
        JobMessage::ProcessPicture {
            library_id: Uuid::new_v4(),
            file_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn publish_deliver_ack() {
        let queue = InMemoryJobQueue::new(16, 5);
        let msg = message();
        queue.publish(&msg).await.unwrap();
        assert!(!queue.is_idle());

        let delivery = queue.next_delivery().await.unwrap().unwrap();
        assert_eq!(delivery.message, msg);
        assert_eq!(delivery.redeliveries, 0);

        delivery.ack().await;
        assert!(queue.is_idle());
    }

    #[tokio::test]
    async fn reject_redelivers_with_incremented_count() {
        let queue = InMemoryJobQueue::new(16, 5);
        queue.publish(&message()).await.unwrap();

        let first = queue.next_delivery().await.unwrap().unwrap();
        first.reject().await;

        let second = queue.next_delivery().await.unwrap().unwrap();
        assert_eq!(second.redeliveries, 1);
        second.ack().await;
        assert!(queue.is_idle());
    }

    #[tokio::test]
    async fn repeated_rejection_dead_letters_the_message() {
        let queue = InMemoryJobQueue::new(16, 2);
        queue.publish(&message()).await.unwrap();

        for _ in 0..3 {
            let delivery = queue.next_delivery().await.unwrap().unwrap();
            delivery.reject().await;
        }

        assert!(queue.is_idle());
        assert_eq!(queue.dead_letters(), 1);
    }

    #[tokio::test]
    async fn injected_publish_failure_fires_once() {
        let queue = InMemoryJobQueue::new(16, 5);
        queue.fail_next_publish();
        assert!(queue.publish(&message()).await.is_err());
        assert!(queue.publish(&message()).await.is_ok());
    }
}
