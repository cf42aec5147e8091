//! Prefetch-bounded worker pool.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use pixvault_core::JobMessage;

use crate::queue::{Delivery, JobConsumer};

/// Processes one queue message. `Ok` acknowledges the delivery, `Err`
/// rejects it for redelivery. Handlers must therefore be safe to re-run:
/// no compensation of partial work, idempotent writes only.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, message: &JobMessage) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct WorkerPoolConfig {
    /// Maximum deliveries handled concurrently; a delivery is only taken from
    /// the queue once a slot is free.
    pub prefetch: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self { prefetch: 10 }
    }
}

/// Consumes the jobs queue with bounded concurrency.
pub struct WorkerPool {
    shutdown_tx: mpsc::Sender<()>,
}

impl WorkerPool {
    /// Spawn the consume loop. The pool runs until [`WorkerPool::shutdown`]
    /// or until the queue closes.
    pub fn start(
        consumer: Arc<dyn JobConsumer>,
        handler: Arc<dyn JobHandler>,
        config: WorkerPoolConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::run(consumer, handler, config, shutdown_rx).await;
        });

        Self { shutdown_tx }
    }

    async fn run(
        consumer: Arc<dyn JobConsumer>,
        handler: Arc<dyn JobHandler>,
        config: WorkerPoolConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(prefetch = config.prefetch, "Worker pool started");

        let semaphore = Arc::new(Semaphore::new(config.prefetch));

        loop {
            let permit = tokio::select! {
                _ = shutdown_rx.recv() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let delivery = tokio::select! {
                _ = shutdown_rx.recv() => break,
                delivery = consumer.next_delivery() => delivery,
            };

            match delivery {
                Ok(Some(delivery)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        Self::process(delivery, handler).await;
                    });
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive delivery");
                    drop(permit);
                }
            }
        }

        tracing::info!("Worker pool stopped");
    }

    async fn process(delivery: Delivery, handler: Arc<dyn JobHandler>) {
        let kind = delivery.message.kind();
        let library_id = delivery.message.library_id();

        match handler.handle(&delivery.message).await {
            Ok(()) => {
                tracing::info!(job.kind = kind, library_id = %library_id, "Job completed");
                delivery.ack().await;
            }
            Err(e) => {
                tracing::warn!(
                    job.kind = kind,
                    library_id = %library_id,
                    redeliveries = delivery.redeliveries,
                    error = %e,
                    "Job failed, requeueing"
                );
                delivery.reject().await;
            }
        }
    }

    /// Signal the consume loop to stop taking deliveries. In-flight handlers
    /// finish on their own; their deliveries settle normally.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{InMemoryJobQueue, JobQueue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    struct CountingHandler {
        running: AtomicUsize,
        peak: AtomicUsize,
        handled: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn handle(&self, _message: &JobMessage) -> anyhow::Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            self.handled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn message() -> JobMessage {
        JobMessage::RecalculateFolder {
            library_id: Uuid::new_v4(),
            folder_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_prefetch() {
        let queue = Arc::new(InMemoryJobQueue::new(64, 5));
        let handler = Arc::new(CountingHandler {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            handled: AtomicUsize::new(0),
        });

        let pool = WorkerPool::start(
            queue.clone(),
            handler.clone(),
            WorkerPoolConfig { prefetch: 3 },
        );

        for _ in 0..20 {
            queue.publish(&message()).await.unwrap();
        }

        assert!(queue.settled(Duration::from_secs(5)).await);
        pool.shutdown().await;

        assert_eq!(handler.handled.load(Ordering::SeqCst), 20);
        assert!(handler.peak.load(Ordering::SeqCst) <= 3);
    }

    struct FailOnceHandler {
        failed: AtomicUsize,
        succeeded: AtomicUsize,
    }

    #[async_trait]
    impl JobHandler for FailOnceHandler {
        async fn handle(&self, _message: &JobMessage) -> anyhow::Result<()> {
            if self.failed.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("transient failure");
            }
            self.succeeded.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_jobs_are_redelivered_until_they_succeed() {
        let queue = Arc::new(InMemoryJobQueue::new(16, 5));
        let handler = Arc::new(FailOnceHandler {
            failed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
        });

        let pool = WorkerPool::start(queue.clone(), handler.clone(), WorkerPoolConfig::default());

        queue.publish(&message()).await.unwrap();

        assert!(queue.settled(Duration::from_secs(5)).await);
        pool.shutdown().await;

        assert_eq!(handler.succeeded.load(Ordering::SeqCst), 1);
        assert_eq!(queue.dead_letters(), 0);
    }
}
