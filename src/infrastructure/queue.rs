//! In-process Queue: the proxy for the horizontal-fan-out transport the
//! spec describes abstractly. Delivery is `tokio::sync::mpsc`; retry
//! scheduling (including `Retry-After`-driven backoff) is a
//! `tokio_util::time::DelayQueue` so a delayed redelivery doesn't block a
//! worker for the whole delay.
//!
//! Grounded on the provider-trait pattern in the vendored agent-framework
//! example: an `#[async_trait]` seam in front of an in-process default
//! implementation, so a real distributed transport can be swapped in later
//! without touching the Fetcher or Scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio_util::time::DelayQueue;
use uuid::Uuid;

/// One feed to fetch, carrying its own correlation id so downstream events
/// (fetch_logs rows, tracing spans) can be joined across retries.
#[derive(Debug, Clone)]
pub struct FeedJob {
    pub feed_id: i64,
    pub url: String,
    pub attempt: u32,
    pub correlation_id: String,
}

impl FeedJob {
    pub fn new(feed_id: i64, url: String) -> Self {
        Self {
            feed_id,
            url,
            attempt: 0,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }

    fn retried(&self) -> Self {
        Self {
            feed_id: self.feed_id,
            url: self.url.clone(),
            attempt: self.attempt + 1,
            correlation_id: self.correlation_id.clone(),
        }
    }
}

#[async_trait]
pub trait Queue: Send + Sync {
    async fn publish(&self, job: FeedJob);

    /// Re-enqueue after a failure, honoring a not-before delivery time.
    /// When `attempt` exceeds the retry ceiling, the job is forwarded to
    /// the Dead Letter channel instead of being redelivered.
    async fn retry(&self, job: FeedJob, not_before: DateTime<Utc>, reason: &str);
}

/// A job pulled off the queue for processing, or a dead-letter notification
/// the caller may want to persist via the repository.
pub enum Delivery {
    Job(FeedJob),
    DeadLettered { job: FeedJob, reason: String },
}

pub struct InProcessQueue {
    tx: mpsc::UnboundedSender<Delivery>,
    rx: Mutex<mpsc::UnboundedReceiver<Delivery>>,
    delay: Mutex<DelayQueue<FeedJob>>,
    max_retries: u32,
}

impl InProcessQueue {
    pub fn new(max_retries: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            delay: Mutex::new(DelayQueue::new()),
            max_retries,
        }
    }

    /// Pulls the next ready delivery, waiting on either a fresh publish or a
    /// delay-queue entry reaching its deadline.
    pub async fn next(&self) -> Option<Delivery> {
        let mut rx = self.rx.lock().await;
        let mut delay = self.delay.lock().await;

        tokio::select! {
            biased;
            Some(expired) = std::future::poll_fn(|cx| delay.poll_expired(cx)) => {
                Some(Delivery::Job(expired.into_inner()))
            }
            item = rx.recv() => item,
        }
    }
}

#[async_trait]
impl Queue for InProcessQueue {
    async fn publish(&self, job: FeedJob) {
        let _ = self.tx.send(Delivery::Job(job));
    }

    async fn retry(&self, job: FeedJob, not_before: DateTime<Utc>, reason: &str) {
        if job.attempt >= self.max_retries {
            let _ = self.tx.send(Delivery::DeadLettered {
                job,
                reason: reason.to_string(),
            });
            return;
        }

        let delay = (not_before - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let next_job = job.retried();
        self.delay.lock().await.insert(next_job, delay);
    }
}
