//! Validation job queue
//!
//! Bounded multi-producer queue drained by the single validation worker.
//! Enqueueing is fire-and-forget: validation is best-effort, so when the
//! queue is full new jobs are dropped with a warning instead of blocking
//! the search response path.

use crate::core::config;
use crate::core::metrics;
use crate::search::SearchHit;
use crate::validation::cache::ValidationCache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A single search hit queued for background handle validation.
#[derive(Debug, Clone)]
pub struct ValidationJob {
    /// Job identifier for log correlation
    pub id: String,
    /// The search result record carrying the handle and document id
    pub hit: SearchHit,
    /// How many times this job has entered processing. Bumped on every
    /// credential-issue requeue; the worker drops the job at the cap.
    pub attempts: u32,
}

impl ValidationJob {
    pub fn new(hit: SearchHit) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            hit,
            attempts: 0,
        }
    }
}

/// Producer half of the validation pipeline.
///
/// Holds the cache so the enqueue path can skip hits that already have a
/// fresh verdict without bothering the worker.
#[derive(Clone)]
pub struct ValidationQueue {
    tx: mpsc::Sender<ValidationJob>,
    cache: Arc<ValidationCache>,
}

impl ValidationQueue {
    /// Creates the queue and returns the consumer end for the worker.
    pub fn new(cache: Arc<ValidationCache>) -> (Self, mpsc::Receiver<ValidationJob>) {
        Self::with_capacity(cache, config::validation::QUEUE_CAPACITY)
    }

    pub fn with_capacity(cache: Arc<ValidationCache>, capacity: usize) -> (Self, mpsc::Receiver<ValidationJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, cache }, rx)
    }

    /// Queues every hit of a result batch that has a handle and no fresh
    /// cached verdict. Never blocks; drops on a full queue.
    pub fn enqueue_hits(&self, hits: &[SearchHit]) {
        for hit in hits {
            let Some(handle) = hit.handle() else { continue };
            if self.cache.is_fresh(handle) {
                metrics::VALIDATION_CACHE_HITS_TOTAL.inc();
                continue;
            }
            self.enqueue(ValidationJob::new(hit.clone()));
        }
    }

    /// Submits one job, dropping it with a warning when the queue is full.
    pub fn enqueue(&self, job: ValidationJob) {
        match self.tx.try_send(job) {
            Ok(()) => {
                metrics::VALIDATION_QUEUE_DEPTH.inc();
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                log::warn!(
                    "Validation queue is full, dropping job {} for handle {:?}",
                    job.id,
                    job.hit.handle()
                );
                metrics::VALIDATION_DROPS_TOTAL.with_label_values(&["queue_full"]).inc();
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                log::warn!("Validation worker is gone, dropping job {}", job.id);
            }
        }
    }

    /// Clone of the raw sender, for wiring up the requeue scheduler.
    pub fn sender(&self) -> mpsc::Sender<ValidationJob> {
        self.tx.clone()
    }
}

/// A job scheduled for re-submission after a delay.
#[derive(Debug)]
pub struct DelayedJob {
    pub delay: Duration,
    pub job: ValidationJob,
}

/// Spawns the delayed-requeue scheduler and returns its submission handle.
///
/// Requeues caused by credential trouble go through this task instead of
/// detached sleeps so that re-submission order is deterministic (FIFO by
/// scheduling time) and pending requeues drain before shutdown completes.
pub fn spawn_requeue_scheduler(queue_tx: mpsc::Sender<ValidationJob>) -> mpsc::UnboundedSender<DelayedJob> {
    let (tx, mut rx) = mpsc::unbounded_channel::<DelayedJob>();

    tokio::spawn(async move {
        while let Some(delayed) = rx.recv().await {
            if !delayed.delay.is_zero() {
                tokio::time::sleep(delayed.delay).await;
            }
            let job_id = delayed.job.id.clone();
            match queue_tx.try_send(delayed.job) {
                Ok(()) => {
                    metrics::VALIDATION_QUEUE_DEPTH.inc();
                    log::debug!("Requeued validation job {}", job_id);
                }
                Err(e) => {
                    log::warn!("Failed to requeue validation job {}: {}", job_id, e);
                }
            }
        }
        log::debug!("Requeue scheduler drained and stopped");
    });

    tx
}
