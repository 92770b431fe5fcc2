//! Background validation worker
//!
//! Single consumer of the validation queue. For every queued search hit it
//! checks whether the hit's public handle still resolves to a live chat,
//! using one credential from the rotating pool per lookup and pacing itself
//! to one external call per second regardless of outcome.
//!
//! Per-job lifecycle: `Queued -> InFlight -> {CachedValid,
//! CachedInvalid+Notified, Dropped, Requeued}`. A job is only ever requeued
//! after a credential-state transition (suspension or revocation), and an
//! attempt counter caps how often that can happen before the job is dropped.

use crate::core::config;
use crate::core::metrics;
use crate::validation::cache::ValidationCache;
use crate::validation::credentials::{Credential, CredentialPool};
use crate::validation::queue::{DelayedJob, ValidationJob};
use crate::validation::review::ReviewSink;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Classified result of one external handle lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The handle resolves to a live chat
    Found,
    /// The handle does not resolve. Expected for dead links, not an error.
    NotFound,
    /// The external service rate-limited the credential used
    RateLimited,
    /// The credential itself was rejected
    Unauthorized,
    /// Anything else: network trouble, malformed responses, server errors
    Other(String),
}

impl LookupOutcome {
    fn metric_label(&self) -> &'static str {
        match self {
            LookupOutcome::Found => "found",
            LookupOutcome::NotFound => "not_found",
            LookupOutcome::RateLimited => "rate_limited",
            LookupOutcome::Unauthorized => "unauthorized",
            LookupOutcome::Other(_) => "other",
        }
    }
}

/// The external lookup seam. Production resolves handles through the
/// Telegram Bot API; tests plug in scripted outcomes.
#[async_trait]
pub trait HandleLookup: Send + Sync {
    async fn lookup(&self, credential: &Credential, handle: &str) -> LookupOutcome;
}

/// Strips everything after the first `/` so that handles scraped from deep
/// links ("CCTAV1/16077") collapse to the bare username.
pub fn normalize_handle(handle: &str) -> &str {
    handle.split('/').next().unwrap_or(handle)
}

/// Tunables for the worker, defaulting to the production configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Minimum pause between consecutive external lookups
    pub lookup_interval: Duration,
    /// Delay before a rate-limited job re-enters the queue
    pub requeue_delay: Duration,
    /// How long a rate-limited credential stays suspended
    pub credential_cooldown: Duration,
    /// Hard cap on processing attempts per job
    pub max_attempts: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            lookup_interval: config::validation::lookup_interval(),
            requeue_delay: config::validation::requeue_delay(),
            credential_cooldown: config::validation::credential_cooldown(),
            max_attempts: config::validation::MAX_ATTEMPTS,
        }
    }
}

/// The single-consumer validation loop.
pub struct ValidationWorker {
    pool: Arc<CredentialPool>,
    cache: Arc<ValidationCache>,
    lookup: Arc<dyn HandleLookup>,
    review: Arc<dyn ReviewSink>,
    jobs: mpsc::Receiver<ValidationJob>,
    requeue: mpsc::UnboundedSender<DelayedJob>,
    config: WorkerConfig,
}

impl ValidationWorker {
    pub fn new(
        pool: Arc<CredentialPool>,
        cache: Arc<ValidationCache>,
        lookup: Arc<dyn HandleLookup>,
        review: Arc<dyn ReviewSink>,
        jobs: mpsc::Receiver<ValidationJob>,
        requeue: mpsc::UnboundedSender<DelayedJob>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            pool,
            cache,
            lookup,
            review,
            jobs,
            requeue,
            config,
        }
    }

    /// Drains the queue until every producer is gone. Shutdown simply drops
    /// whatever is still queued; validation is idempotent and best-effort.
    pub async fn run(mut self) {
        log::info!(
            "Validation worker started ({} credential(s), {:?} between lookups)",
            self.pool.len(),
            self.config.lookup_interval
        );
        while let Some(job) = self.jobs.recv().await {
            metrics::VALIDATION_QUEUE_DEPTH.dec();
            self.process(job).await;
        }
        log::info!("Validation worker stopped (queue closed)");
    }

    async fn process(&self, job: ValidationJob) {
        let Some(raw_handle) = job.hit.handle() else {
            return;
        };
        let handle = normalize_handle(raw_handle).to_string();
        if handle.is_empty() {
            return;
        }

        // A fresh verdict may have landed while the job sat in the queue.
        if self.cache.is_fresh(&handle) {
            metrics::VALIDATION_CACHE_HITS_TOTAL.inc();
            return;
        }

        let credential = match self.pool.next() {
            Ok(c) => c,
            Err(e) => {
                log::error!("Failed to get credential for validation of @{}: {}", handle, e);
                metrics::VALIDATION_DROPS_TOTAL.with_label_values(&["no_credentials"]).inc();
                return;
            }
        };

        let outcome = self.lookup.lookup(&credential, &handle).await;
        metrics::VALIDATION_LOOKUPS_TOTAL
            .with_label_values(&[outcome.metric_label()])
            .inc();

        match outcome {
            LookupOutcome::Found => {
                self.cache.store(&handle, true);
            }
            LookupOutcome::NotFound => {
                self.cache.store(&handle, false);
                log::info!("Invalid handle found, sending for review: @{}", handle);
                self.review.notify(&job.hit).await;
            }
            LookupOutcome::RateLimited => {
                self.pool.suspend(&credential, self.config.credential_cooldown);
                self.requeue_after(job, self.config.requeue_delay);
            }
            LookupOutcome::Unauthorized => {
                self.pool.revoke(&credential);
                // Retry immediately: a different credential may succeed.
                self.requeue_after(job, Duration::ZERO);
            }
            LookupOutcome::Other(reason) => {
                log::error!("Failed to look up chat @{}: {}", handle, reason);
                metrics::VALIDATION_DROPS_TOTAL.with_label_values(&["other_error"]).inc();
            }
        }

        // Platform-wide pacing: one external lookup per interval, whatever
        // the outcome was.
        tokio::time::sleep(self.config.lookup_interval).await;
    }

    fn requeue_after(&self, mut job: ValidationJob, delay: Duration) {
        job.attempts += 1;
        if job.attempts >= self.config.max_attempts {
            log::warn!(
                "Dropping validation job {} for @{:?} after {} attempts",
                job.id,
                job.hit.handle(),
                job.attempts
            );
            metrics::VALIDATION_DROPS_TOTAL
                .with_label_values(&["attempts_exhausted"])
                .inc();
            return;
        }
        if self.requeue.send(DelayedJob { delay, job }).is_err() {
            log::warn!("Requeue scheduler is gone, dropping job");
        }
    }
}

/// Spawns the worker onto the runtime.
pub fn spawn_validation_worker(worker: ValidationWorker) -> JoinHandle<()> {
    tokio::spawn(worker.run())
}

#[derive(Debug, Deserialize)]
struct BotApiReply {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Production lookup: `getChat` on the Telegram Bot API with the rotating
/// credential. Uses a plain HTTP call rather than a full bot client so that
/// one reqwest client serves every credential in the pool.
pub struct TelegramHandleLookup {
    http: reqwest::Client,
    api_base: String,
}

impl TelegramHandleLookup {
    pub fn new() -> Self {
        Self::with_api_base("https://api.telegram.org")
    }

    /// Base URL override, for tests and local Bot API servers.
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config::network::timeout())
            .build()
            .unwrap_or_default();
        let api_base: String = api_base.into();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for TelegramHandleLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HandleLookup for TelegramHandleLookup {
    async fn lookup(&self, credential: &Credential, handle: &str) -> LookupOutcome {
        let url = format!(
            "{}/bot{}/getChat?chat_id=%40{}",
            self.api_base,
            credential.token(),
            urlencoding::encode(handle)
        );

        let resp = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => return LookupOutcome::Other(e.to_string()),
        };
        let status = resp.status();

        let reply: BotApiReply = match resp.json().await {
            Ok(r) => r,
            Err(e) => return LookupOutcome::Other(format!("malformed Bot API reply: {}", e)),
        };

        if reply.ok {
            return LookupOutcome::Found;
        }

        let description = reply.description.unwrap_or_default();
        match status.as_u16() {
            401 => LookupOutcome::Unauthorized,
            429 => LookupOutcome::RateLimited,
            _ if description.to_ascii_lowercase().contains("chat not found") => LookupOutcome::NotFound,
            _ => LookupOutcome::Other(format!("{}: {}", status, description)),
        }
    }
}
