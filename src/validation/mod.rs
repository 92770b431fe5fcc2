//! Asynchronous result-validation pipeline
//!
//! Search results reference external chats by public handle; handles go
//! dead over time. This subsystem re-checks them in the background without
//! ever blocking a search response:
//!
//! - [`credentials`]: round-robin pool of lookup tokens with temporary and
//!   permanent suspension
//! - [`cache`]: 24-hour memo of validation verdicts
//! - [`queue`] + [`worker`]: bounded job queue drained by a single paced
//!   consumer, with an explicit delayed-requeue scheduler
//! - [`review`]: human review notifications for handles that came back dead

pub mod cache;
pub mod credentials;
pub mod queue;
pub mod review;
pub mod worker;

pub use cache::{CacheEntry, ValidationCache};
pub use credentials::{Credential, CredentialPool, NoCredentialsAvailable};
pub use queue::{spawn_requeue_scheduler, DelayedJob, ValidationJob, ValidationQueue};
pub use review::{ReviewSink, TelegramReviewNotifier, DELETE_DOC_PREFIX, KEEP_DOC_PREFIX};
pub use worker::{
    normalize_handle, spawn_validation_worker, HandleLookup, LookupOutcome, TelegramHandleLookup, ValidationWorker,
    WorkerConfig,
};
