//! Metrics collection using Prometheus
//!
//! Central registry for:
//! - Search traffic (queries, callback re-renders)
//! - Validation pipeline health (lookups by outcome, queue depth, drops)
//! - Credential pool state (suspensions, revocations)

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge,
};

lazy_static! {
    /// Total searches served, by origin (command, short_text, callback)
    pub static ref SEARCHES_TOTAL: CounterVec = register_counter_vec!(
        "soso_searches_total",
        "Total number of searches served",
        &["origin"]
    )
    .unwrap();

    /// External handle lookups by outcome
    /// Labels: outcome (found/not_found/rate_limited/unauthorized/other)
    pub static ref VALIDATION_LOOKUPS_TOTAL: CounterVec = register_counter_vec!(
        "soso_validation_lookups_total",
        "Total external handle lookups performed by the validation worker",
        &["outcome"]
    )
    .unwrap();

    /// Jobs dropped without a verdict
    /// Labels: reason (queue_full/no_credentials/attempts_exhausted/other_error)
    pub static ref VALIDATION_DROPS_TOTAL: CounterVec = register_counter_vec!(
        "soso_validation_drops_total",
        "Validation jobs dropped without a verdict",
        &["reason"]
    )
    .unwrap();

    /// Current depth of the validation queue
    pub static ref VALIDATION_QUEUE_DEPTH: Gauge = register_gauge!(
        "soso_validation_queue_depth",
        "Jobs currently waiting in the validation queue"
    )
    .unwrap();

    /// Validation cache hits (fresh entry short-circuited a lookup)
    pub static ref VALIDATION_CACHE_HITS_TOTAL: Counter = register_counter!(
        "soso_validation_cache_hits_total",
        "Lookups skipped thanks to a fresh cache entry"
    )
    .unwrap();

    /// Credential pool events
    /// Labels: event (suspended/revoked)
    pub static ref CREDENTIAL_EVENTS_TOTAL: CounterVec = register_counter_vec!(
        "soso_credential_events_total",
        "Credential suspensions and revocations",
        &["event"]
    )
    .unwrap();

    /// Review notifications sent to the moderation channel
    pub static ref REVIEW_NOTIFICATIONS_TOTAL: Counter = register_counter!(
        "soso_review_notifications_total",
        "Flagged handles forwarded for human review"
    )
    .unwrap();

    /// Bot uptime counter in seconds
    pub static ref BOT_UPTIME_SECONDS: Counter = register_counter!(
        "soso_bot_uptime_seconds",
        "Seconds the bot has been running"
    )
    .unwrap();
}

/// Forces evaluation of the lazy metric registrations at startup so the
/// first scrape already sees every series.
pub fn init_metrics() {
    SEARCHES_TOTAL.with_label_values(&["command"]).inc_by(0.0);
    VALIDATION_LOOKUPS_TOTAL.with_label_values(&["found"]).inc_by(0.0);
    VALIDATION_DROPS_TOTAL.with_label_values(&["queue_full"]).inc_by(0.0);
    VALIDATION_QUEUE_DEPTH.set(0.0);
    VALIDATION_CACHE_HITS_TOTAL.inc_by(0.0);
    CREDENTIAL_EVENTS_TOTAL.with_label_values(&["suspended"]).inc_by(0.0);
    REVIEW_NOTIFICATIONS_TOTAL.inc_by(0.0);
    log::debug!("Metrics registry initialized");
}
