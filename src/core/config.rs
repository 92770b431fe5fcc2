use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot
/// Bot token for the primary (user-facing) bot
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Pool of bot tokens used only for background handle validation.
/// Read from VALIDATION_BOT_TOKENS as a comma-separated list; falls back to
/// the primary BOT_TOKEN when unset so validation still works on small installs.
pub static VALIDATION_BOT_TOKENS: Lazy<Vec<String>> = Lazy::new(|| {
    let raw = env::var("VALIDATION_BOT_TOKENS").unwrap_or_default();
    let tokens: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if tokens.is_empty() && !BOT_TOKEN.is_empty() {
        vec![BOT_TOKEN.clone()]
    } else {
        tokens
    }
});

/// Meilisearch base URL
/// Read from MEILISEARCH_URL environment variable
/// Default: http://127.0.0.1:7700
pub static MEILISEARCH_URL: Lazy<String> =
    Lazy::new(|| env::var("MEILISEARCH_URL").unwrap_or_else(|_| "http://127.0.0.1:7700".to_string()));

/// Meilisearch API key
/// Read from MEILISEARCH_KEY environment variable
pub static MEILISEARCH_KEY: Lazy<String> = Lazy::new(|| env::var("MEILISEARCH_KEY").unwrap_or_default());

/// Meilisearch index that holds the chat/channel/message documents
/// Read from SEARCH_INDEX environment variable
/// Default: telegram_index
pub static SEARCH_INDEX: Lazy<String> =
    Lazy::new(|| env::var("SEARCH_INDEX").unwrap_or_else(|_| "telegram_index".to_string()));

/// Management service (PocketBase) base URL, used by the chat indexing flow
/// Read from MANAGEMENT_SERVICE_URL environment variable
pub static MANAGEMENT_SERVICE_URL: Lazy<Option<String>> = Lazy::new(|| env::var("MANAGEMENT_SERVICE_URL").ok());

/// Management service bearer token
/// Read from MANAGEMENT_SERVICE_TOKEN environment variable
pub static MANAGEMENT_SERVICE_TOKEN: Lazy<String> =
    Lazy::new(|| env::var("MANAGEMENT_SERVICE_TOKEN").unwrap_or_default());

/// Token of the dedicated bot that posts review notifications.
/// Read from REVIEW_BOT_TOKEN; falls back to the primary BOT_TOKEN.
pub static REVIEW_BOT_TOKEN: Lazy<String> =
    Lazy::new(|| env::var("REVIEW_BOT_TOKEN").unwrap_or_else(|_| BOT_TOKEN.clone()));

/// Chat ID of the review channel where flagged handles are posted.
/// Read from REVIEW_CHANNEL_ID environment variable; 0 disables review posts.
pub static REVIEW_CHANNEL_ID: Lazy<i64> = Lazy::new(|| {
    env::var("REVIEW_CHANNEL_ID")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0)
});

/// Webhook URL for Telegram updates
/// Read from WEBHOOK_URL environment variable
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok());

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Validation pipeline configuration
pub mod validation {
    use super::{env, Duration, Lazy};

    /// Capacity of the bounded validation job queue.
    /// Producers never block: when the queue is full new jobs are dropped.
    pub const QUEUE_CAPACITY: usize = 100;

    /// Minimum pause between consecutive external lookups performed by the
    /// single validation worker, regardless of outcome.
    pub const LOOKUP_INTERVAL_MS: u64 = 1000;

    /// Delay before a rate-limited job is re-submitted to the queue.
    pub const REQUEUE_DELAY_MS: u64 = 1000;

    /// Hard cap on processing attempts per job. A job that still cannot be
    /// validated after this many credential rotations is dropped.
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Freshness window for cached validation verdicts (hours).
    pub const CACHE_TTL_HOURS: u64 = 24;

    /// How long a rate-limited credential stays suspended (seconds).
    /// Read from TOKEN_ROTATION_SECS environment variable, default 300.
    pub static CREDENTIAL_COOLDOWN_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("TOKEN_ROTATION_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300)
    });

    /// Worker pacing between external lookups
    pub fn lookup_interval() -> Duration {
        Duration::from_millis(LOOKUP_INTERVAL_MS)
    }

    /// Delay applied to rate-limited requeues
    pub fn requeue_delay() -> Duration {
        Duration::from_millis(REQUEUE_DELAY_MS)
    }

    /// Credential suspension cooldown
    pub fn credential_cooldown() -> Duration {
        Duration::from_secs(*CREDENTIAL_COOLDOWN_SECS)
    }

    /// Validation cache freshness window
    pub fn cache_ttl() -> Duration {
        Duration::from_secs(CACHE_TTL_HOURS * 60 * 60)
    }
}

/// Search configuration
pub mod search {
    use super::Duration;

    /// Results shown per page
    pub const HITS_PER_PAGE: i64 = 10;

    /// Timeout for Meilisearch / management service requests
    pub const REQUEST_TIMEOUT_SECS: u64 = 15;

    /// Request timeout duration
    pub fn request_timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Timeout for Telegram Bot API requests (seconds)
    pub const TIMEOUT_SECS: u64 = 30;

    /// Telegram request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(TIMEOUT_SECS)
    }
}

/// Metrics configuration
pub mod metrics {
    use super::{env, Lazy};

    /// Whether the Prometheus endpoint is enabled (METRICS_ENABLED=true)
    pub static ENABLED: Lazy<bool> = Lazy::new(|| {
        env::var("METRICS_ENABLED")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    });

    /// Metrics server port (METRICS_PORT, default 9090)
    pub static PORT: Lazy<u16> = Lazy::new(|| {
        env::var("METRICS_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(9090)
    });
}
