//! Time-bounded memo of handle validation verdicts
//!
//! Keyed by the normalized handle. Entries older than the freshness window
//! are treated as absent for decision purposes but are not deleted: staleness
//! is a predicate, not an eviction trigger, and the worker overwrites stale
//! entries when it revalidates.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// A recorded validation verdict for one handle.
#[derive(Debug, Clone, Copy)]
pub struct CacheEntry {
    pub is_valid: bool,
    pub observed_at: Instant,
}

impl CacheEntry {
    /// Whether the verdict is still inside the freshness window.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.observed_at.elapsed() < ttl
    }
}

/// Shared verdict cache. Lookups vastly outnumber writes, so reads take the
/// shared side of the lock.
pub struct ValidationCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ValidationCache {
    /// Creates a cache with the given freshness window (24 h in production).
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// The configured freshness window.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the stored entry, fresh or stale. Callers deciding whether to
    /// skip a lookup must use [`ValidationCache::is_fresh`] (or check the
    /// entry age themselves) instead of trusting the verdict blindly.
    pub fn lookup(&self, handle: &str) -> Option<CacheEntry> {
        self.entries.read().ok().and_then(|e| e.get(handle).copied())
    }

    /// True when a verdict exists and is younger than the freshness window.
    pub fn is_fresh(&self, handle: &str) -> bool {
        self.lookup(handle).map(|e| e.is_fresh(self.ttl)).unwrap_or(false)
    }

    /// Records a verdict, overwriting any previous one (last writer wins).
    pub fn store(&self, handle: &str, is_valid: bool) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(
                handle.to_string(),
                CacheEntry {
                    is_valid,
                    observed_at: Instant::now(),
                },
            );
        }
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_miss() {
        let cache = ValidationCache::new(Duration::from_secs(60));
        assert!(cache.lookup("nobody").is_none());
        assert!(!cache.is_fresh("nobody"));
    }

    #[test]
    fn test_store_and_fresh_lookup() {
        let cache = ValidationCache::new(Duration::from_secs(60));
        cache.store("somechat", true);

        let entry = cache.lookup("somechat").unwrap();
        assert!(entry.is_valid);
        assert!(cache.is_fresh("somechat"));
    }

    #[test]
    fn test_stale_entry_still_returned_but_not_fresh() {
        let cache = ValidationCache::new(Duration::from_millis(20));
        cache.store("somechat", false);
        std::thread::sleep(Duration::from_millis(30));

        // Lazy expiry: the entry survives, the freshness predicate flips.
        let entry = cache.lookup("somechat").unwrap();
        assert!(!entry.is_valid);
        assert!(!cache.is_fresh("somechat"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_store_overwrites() {
        let cache = ValidationCache::new(Duration::from_secs(60));
        cache.store("somechat", false);
        cache.store("somechat", true);
        assert!(cache.lookup("somechat").unwrap().is_valid);
        assert_eq!(cache.len(), 1);
    }
}
