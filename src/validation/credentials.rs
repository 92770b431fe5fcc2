//! Rotating credential pool for external lookups
//!
//! Holds the interchangeable bot tokens used for handle validation and hands
//! them out round-robin, skipping tokens under temporary or permanent
//! suspension. All state lives behind the pool's own locks; there are no
//! process-wide blacklist maps.

use crate::core::metrics;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Every configured credential is currently revoked or cooling down.
///
/// Terminal for the job that asked: validation is best-effort, so the job is
/// logged and dropped rather than retried against an empty pool.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no credentials available for validation")]
pub struct NoCredentialsAvailable;

/// An opaque authentication token from the validation pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building API requests.
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Last few characters of the token, safe for log lines.
    pub fn redacted(&self) -> String {
        let tail: String = self.0.chars().rev().take(6).collect::<Vec<_>>().into_iter().rev().collect();
        format!("...{}", tail)
    }
}

/// Round-robin rotation state: the token list (fixed at startup) and cursor.
struct Rotation {
    credentials: Vec<Credential>,
    cursor: usize,
}

/// Pool of interchangeable credentials with suspension tracking.
///
/// Lock layout: the rotation cursor sits behind a mutex (every `next()` call
/// mutates it), while the suspension map and the revocation set each have
/// their own reader/writer lock so that scans only take shared locks on them.
/// None of the locks is ever held across an `.await`.
pub struct CredentialPool {
    rotation: Mutex<Rotation>,
    suspended: RwLock<HashMap<Credential, Instant>>,
    revoked: RwLock<HashSet<Credential>>,
}

impl CredentialPool {
    /// Creates a pool over the given tokens. The set is fixed for the
    /// process lifetime; only suspension state changes at runtime.
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            rotation: Mutex::new(Rotation {
                credentials: tokens.into_iter().map(Credential::new).collect(),
                cursor: 0,
            }),
            suspended: RwLock::new(HashMap::new()),
            revoked: RwLock::new(HashSet::new()),
        }
    }

    /// Number of configured credentials, regardless of suspension state.
    pub fn len(&self) -> usize {
        match self.rotation.lock() {
            Ok(r) => r.credentials.len(),
            Err(poisoned) => poisoned.into_inner().credentials.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the next usable credential and advances the cursor past it.
    ///
    /// Scans at most once around the full list starting at the cursor:
    /// permanently revoked credentials are skipped forever, temporarily
    /// suspended ones are skipped until their expiry instant has passed.
    pub fn next(&self) -> Result<Credential, NoCredentialsAvailable> {
        let mut rotation = match self.rotation.lock() {
            Ok(r) => r,
            Err(poisoned) => poisoned.into_inner(),
        };
        if rotation.credentials.is_empty() {
            return Err(NoCredentialsAvailable);
        }

        let total = rotation.credentials.len();
        for _ in 0..total {
            let candidate = rotation.credentials[rotation.cursor].clone();
            rotation.cursor = (rotation.cursor + 1) % total;

            if self.is_revoked(&candidate) {
                continue;
            }
            if let Some(expiry) = self.suspension_expiry(&candidate) {
                if Instant::now() < expiry {
                    continue;
                }
            }
            return Ok(candidate);
        }

        Err(NoCredentialsAvailable)
    }

    /// Temporarily suspends a credential until `cooldown` has elapsed.
    /// Called when an external service rate-limits the token.
    pub fn suspend(&self, credential: &Credential, cooldown: Duration) {
        log::warn!(
            "Rate limit hit with credential {}. Temporarily suspending for {:?}.",
            credential.redacted(),
            cooldown
        );
        if let Ok(mut suspended) = self.suspended.write() {
            suspended.insert(credential.clone(), Instant::now() + cooldown);
        }
        metrics::CREDENTIAL_EVENTS_TOTAL.with_label_values(&["suspended"]).inc();
    }

    /// Permanently removes a credential from rotation for the process
    /// lifetime. Called when the external service rejects the token itself.
    pub fn revoke(&self, credential: &Credential) {
        log::warn!(
            "Credential {} is permanently invalid, removing from rotation.",
            credential.redacted()
        );
        if let Ok(mut revoked) = self.revoked.write() {
            revoked.insert(credential.clone());
        }
        metrics::CREDENTIAL_EVENTS_TOTAL.with_label_values(&["revoked"]).inc();
    }

    fn is_revoked(&self, credential: &Credential) -> bool {
        self.revoked.read().map(|r| r.contains(credential)).unwrap_or(false)
    }

    fn suspension_expiry(&self, credential: &Credential) -> Option<Instant> {
        self.suspended.read().ok().and_then(|s| s.get(credential).copied())
    }
}
