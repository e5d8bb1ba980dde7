//! Per-lease expiration timers
//!
//! Checks are keyed by key and `modified_id`, so every owner's lease has its
//! own timer. Within one lease only the highest `modified_index` stays armed.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use latchkey_api::LockType;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::lock::{Lock, LockDb};

/// Counter incremented when a lock expires
pub const LOCKS_EXPIRED: &str = "LocksExpired";

/// Counter incremented when a presence expires
pub const PRESENCE_EXPIRED: &str = "PresenceExpired";

/// Schedules expiration of stored records
pub trait LockPick: Send + Sync {
    /// Arm (or re-arm) the expiration timer for `lock`
    fn register_ttl(&self, lock: &Lock);

    /// Cancel the timer armed for `lock`'s lease, if any
    fn deregister(&self, lock: &Lock);
}

/// Key and `modified_id` of one lease
type LeaseKey = (String, String);

fn lease_key(lock: &Lock) -> LeaseKey {
    (lock.key().to_string(), lock.modified_id.clone())
}

struct ExpirationCheck {
    id: u64,
    modified_index: i64,
    handle: JoinHandle<()>,
}

struct Inner {
    db: Arc<dyn LockDb>,
    checks: Mutex<HashMap<LeaseKey, ExpirationCheck>>,
    next_id: AtomicU64,
}

/// `LockPick` backed by one tokio task per armed lease
#[derive(Clone)]
pub struct TimerLockPick {
    inner: Arc<Inner>,
}

impl TimerLockPick {
    pub fn new(db: Arc<dyn LockDb>) -> Self {
        Self {
            inner: Arc::new(Inner {
                db,
                checks: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Number of armed timers
    pub fn armed_count(&self) -> usize {
        self.inner.checks.lock().len()
    }

    /// Whether any lease of `key` has an armed timer
    pub fn is_armed(&self, key: &str) -> bool {
        self.inner.checks.lock().keys().any(|(k, _)| k == key)
    }

    /// Cancel every armed timer
    pub fn shutdown(&self) {
        let checks: Vec<ExpirationCheck> = {
            let mut checks = self.inner.checks.lock();
            checks.drain().map(|(_, check)| check).collect()
        };
        for check in &checks {
            check.handle.abort();
        }
        info!(cancelled = checks.len(), "lock-pick-shutdown");
    }

    #[instrument(name = "lock-pick", skip_all)]
    async fn check_expiration(
        inner: Arc<Inner>,
        check_id: u64,
        lease: LeaseKey,
        lock_type: LockType,
        modified_index: i64,
        ttl: Duration,
    ) {
        tokio::time::sleep(ttl).await;

        let (key, modified_id) = &lease;
        match inner
            .db
            .release_if_unchanged(key, modified_index, modified_id)
            .await
        {
            Ok(true) => {
                info!(
                    key = %key,
                    lock_type = %lock_type,
                    modified_index,
                    "lock-expired"
                );
                let counter = match lock_type {
                    LockType::Lock => LOCKS_EXPIRED,
                    LockType::Presence => PRESENCE_EXPIRED,
                };
                metrics::counter!(counter).increment(1);
            }
            Ok(false) => {
                debug!(key = %key, modified_index, "lock-changed-before-expiry");
            }
            Err(e) => {
                error!(key = %key, error = %e, "failed-to-expire-lock");
            }
        }

        let mut checks = inner.checks.lock();
        if checks.get(&lease).is_some_and(|check| check.id == check_id) {
            checks.remove(&lease);
        }
    }
}

impl LockPick for TimerLockPick {
    fn register_ttl(&self, lock: &Lock) {
        let lease = lease_key(lock);
        let mut checks = self.inner.checks.lock();

        if let Some(existing) = checks.get(&lease) {
            if existing.modified_index >= lock.modified_index && !existing.handle.is_finished() {
                debug!(
                    key = %lock.key(),
                    modified_index = lock.modified_index,
                    "found-expiration-check"
                );
                return;
            }

            debug!(
                key = %lock.key(),
                old_index = existing.modified_index,
                new_index = lock.modified_index,
                "cancelling-old-check"
            );
            existing.handle.abort();
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = tokio::spawn(Self::check_expiration(
            self.inner.clone(),
            id,
            lease.clone(),
            lock.lock_type(),
            lock.modified_index,
            lock.ttl(),
        ));

        checks.insert(
            lease,
            ExpirationCheck {
                id,
                modified_index: lock.modified_index,
                handle,
            },
        );
    }

    fn deregister(&self, lock: &Lock) {
        if let Some(check) = self.inner.checks.lock().remove(&lease_key(lock)) {
            debug!(
                key = %lock.key(),
                modified_index = lock.modified_index,
                "deregistered-expiration-check"
            );
            check.handle.abort();
        }
    }
}
