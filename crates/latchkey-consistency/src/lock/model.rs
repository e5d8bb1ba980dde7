//! Lock record model

use std::time::Duration;

use latchkey_api::{LockType, Resource};
use tokio::time::Instant;

/// A lock or presence record as held by the store.
///
/// `modified_index` and `modified_id` together identify one lease generation:
/// the index grows on every successful Lock of the key, the id is minted each
/// time a new owner takes the key and kept across renewals.
#[derive(Debug, Clone, PartialEq)]
pub struct Lock {
    pub resource: Resource,
    pub ttl_in_seconds: i64,
    pub modified_index: i64,
    pub modified_id: String,
}

impl Lock {
    pub fn key(&self) -> &str {
        &self.resource.key
    }

    pub fn owner(&self) -> &str {
        &self.resource.owner
    }

    /// Record kind; stored records always carry a normalized type
    pub fn lock_type(&self) -> LockType {
        match self.resource.r#type.parse() {
            Ok(lock_type) => lock_type,
            Err(_) => LockType::from_type_code(self.resource.type_code()).unwrap_or(LockType::Lock),
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_in_seconds.max(0) as u64)
    }

    /// True when both records belong to the same lease generation
    pub fn same_generation(&self, modified_index: i64, modified_id: &str) -> bool {
        self.modified_index == modified_index && self.modified_id == modified_id
    }
}

/// Deadline offset used when `now + ttl` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Stored record plus its expiry deadline on the monotonic clock
#[derive(Debug, Clone)]
pub(crate) struct LockEntry {
    pub lock: Lock,
    pub expires_at: Instant,
}

impl LockEntry {
    pub fn new(lock: Lock, now: Instant) -> Self {
        let expires_at = now
            .checked_add(lock.ttl())
            .unwrap_or_else(|| now + FAR_FUTURE);
        Self { lock, expires_at }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_live_of(&self, lock_type: Option<LockType>, now: Instant) -> bool {
        !self.is_expired(now) && lock_type.is_none_or(|t| self.lock.lock_type() == t)
    }
}
