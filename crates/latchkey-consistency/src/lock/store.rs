//! Lock store
//!
//! `LockDb` is the storage boundary the handler and the expiration engine talk
//! to. `MemoryLockDb` keeps records in a sharded map; every mutation of a key
//! happens inside that key's entry guard, so operations on one key are
//! linearized while unrelated keys proceed concurrently.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use latchkey_api::{LockType, Resource, resolve_lock_type};
use latchkey_common::{LatchkeyError, Result};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use super::model::{Lock, LockEntry};

/// Storage boundary for lock and presence records
#[async_trait]
pub trait LockDb: Send + Sync {
    /// Acquire or renew `resource.key` for `resource.owner`
    async fn lock(&self, resource: &Resource, ttl_in_seconds: i64) -> Result<Lock>;

    /// Remove the record if it is held by `resource.owner`, returning it
    async fn release(&self, resource: &Resource) -> Result<Lock>;

    /// Remove the record only if it still belongs to the given lease generation.
    ///
    /// Returns whether a record was removed.
    async fn release_if_unchanged(
        &self,
        key: &str,
        modified_index: i64,
        modified_id: &str,
    ) -> Result<bool>;

    async fn fetch(&self, key: &str) -> Result<Lock>;

    /// Live records of one type, or of every type when `lock_type` is `None`
    async fn fetch_all(&self, lock_type: Option<LockType>) -> Result<Vec<Lock>>;

    async fn count(&self, lock_type: Option<LockType>) -> Result<usize>;
}

/// In-memory lock store
#[derive(Debug, Default)]
pub struct MemoryLockDb {
    locks: DashMap<String, LockEntry>,
}

impl MemoryLockDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, including ones past their deadline that
    /// have not been reaped yet
    pub fn stored_len(&self) -> usize {
        self.locks.len()
    }
}

#[async_trait]
impl LockDb for MemoryLockDb {
    async fn lock(&self, resource: &Resource, ttl_in_seconds: i64) -> Result<Lock> {
        if ttl_in_seconds <= 0 {
            return Err(LatchkeyError::InvalidTtl);
        }
        let lock_type = resolve_lock_type(&resource.r#type, resource.type_code)?;
        let resource = resource.normalized(lock_type);
        let now = Instant::now();

        match self.locks.entry(resource.key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let expired = entry.is_expired(now);

                if !expired && entry.lock.owner() != resource.owner {
                    debug!(
                        key = %resource.key,
                        owner = %resource.owner,
                        holder = %entry.lock.owner(),
                        "lock-collision"
                    );
                    return Err(LatchkeyError::LockCollision);
                }

                let modified_id = if expired || entry.lock.owner() != resource.owner {
                    Uuid::new_v4().to_string()
                } else {
                    entry.lock.modified_id.clone()
                };

                if expired {
                    info!(key = %resource.key, owner = %resource.owner, lock_type = %lock_type, "acquired-lock");
                }

                let lock = Lock {
                    resource,
                    ttl_in_seconds,
                    modified_index: entry.lock.modified_index + 1,
                    modified_id,
                };
                *entry = LockEntry::new(lock.clone(), now);
                Ok(lock)
            }
            Entry::Vacant(vacant) => {
                info!(key = %resource.key, owner = %resource.owner, lock_type = %lock_type, "acquired-lock");

                let lock = Lock {
                    resource,
                    ttl_in_seconds,
                    modified_index: 1,
                    modified_id: Uuid::new_v4().to_string(),
                };
                vacant.insert(LockEntry::new(lock.clone(), now));
                Ok(lock)
            }
        }
    }

    async fn release(&self, resource: &Resource) -> Result<Lock> {
        let now = Instant::now();

        match self.locks.entry(resource.key.clone()) {
            Entry::Occupied(occupied) => {
                let entry = occupied.get();
                if entry.is_expired(now) {
                    return Err(LatchkeyError::ResourceNotFound);
                }
                if entry.lock.owner() != resource.owner {
                    debug!(
                        key = %resource.key,
                        owner = %resource.owner,
                        holder = %entry.lock.owner(),
                        "release-by-non-owner"
                    );
                    return Err(LatchkeyError::LockCollision);
                }
                Ok(occupied.remove().lock)
            }
            Entry::Vacant(_) => Err(LatchkeyError::ResourceNotFound),
        }
    }

    async fn release_if_unchanged(
        &self,
        key: &str,
        modified_index: i64,
        modified_id: &str,
    ) -> Result<bool> {
        let removed = self
            .locks
            .remove_if(key, |_, entry| {
                entry.lock.same_generation(modified_index, modified_id)
            })
            .is_some();
        Ok(removed)
    }

    async fn fetch(&self, key: &str) -> Result<Lock> {
        let now = Instant::now();
        match self.locks.get(key) {
            Some(entry) if !entry.is_expired(now) => Ok(entry.lock.clone()),
            _ => Err(LatchkeyError::ResourceNotFound),
        }
    }

    async fn fetch_all(&self, lock_type: Option<LockType>) -> Result<Vec<Lock>> {
        let now = Instant::now();
        Ok(self
            .locks
            .iter()
            .filter(|entry| entry.is_live_of(lock_type, now))
            .map(|entry| entry.lock.clone())
            .collect())
    }

    async fn count(&self, lock_type: Option<LockType>) -> Result<usize> {
        let now = Instant::now();
        Ok(self
            .locks
            .iter()
            .filter(|entry| entry.is_live_of(lock_type, now))
            .count())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn lock_resource(key: &str, owner: &str) -> Resource {
        Resource::new(key, owner, "{}", LockType::Lock)
    }

    #[tokio::test]
    async fn test_lock_and_fetch() {
        let db = MemoryLockDb::new();

        let lock = db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();
        assert_eq!(lock.modified_index, 1);
        assert!(!lock.modified_id.is_empty());

        let fetched = db.fetch("db-leader").await.unwrap();
        assert_eq!(fetched, lock);
        assert_eq!(fetched.resource.type_code(), latchkey_api::TypeCode::Lock);
    }

    #[tokio::test]
    async fn test_collision_with_other_owner() {
        let db = MemoryLockDb::new();
        db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();

        let result = db.lock(&lock_resource("db-leader", "node-b"), 10).await;
        assert_eq!(result, Err(LatchkeyError::LockCollision));

        let holder = db.fetch("db-leader").await.unwrap();
        assert_eq!(holder.owner(), "node-a");
    }

    #[tokio::test]
    async fn test_renewal_increments_index_and_keeps_id() {
        let db = MemoryLockDb::new();
        let first = db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();
        let second = db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();

        assert_eq!(second.modified_index, first.modified_index + 1);
        assert_eq!(second.modified_id, first.modified_id);
    }

    #[tokio::test]
    async fn test_huge_ttl_is_held_far_in_the_future() {
        let db = MemoryLockDb::new();
        let lock = db
            .lock(&lock_resource("db-leader", "node-a"), i64::MAX)
            .await
            .unwrap();
        assert_eq!(lock.ttl_in_seconds, i64::MAX);

        assert_eq!(
            db.lock(&lock_resource("db-leader", "node-b"), 10).await,
            Err(LatchkeyError::LockCollision)
        );
        let renewed = db
            .lock(&lock_resource("db-leader", "node-a"), i64::MAX)
            .await
            .unwrap();
        assert_eq!(renewed.modified_index, 2);
        assert_eq!(db.count(Some(LockType::Lock)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_renewal_overwrites_value() {
        let db = MemoryLockDb::new();
        db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();

        let mut updated = lock_resource("db-leader", "node-a");
        updated.value = "new-payload".to_string();
        db.lock(&updated, 20).await.unwrap();

        let fetched = db.fetch("db-leader").await.unwrap();
        assert_eq!(fetched.resource.value, "new-payload");
        assert_eq!(fetched.ttl_in_seconds, 20);
    }

    #[tokio::test]
    async fn test_non_positive_ttl_is_rejected_without_mutation() {
        let db = MemoryLockDb::new();
        assert_eq!(
            db.lock(&lock_resource("db-leader", "node-a"), 0).await,
            Err(LatchkeyError::InvalidTtl)
        );
        assert_eq!(
            db.lock(&lock_resource("db-leader", "node-a"), -1).await,
            Err(LatchkeyError::InvalidTtl)
        );
        assert_eq!(db.stored_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_is_free_before_cleanup() {
        let db = MemoryLockDb::new();
        let first = db.lock(&lock_resource("db-leader", "node-a"), 5).await.unwrap();

        assert_eq!(
            db.lock(&lock_resource("db-leader", "node-b"), 5).await,
            Err(LatchkeyError::LockCollision)
        );

        tokio::time::advance(Duration::from_secs(6)).await;

        // Nothing reaped the record, it is only logically expired
        assert_eq!(db.stored_len(), 1);
        assert_eq!(db.fetch("db-leader").await, Err(LatchkeyError::ResourceNotFound));

        let taken = db.lock(&lock_resource("db-leader", "node-b"), 5).await.unwrap();
        assert_eq!(taken.owner(), "node-b");
        assert_eq!(taken.modified_index, first.modified_index + 1);
        assert_ne!(taken.modified_id, first.modified_id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renewal_resets_deadline() {
        let db = MemoryLockDb::new();
        db.lock(&lock_resource("db-leader", "node-a"), 5).await.unwrap();

        tokio::time::advance(Duration::from_secs(4)).await;
        db.lock(&lock_resource("db-leader", "node-a"), 5).await.unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;

        assert!(db.fetch("db-leader").await.is_ok());
    }

    #[tokio::test]
    async fn test_release() {
        let db = MemoryLockDb::new();
        let held = db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();

        let released = db.release(&lock_resource("db-leader", "node-a")).await.unwrap();
        assert_eq!(released, held);
        assert_eq!(db.fetch("db-leader").await, Err(LatchkeyError::ResourceNotFound));
        assert_eq!(db.stored_len(), 0);
    }

    #[tokio::test]
    async fn test_release_absent_key() {
        let db = MemoryLockDb::new();
        assert_eq!(
            db.release(&lock_resource("missing", "node-a")).await,
            Err(LatchkeyError::ResourceNotFound)
        );
    }

    #[tokio::test]
    async fn test_release_by_other_owner_is_collision() {
        let db = MemoryLockDb::new();
        db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();

        assert_eq!(
            db.release(&lock_resource("db-leader", "node-b")).await,
            Err(LatchkeyError::LockCollision)
        );
        assert!(db.fetch("db-leader").await.is_ok());
    }

    #[tokio::test]
    async fn test_release_if_unchanged() {
        let db = MemoryLockDb::new();
        let first = db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();
        let renewed = db.lock(&lock_resource("db-leader", "node-a"), 10).await.unwrap();

        let stale = db
            .release_if_unchanged("db-leader", first.modified_index, &first.modified_id)
            .await
            .unwrap();
        assert!(!stale);
        assert!(db.fetch("db-leader").await.is_ok());

        let current = db
            .release_if_unchanged("db-leader", renewed.modified_index, &renewed.modified_id)
            .await
            .unwrap();
        assert!(current);
        assert_eq!(db.stored_len(), 0);

        let absent = db
            .release_if_unchanged("db-leader", renewed.modified_index, &renewed.modified_id)
            .await
            .unwrap();
        assert!(!absent);
    }

    #[tokio::test]
    async fn test_fetch_all_and_count_by_type() {
        let db = MemoryLockDb::new();
        db.lock(&lock_resource("a", "node-a"), 10).await.unwrap();
        db.lock(&lock_resource("b", "node-a"), 10).await.unwrap();
        db.lock(&Resource::new("cell-1", "rep-1", "", LockType::Presence), 10)
            .await
            .unwrap();

        let mut keys: Vec<String> = db
            .fetch_all(Some(LockType::Lock))
            .await
            .unwrap()
            .into_iter()
            .map(|lock| lock.resource.key)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        assert_eq!(db.count(Some(LockType::Lock)).await.unwrap(), 2);
        assert_eq!(db.count(Some(LockType::Presence)).await.unwrap(), 1);
        assert_eq!(db.count(None).await.unwrap(), 3);
        assert_eq!(db.fetch_all(None).await.unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_excludes_expired() {
        let db = MemoryLockDb::new();
        db.lock(&lock_resource("short", "node-a"), 1).await.unwrap();
        db.lock(&lock_resource("long", "node-a"), 60).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        let live = db.fetch_all(Some(LockType::Lock)).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].key(), "long");
        assert_eq!(db.count(Some(LockType::Lock)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lock_rejects_invalid_type() {
        let db = MemoryLockDb::new();
        let mut resource = lock_resource("db-leader", "node-a");
        resource.r#type = "leader".to_string();
        resource.type_code = 0;

        assert_eq!(db.lock(&resource, 10).await, Err(LatchkeyError::InvalidType));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_owners_single_winner() {
        let db = Arc::new(MemoryLockDb::new());

        for round in 0..10 {
            let key = format!("contended-{}", round);
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let db = db.clone();
                    let key = key.clone();
                    tokio::spawn(async move {
                        db.lock(&lock_resource(&key, &format!("owner-{}", i)), 30).await
                    })
                })
                .collect();

            let mut winners = 0;
            for handle in handles {
                match handle.await.unwrap() {
                    Ok(_) => winners += 1,
                    Err(err) => assert_eq!(err, LatchkeyError::LockCollision),
                }
            }
            assert_eq!(winners, 1, "round {}", round);
        }
    }
}
