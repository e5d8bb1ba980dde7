//! Periodic re-arming of expiration timers

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};

use super::lock_pick::LockPick;
use crate::lock::LockDb;

/// Sweeps the store and registers the TTL of every live record.
///
/// Records written before this process started, or whose timer was lost, are
/// otherwise never reaped. The first sweep runs immediately.
pub struct Burglar {
    db: Arc<dyn LockDb>,
    lock_pick: Arc<dyn LockPick>,
    retry_interval: Duration,
}

impl Burglar {
    pub fn new(db: Arc<dyn LockDb>, lock_pick: Arc<dyn LockPick>, retry_interval: Duration) -> Self {
        Self {
            db,
            lock_pick,
            retry_interval,
        }
    }

    /// Register every live record; returns how many were registered
    #[instrument(name = "burglar", skip_all)]
    pub async fn sweep(&self) -> usize {
        match self.db.fetch_all(None).await {
            Ok(locks) => {
                for lock in &locks {
                    self.lock_pick.register_ttl(lock);
                }
                debug!(count = locks.len(), "burglar-registered-locks");
                locks.len()
            }
            Err(e) => {
                error!(error = %e, "burglar-failed-to-fetch-locks");
                0
            }
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(interval = ?self.retry_interval, "burglar-started");
        let mut ticker = tokio::time::interval(self.retry_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                _ = shutdown.recv() => {
                    info!("burglar-stopped");
                    break;
                }
            }
        }
    }
}
