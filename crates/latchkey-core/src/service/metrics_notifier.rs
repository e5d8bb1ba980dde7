//! Periodic publication of active lock and presence counts

use std::sync::Arc;
use std::time::Duration;

use latchkey_api::LockType;
use latchkey_consistency::LockDb;
use tokio::sync::broadcast;
use tokio::time::{Instant, interval_at};
use tracing::{debug, error, info, instrument};

/// Gauge holding the number of live locks
pub const ACTIVE_LOCKS: &str = "ActiveLocks";

/// Gauge holding the number of live presences
pub const ACTIVE_PRESENCES: &str = "ActivePresences";

/// Counts read during one tick; `None` when the read failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActiveCounts {
    pub locks: Option<usize>,
    pub presences: Option<usize>,
}

pub struct MetricsNotifier {
    db: Arc<dyn LockDb>,
    interval: Duration,
}

impl MetricsNotifier {
    pub fn new(db: Arc<dyn LockDb>, interval: Duration) -> Self {
        Self { db, interval }
    }

    /// Read both counts and publish the ones that could be read
    #[instrument(name = "metrics-notifier", skip_all)]
    pub async fn emit(&self) -> ActiveCounts {
        let locks = self.emit_count(LockType::Lock, ACTIVE_LOCKS).await;
        let presences = self.emit_count(LockType::Presence, ACTIVE_PRESENCES).await;
        ActiveCounts { locks, presences }
    }

    async fn emit_count(&self, lock_type: LockType, gauge: &'static str) -> Option<usize> {
        match self.db.count(Some(lock_type)).await {
            Ok(count) => {
                metrics::gauge!(gauge).set(count as f64);
                Some(count)
            }
            Err(e) => {
                error!(lock_type = %lock_type, error = %e, "failed-to-retrieve-lock-count");
                None
            }
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(interval = ?self.interval, "metrics-notifier-started");
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let counts = self.emit().await;
                    debug!(locks = ?counts.locks, presences = ?counts.presences, "emitted-metrics");
                }
                _ = shutdown.recv() => {
                    info!("metrics-notifier-stopped");
                    break;
                }
            }
        }
    }
}
