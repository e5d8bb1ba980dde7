//! Long-running lock holder
//!
//! Acquires a key on a fixed cadence, reports readiness the first time the
//! lock is held, keeps renewing it, and releases it when stopped. Once held,
//! a failed renewal means the lock may now belong to someone else; the runner
//! returns `ClientError::LockLost` instead of retrying.

use std::time::Duration;

use latchkey_api::grpc::Resource;
use tokio::sync::{broadcast, oneshot};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::client::LocketClient;
use crate::error::{ClientError, Result};

pub struct LockRunner {
    client: LocketClient,
    resource: Resource,
    ttl_in_seconds: i64,
    retry_interval: Duration,
}

impl LockRunner {
    pub fn new(
        client: LocketClient,
        resource: Resource,
        ttl_in_seconds: i64,
        retry_interval: Duration,
    ) -> Self {
        Self {
            client,
            resource,
            ttl_in_seconds,
            retry_interval,
        }
    }

    /// Hold the lock until `shutdown` fires.
    ///
    /// `ready` is completed once, when the lock is first acquired.
    pub async fn run(
        self,
        ready: oneshot::Sender<()>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        let key = self.resource.key.clone();
        let owner = self.resource.owner.clone();
        let mut ready = Some(ready);
        let mut acquired = false;
        let mut ticker = interval(self.retry_interval);

        info!(key = %key, owner = %owner, "lock-runner-started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.client.lock(self.resource.clone(), self.ttl_in_seconds).await {
                        Ok(()) => {
                            if !acquired {
                                info!(key = %key, owner = %owner, "acquired-lock");
                                acquired = true;
                                if let Some(ready) = ready.take() {
                                    let _ = ready.send(());
                                }
                            }
                        }
                        Err(e) if acquired => {
                            error!(key = %key, owner = %owner, error = %e, "lost-lock");
                            return Err(ClientError::LockLost {
                                key,
                                source: Box::new(e),
                            });
                        }
                        Err(e) => {
                            warn!(key = %key, owner = %owner, error = %e, "failed-to-acquire-lock");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!(key = %key, owner = %owner, "lock-runner-stopping");
                    if acquired {
                        if let Err(e) = self.client.release(self.resource.clone()).await {
                            warn!(key = %key, owner = %owner, error = %e, "failed-to-release-lock");
                        }
                    }
                    return Ok(());
                }
            }
        }
    }
}
