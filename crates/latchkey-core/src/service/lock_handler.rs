// Locket request handler
// Validates requests and delegates to the lock store and the expiration engine

use std::sync::Arc;

use latchkey_api::grpc::{
    FetchAllRequest, FetchAllResponse, FetchRequest, FetchResponse, LockRequest, LockResponse,
    ReleaseRequest, ReleaseResponse,
};
use latchkey_api::{validate_fetch_all_request, validate_lock_request};
use latchkey_common::{LatchkeyError, Result};
use latchkey_consistency::{LockDb, LockPick};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument};

/// Handler behind the `latchkey.Locket` service.
///
/// Holds only shared references, so one instance serves every request
/// concurrently. An unrecoverable store error is reported once on `exit_tx`.
#[derive(Clone)]
pub struct LockHandler {
    db: Arc<dyn LockDb>,
    lock_pick: Arc<dyn LockPick>,
    exit_tx: mpsc::Sender<()>,
}

impl LockHandler {
    pub fn new(
        db: Arc<dyn LockDb>,
        lock_pick: Arc<dyn LockPick>,
        exit_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            db,
            lock_pick,
            exit_tx,
        }
    }

    #[instrument(name = "lock", skip_all)]
    pub async fn lock(&self, request: LockRequest) -> Result<LockResponse> {
        let (resource, lock_type) = validate_lock_request(&request).inspect_err(|e| {
            let resource = request.resource.as_ref();
            error!(
                key = resource.map(|r| r.key.as_str()).unwrap_or_default(),
                lock_type = resource.map(|r| r.r#type.as_str()).unwrap_or_default(),
                type_code = resource.map(|r| r.type_code).unwrap_or_default(),
                ttl = request.ttl_in_seconds,
                error = %e,
                "invalid-request"
            );
        })?;

        debug!(key = %resource.key, owner = %resource.owner, lock_type = %lock_type, "started");

        let lock = match self.db.lock(&resource, request.ttl_in_seconds).await {
            Ok(lock) => lock,
            Err(LatchkeyError::LockCollision) => {
                debug!(key = %resource.key, owner = %resource.owner, "lock-collision");
                return Err(LatchkeyError::LockCollision);
            }
            Err(e) => {
                error!(key = %resource.key, owner = %resource.owner, error = %e, "failed-locking-lock");
                self.exit_if_unrecoverable(&e);
                return Err(e);
            }
        };

        self.lock_pick.register_ttl(&lock);
        debug!(key = %resource.key, modified_index = lock.modified_index, "complete");

        Ok(LockResponse {})
    }

    #[instrument(name = "release", skip_all)]
    pub async fn release(&self, request: ReleaseRequest) -> Result<ReleaseResponse> {
        let resource = request.resource.unwrap_or_default();
        debug!(key = %resource.key, owner = %resource.owner, "started");

        let released = match self.db.release(&resource).await {
            Ok(lock) => lock,
            Err(e) => {
                match e {
                    LatchkeyError::LockCollision | LatchkeyError::ResourceNotFound => {
                        debug!(key = %resource.key, owner = %resource.owner, error = %e, "failed-releasing-lock");
                    }
                    _ => {
                        error!(key = %resource.key, owner = %resource.owner, error = %e, "failed-releasing-lock");
                        self.exit_if_unrecoverable(&e);
                    }
                }
                return Err(e);
            }
        };

        self.lock_pick.deregister(&released);
        debug!(key = %resource.key, modified_index = released.modified_index, "complete");

        Ok(ReleaseResponse {})
    }

    #[instrument(name = "fetch", skip_all)]
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse> {
        debug!(key = %request.key, "started");

        let lock = self.db.fetch(&request.key).await.inspect_err(|e| {
            if *e != LatchkeyError::ResourceNotFound {
                error!(key = %request.key, error = %e, "failed-fetching-lock");
                self.exit_if_unrecoverable(e);
            }
        })?;

        Ok(FetchResponse {
            resource: Some(lock.resource),
        })
    }

    #[instrument(name = "fetch-all", skip_all)]
    pub async fn fetch_all(&self, request: FetchAllRequest) -> Result<FetchAllResponse> {
        let lock_type = validate_fetch_all_request(&request).inspect_err(|e| {
            error!(
                lock_type = %request.r#type,
                type_code = request.type_code,
                error = %e,
                "invalid-request"
            );
        })?;

        let locks = self.db.fetch_all(Some(lock_type)).await.inspect_err(|e| {
            error!(lock_type = %lock_type, error = %e, "failed-fetching-locks");
            self.exit_if_unrecoverable(e);
        })?;

        debug!(lock_type = %lock_type, count = locks.len(), "complete");

        Ok(FetchAllResponse {
            resources: locks.into_iter().map(|lock| lock.resource).collect(),
        })
    }

    fn exit_if_unrecoverable(&self, err: &LatchkeyError) {
        if err.is_unrecoverable() {
            error!(error = %err, "unrecoverable-error");
            // A full channel means shutdown was already requested
            let _ = self.exit_tx.try_send(());
        }
    }
}
