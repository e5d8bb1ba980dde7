//! Locket client

use latchkey_api::grpc::{
    FetchAllRequest, FetchRequest, LockRequest, LocketGrpcClient, ReleaseRequest, Resource,
};
use latchkey_api::LockType;
use latchkey_common::LatchkeyError;
use tonic::transport::Channel;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::Result;

/// Client for the `latchkey.Locket` service.
///
/// Cloning is cheap; clones share the underlying channel. Calls are not
/// retried: transport failures surface as `ClientError::Transport` or
/// `ClientError::Grpc`, business failures as `ClientError::Locket`.
#[derive(Debug, Clone)]
pub struct LocketClient {
    inner: LocketGrpcClient<Channel>,
}

impl LocketClient {
    /// Connect over mutual TLS
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        info!(address = %config.address, "connecting-to-locket");
        let channel = config.endpoint().await?.connect().await?;
        Ok(Self::from_channel(channel))
    }

    /// Wrap an already established channel
    pub fn from_channel(channel: Channel) -> Self {
        Self {
            inner: LocketGrpcClient::new(channel),
        }
    }

    /// Acquire or renew `resource` for `ttl_in_seconds`
    pub async fn lock(&self, resource: Resource, ttl_in_seconds: i64) -> Result<()> {
        debug!(key = %resource.key, owner = %resource.owner, ttl = ttl_in_seconds, "lock");
        let request = LockRequest {
            resource: Some(resource),
            ttl_in_seconds,
        };
        self.inner.clone().lock(request).await?;
        Ok(())
    }

    pub async fn release(&self, resource: Resource) -> Result<()> {
        debug!(key = %resource.key, owner = %resource.owner, "release");
        let request = ReleaseRequest {
            resource: Some(resource),
        };
        self.inner.clone().release(request).await?;
        Ok(())
    }

    pub async fn fetch(&self, key: &str) -> Result<Resource> {
        let request = FetchRequest {
            key: key.to_string(),
        };
        let response = self.inner.clone().fetch(request).await?.into_inner();
        Ok(response
            .resource
            .ok_or(LatchkeyError::ResourceNotFound)?)
    }

    /// Live records of one type
    pub async fn fetch_all(&self, lock_type: LockType) -> Result<Vec<Resource>> {
        let request = FetchAllRequest {
            r#type: lock_type.as_str().to_string(),
            type_code: lock_type.type_code() as i32,
        };
        let response = self.inner.clone().fetch_all(request).await?.into_inner();
        Ok(response.resources)
    }
}
