// gRPC adapter for the Locket service

use std::sync::Arc;

use latchkey_api::grpc::{
    FetchAllRequest, FetchAllResponse, FetchRequest, FetchResponse, LockRequest, LockResponse,
    Locket, ReleaseRequest, ReleaseResponse,
};
use latchkey_core::LockHandler;
use tonic::{Request, Response, Status};

/// Serves `latchkey.Locket` by delegating to a [`LockHandler`]
#[derive(Clone)]
pub struct LocketService {
    handler: Arc<LockHandler>,
}

impl LocketService {
    pub fn new(handler: Arc<LockHandler>) -> Self {
        Self { handler }
    }
}

#[tonic::async_trait]
impl Locket for LocketService {
    async fn lock(&self, request: Request<LockRequest>) -> Result<Response<LockResponse>, Status> {
        self.handler
            .lock(request.into_inner())
            .await
            .map(Response::new)
            .map_err(Status::from)
    }

    async fn release(
        &self,
        request: Request<ReleaseRequest>,
    ) -> Result<Response<ReleaseResponse>, Status> {
        self.handler
            .release(request.into_inner())
            .await
            .map(Response::new)
            .map_err(Status::from)
    }

    async fn fetch(
        &self,
        request: Request<FetchRequest>,
    ) -> Result<Response<FetchResponse>, Status> {
        self.handler
            .fetch(request.into_inner())
            .await
            .map(Response::new)
            .map_err(Status::from)
    }

    async fn fetch_all(
        &self,
        request: Request<FetchAllRequest>,
    ) -> Result<Response<FetchAllResponse>, Status> {
        self.handler
            .fetch_all(request.into_inner())
            .await
            .map(Response::new)
            .map_err(Status::from)
    }
}
