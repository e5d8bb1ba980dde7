//! Locket gRPC server startup

use std::net::SocketAddr;
use std::sync::Arc;

use latchkey_api::grpc::LocketServer;
use latchkey_core::LockHandler;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Server, ServerTlsConfig};
use tracing::{error, info};

use crate::service::LocketService;

/// Running Locket server
pub struct GrpcServerHandle {
    pub local_addr: SocketAddr,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl GrpcServerHandle {
    /// Wait for the server to drain after shutdown
    pub async fn join(self) -> anyhow::Result<()> {
        match self.handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(error = %e, "locket-server-failed");
                Err(e.into())
            }
            Err(e) => Err(anyhow::anyhow!("locket server task failed: {}", e)),
        }
    }
}

pub fn locket_service(handler: Arc<LockHandler>) -> LocketServer<LocketService> {
    LocketServer::new(LocketService::new(handler))
}

/// Bind `listen_address` and serve Locket over mutual TLS
pub async fn start_grpc_server(
    listen_address: SocketAddr,
    tls: ServerTlsConfig,
    handler: Arc<LockHandler>,
    shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<GrpcServerHandle> {
    let listener = TcpListener::bind(listen_address).await?;
    serve_locket(listener, tls, handler, shutdown)
}

/// Serve Locket over mutual TLS on an already bound listener
pub fn serve_locket(
    listener: TcpListener,
    tls: ServerTlsConfig,
    handler: Arc<LockHandler>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<GrpcServerHandle> {
    let local_addr = listener.local_addr()?;
    let router = Server::builder()
        .tls_config(tls)?
        .add_service(locket_service(handler));

    info!(address = %local_addr, "locket-server-listening");

    let handle = tokio::spawn(async move {
        router
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                let _ = shutdown.recv().await;
                info!("locket-server-stopping");
            })
            .await
    });

    Ok(GrpcServerHandle { local_addr, handle })
}
