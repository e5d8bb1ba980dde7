//! Shared harness for Locket integration tests
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use latchkey_client::LocketClient;
use latchkey_consistency::{LockDb, MemoryLockDb, TimerLockPick};
use latchkey_core::LockHandler;
use latchkey_server::startup::{ShutdownSignal, locket_service};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::{Endpoint, Server};

/// Handler wired to an in-memory store with real lease timers
pub struct Stack {
    pub db: Arc<MemoryLockDb>,
    pub lock_pick: Arc<TimerLockPick>,
    pub handler: Arc<LockHandler>,
    pub exit_rx: mpsc::Receiver<()>,
}

pub fn stack() -> Stack {
    let db = Arc::new(MemoryLockDb::new());
    let lock_db: Arc<dyn LockDb> = db.clone();
    let lock_pick = Arc::new(TimerLockPick::new(lock_db.clone()));
    let (exit_tx, exit_rx) = mpsc::channel(1);
    let handler = Arc::new(LockHandler::new(lock_db, lock_pick.clone(), exit_tx));
    Stack {
        db,
        lock_pick,
        handler,
        exit_rx,
    }
}

/// Plaintext Locket server on an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    pub db: Arc<MemoryLockDb>,
    pub lock_pick: Arc<TimerLockPick>,
    shutdown: ShutdownSignal,
    handle: JoinHandle<Result<(), tonic::transport::Error>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let stack = stack();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = ShutdownSignal::new();
        let mut shutdown_rx = shutdown.subscribe();
        let router = Server::builder().add_service(locket_service(stack.handler));
        let handle = tokio::spawn(async move {
            router
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
        });

        Self {
            addr,
            db: stack.db,
            lock_pick: stack.lock_pick,
            shutdown,
            handle,
        }
    }

    pub async fn client(&self) -> LocketClient {
        let channel = Endpoint::from_shared(format!("http://{}", self.addr))
            .unwrap()
            .connect()
            .await
            .unwrap();
        LocketClient::from_channel(channel)
    }

    pub async fn stop(self) {
        self.shutdown.shutdown();
        self.lock_pick.shutdown();
        self.handle.await.unwrap().unwrap();
    }
}
