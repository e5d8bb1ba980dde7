//! Graceful shutdown handling

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info};

/// Shutdown fan-out to the server and background tasks
#[derive(Clone)]
pub struct ShutdownSignal {
    sender: broadcast::Sender<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    pub fn shutdown(&self) {
        let _ = self.sender.send(());
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the server is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    Interrupt,
    Terminate,
    /// The lock store reported an error it cannot recover from
    Unrecoverable,
}

/// Wait for Ctrl+C, SIGTERM, or a report on the handler's exit channel
pub async fn wait_for_termination(exit_rx: &mut mpsc::Receiver<()>) -> TerminationReason {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed-to-install-ctrl-c-handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed-to-install-sigterm-handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    wait_for_first(ctrl_c, terminate, exit_rx).await
}

async fn wait_for_first(
    interrupt: impl Future<Output = ()>,
    terminate: impl Future<Output = ()>,
    exit_rx: &mut mpsc::Receiver<()>,
) -> TerminationReason {
    tokio::select! {
        _ = interrupt => {
            info!("received-interrupt");
            TerminationReason::Interrupt
        }
        _ = terminate => {
            info!("received-sigterm");
            TerminationReason::Terminate
        }
        Some(()) = exit_rx.recv() => {
            error!("unrecoverable-store-error");
            TerminationReason::Unrecoverable
        }
    }
}
