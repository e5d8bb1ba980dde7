use std::sync::Arc;

use latchkey_consistency::{Burglar, LockDb, MemoryLockDb, TimerLockPick};
use latchkey_core::{LockHandler, MetricsNotifier};
use latchkey_server::metrics::{init_metrics, install_prometheus_exporter};
use latchkey_server::model::{Configuration, validate_tls_config};
use latchkey_server::startup::{
    ShutdownSignal, TerminationReason, init_logging, start_grpc_server, wait_for_termination,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let configuration = Configuration::new()?;

    let _logging_guard = init_logging(&configuration.logging_config())?;

    init_metrics();
    if let Some(address) = configuration.metrics_listen_address()? {
        install_prometheus_exporter(address)?;
        info!(address = %address, "metrics-exporter-started");
    }

    let tls_settings = configuration.tls_settings();
    let validation = validate_tls_config(&tls_settings);
    for warning in &validation.warnings {
        warn!(warning = %warning, "tls-configuration");
    }
    if !validation.valid {
        for e in &validation.errors {
            error!(error = %e, "invalid-tls-configuration");
        }
        anyhow::bail!("invalid TLS configuration: {}", validation.errors.join("; "));
    }
    let tls = tls_settings.create_server_tls_config().await?;

    let db: Arc<dyn LockDb> = Arc::new(MemoryLockDb::new());
    let lock_pick = Arc::new(TimerLockPick::new(db.clone()));
    let (exit_tx, mut exit_rx) = mpsc::channel(1);
    let handler = Arc::new(LockHandler::new(db.clone(), lock_pick.clone(), exit_tx));

    let shutdown = ShutdownSignal::new();

    let background = vec![
        tokio::spawn(
            Burglar::new(db.clone(), lock_pick.clone(), configuration.retry_interval())
                .run(shutdown.subscribe()),
        ),
        tokio::spawn(
            MetricsNotifier::new(db.clone(), configuration.metrics_interval())
                .run(shutdown.subscribe()),
        ),
    ];

    let server = start_grpc_server(
        configuration.listen_address()?,
        tls,
        handler,
        shutdown.subscribe(),
    )
    .await?;
    info!(address = %server.local_addr, "latchkey-started");

    let reason = wait_for_termination(&mut exit_rx).await;
    info!(reason = ?reason, "shutting-down");

    shutdown.shutdown();
    lock_pick.shutdown();

    let served = server.join().await;
    for result in futures::future::join_all(background).await {
        if let Err(e) = result {
            warn!(error = %e, "background-task-failed");
        }
    }
    served?;

    if reason == TerminationReason::Unrecoverable {
        anyhow::bail!("stopped after an unrecoverable lock store error");
    }

    info!("latchkey-stopped");
    Ok(())
}
