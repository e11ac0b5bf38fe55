//! runnerscaled — the runner fleet autoscaler daemon.
//!
//! Assembles the subsystems into one process:
//! - Fleet store (PeerTube PostgreSQL, read-only)
//! - Reconciler (decide + scale commands, fixed interval)
//! - Fleet gauges + `/metrics` endpoint
//!
//! # Usage
//!
//! ```text
//! runnerscaled --host db --up ./runner-up.sh --down ./runner-down.sh \
//!     --min-runners 1 --max-runners 5 --reconcile 5m
//! ```

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use runnerscale_autoscale::{CommandExecutor, Reconciler};
use runnerscale_metrics::FleetGauges;
use runnerscale_state::PgFleetStore;

use crate::config::{Cli, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);
    run(cli).await
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,sqlx=warn,runnerscale=debug")
    });
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Arc::new(cli.scaling_config().context("invalid configuration")?);

    // ── Fleet store ────────────────────────────────────────────

    info!(host = %cli.host, port = cli.port, db = %cli.dbname, "connecting to database");
    let store = PgFleetStore::connect(cli.connect_options())
        .await
        .context("couldn't establish database connection")?;

    // ── Reconciler ─────────────────────────────────────────────

    let gauges = FleetGauges::new();
    let executor = CommandExecutor::new(Arc::clone(&config));
    let reconciler = Reconciler::new(store.clone(), executor, Arc::clone(&config), gauges.clone());

    if config.command_timeout.is_none() {
        info!("scale commands run without a timeout");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interval = cli.reconcile;
    let reconcile_handle = tokio::spawn(async move {
        reconciler.run(interval, shutdown_rx).await;
    });

    // ── Metrics server ─────────────────────────────────────────

    let listener = tokio::net::TcpListener::bind(cli.listen_address)
        .await
        .with_context(|| format!("can't expose metrics on {}", cli.listen_address))?;
    info!(addr = %cli.listen_address, "starting prometheus metrics");

    let router = runnerscale_api::build_router(gauges);
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let served = server.await.context("metrics server failed");

    // Wait for the in-flight cycle to finish.
    let _ = reconcile_handle.await;
    store.close().await;

    info!("runnerscaled stopped");
    served
}
