//! `brokerd`: the WebSocket message broker binary.

use std::sync::Arc;

use anyhow::Context;
use broker_core::Broker;
use broker_node::cli::Cli;
use broker_node::server;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = ?err, "brokerd exited with an error");
        eprintln!("brokerd: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    PrometheusBuilder::new()
        .install()
        .context("failed to install the Prometheus metrics recorder")?;

    let broker = Arc::new(Broker::with_capacity(cli.identity_capacity));
    let (app, shutdown) = server::build_app(broker);

    let addr = cli.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "brokerd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server loop failed")?;

    tracing::info!("brokerd shut down cleanly");
    Ok(())
}

/// Waits for ctrl-c, then tells every open connection to close with code 1000 before letting
/// `axum::serve` stop accepting new work.
async fn shutdown_signal(shutdown: tokio::sync::broadcast::Sender<()>) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler, shutting down immediately");
    }
    tracing::info!("shutdown requested, closing open connections");
    let _ = shutdown.send(());
}
