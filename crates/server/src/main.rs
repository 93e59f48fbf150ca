//! HTTP front end for the scan pipeline.

mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mealscan_vision::{HttpScanPipeline, RunConfig, Secrets};

use crate::routes::{router, AppState};

#[derive(Parser)]
#[command(name = "mealscan-server")]
#[command(about = "Serve receipt and food recognition over HTTP")]
#[command(version)]
struct Args {
    /// Run config (TOML). Defaults to ./mealscan.toml, then the user config dir.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config
    #[arg(long)]
    host: Option<String>,

    /// Listen port, overriding the config
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let args = Args::parse();
    let mut config = RunConfig::discover(args.config.as_deref())
        .await
        .context("Failed to load run config")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let secrets = Secrets::load(&config.secrets_file)
        .await
        .context("Failed to load secrets")?;
    let pipeline = HttpScanPipeline::from_config(&config, &secrets).context("Failed to set up providers")?;

    let state = AppState { scanner: Arc::new(pipeline), output: config.output.clone() };
    let app = router(state, config.server.max_upload_bytes);

    let (host, port) = (config.server.host.as_str(), config.server.port);
    let listener = bind(host, port)
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Bind `host:port`. `host` may be a name (`localhost`) or an IP literal.
async fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind((host, port)).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
