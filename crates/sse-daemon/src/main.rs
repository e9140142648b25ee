//! # sse-server
//!
//! SSE broadcast server binary. Loads settings, wires logging and metrics,
//! and serves until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sse_server::SseServer;
use sse_settings::SseSettings;

/// Namespace-routed Server-Sent Events broadcast server.
#[derive(Parser, Debug)]
#[command(name = "sse-server", about = "Namespace-routed Server-Sent Events broadcast server")]
struct Cli {
    /// Settings file (defaults to `~/.sse-server/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter when `RUST_LOG` is unset (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Load settings from the chosen file and apply CLI overrides on top.
    fn settings(&self) -> Result<SseSettings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(sse_settings::settings_path);
        let mut settings = sse_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;

        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.settings()?;

    sse_logging::init_subscriber(&settings.logging.level, settings.logging.json);
    let metrics_handle = sse_server::metrics::install_recorder();

    let shutdown_timeout = Duration::from_secs(settings.server.shutdown_timeout_secs);
    let server = SseServer::new(settings, metrics_handle);
    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind server")?;

    tracing::info!("SSE server listening on http://{addr}");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    server
        .graceful_shutdown(vec![handle], Some(shutdown_timeout))
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}
