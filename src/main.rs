//! Link-rewriting web proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request   ┌──────────┐    ┌───────────┐    ┌──────────────┐
//!     ────────────────▶│  http    │───▶│  routing  │───▶│ http::proxy  │──────▶ Upstream
//!     /https/host/path │  server  │    │  codec    │    │ + headers    │        https://host/path
//!                      └──────────┘    └───────────┘    └──────┬───────┘
//!                                                              │
//!     Client Response  ┌──────────┐    ┌───────────┐           │
//!     ◀────────────────│ rewrite  │◀───│   media   │◀──────────┘
//!                      │ engine   │    │  dispatch │  (pass-through for non-HTML)
//!                      └──────────┘    └───────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rewrite_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use rewrite_proxy::lifecycle::{signals, Shutdown};
use rewrite_proxy::observability::logging;
use rewrite_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "rewrite-proxy")]
#[command(about = "Web proxy that keeps every link inside the proxy", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn load(cli: &Cli) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init(&config.observability);

    tracing::info!("rewrite-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        max_document_bytes = config.limits.max_document_bytes,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    HttpServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
