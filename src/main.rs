//! Drive relay
//!
//! Sits in front of a cloud drive and decides, per file, how the bytes
//! reach the client.
//!
//! ```text
//!                         ┌────────────────────────────────────────────┐
//!                         │                 DRIVE RELAY                │
//!   Client Request        │  ┌────────┐   ┌──────────┐   ┌──────────┐  │
//!   ──────────────────────┼─▶│  http  │──▶│ resolve  │──▶│  relay   │──┼──▶ Storage
//!                         │  │ server │   │ (files)  │   │ selector │  │    (download URL)
//!                         │  └───┬────┘   └──────────┘   └────┬─────┘  │
//!                         │      │ cache hit                  │        │
//!                         │      ▼                            ▼        │
//!                         │  ┌────────┐                ┌───────────┐   │
//!   Client Response       │  │ store  │◀───────────────│   cache   │   │
//!   ◀─────────────────────┼──│ memory │                │  manager  │   │
//!                         │  └────────┘                └───────────┘   │
//!                         │                                            │
//!                         │  config (watch) · auth (token) · lifecycle │
//!                         └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use drive_relay::config::{load_config, watcher::ConfigWatcher, ConfigError, RelayConfig};
use drive_relay::lifecycle::{spawn_signal_listener, Shutdown};
use drive_relay::observability::{logging, metrics};
use drive_relay::HttpServer;

#[derive(Parser)]
#[command(name = "drive-relay")]
#[command(about = "Cloud drive file relay with tiered caching", long_about = None)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,

    /// Reload the configuration file when it changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config, missing_file) = match load_config(&cli.config) {
        Ok(config) => (config, false),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => (RelayConfig::default(), true),
        Err(e) => {
            eprintln!("drive-relay: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "drive-relay starting");
    if missing_file {
        tracing::warn!(path = ?cli.config, "Config file not found, using defaults");
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        base = %config.base,
        files = config.files.len(),
        cache_enabled = config.cache.enable,
        cache_paths = ?config.cache.paths,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    spawn_signal_listener(Arc::clone(&shutdown));

    // The watcher stops when dropped, so it lives until main returns.
    let (_watcher, config_updates) = if cli.watch && !missing_file {
        let (watcher, updates) = ConfigWatcher::new(&cli.config);
        (Some(watcher.run()?), updates)
    } else {
        let (_tx, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
