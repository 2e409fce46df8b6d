//! path-proxy
//!
//! A path-encoded forward proxy built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!   GET /foo.com/a?b=1                                       GET https://foo.com/a?b=1
//!   ───────────────┐                                      ┌──────────────────────────▶
//!                  ▼                                      │
//!   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┴─┐
//!   │  http    │─▶│ routing  │─▶│ security │─▶│  transport │
//!   │  server  │  │  target  │  │ headers  │  │  (reqwest) │
//!   └──────────┘  └──────────┘  └──────────┘  └──────────┬─┘
//!        ▲                                               │
//!        │        ┌──────────┐  ┌──────────┐  ┌──────────▼─┐
//!        └────────│ rewrite  │◀─│ security │◀─│  rewrite   │◀────── upstream response
//!                 │  html    │  │ headers  │  │  location  │
//!                 └──────────┘  └──────────┘  └────────────┘
//!
//!   Cross-cutting: config (+ hot reload), observability, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use path_proxy::config::loader::load_config;
use path_proxy::config::validation::validate_config;
use path_proxy::config::watcher::ConfigWatcher;
use path_proxy::config::ProxyConfig;
use path_proxy::http::HttpServer;
use path_proxy::lifecycle::{signals, Shutdown};
use path_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "path-proxy")]
#[command(about = "Path-encoded rewriting HTTP proxy", long_about = None)]
struct Cli {
    /// TOML configuration file. Watched for changes when given.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
        validate_config(&config).map_err(|errors| {
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        })?;
    }

    logging::init_logging(&config.observability)?;
    tracing::info!("path-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        public_scheme = ?config.proxy.public_scheme,
        public_host = ?config.proxy.public_host,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher handle must outlive the server.
    let (config_updates, _watcher) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (updates, Some(watcher.run()?))
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (updates, None)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
