//! DDoS-screening reverse gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                   GATEWAY                      │
//!   Client Request        │  ┌─────────┐   ┌───────────┐   ┌───────────┐  │
//!   ──────────────────────┼─▶│  http   │──▶│ detection │──▶│   load    │  │
//!                         │  │ server  │   │  engine   │   │ balancer  │  │
//!                         │  └────┬────┘   └─────┬─────┘   └─────┬─────┘  │
//!                         │       │ 429/403      │               ▼        │
//!   Client Response       │       │              │         ┌───────────┐  │
//!   ◀─────────────────────┼───────┴──────────────┴─────────│  forward  │◀─┼──── Backend
//!                         │                                └───────────┘  │
//!                         │  ┌──────────────────────────────────────────┐ │
//!                         │  │ health monitor · idle sweeper · admin API │ │
//!                         │  │ metrics · telemetry · lifecycle           │ │
//!                         │  └──────────────────────────────────────────┘ │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ddos_gateway::config::loader;
use ddos_gateway::lifecycle::{signals, Shutdown};
use ddos_gateway::observability::{logging, metrics};
use ddos_gateway::{admin, HttpServer};

#[derive(Parser)]
#[command(name = "ddos-gateway")]
#[command(about = "Reverse gateway that screens traffic for DDoS patterns", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = loader::load(cli.config.as_deref())?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ddos-gateway starting");
    tracing::info!(
        bind_address = %config.gateway.bind_address,
        backends = config.backends.len(),
        window_secs = config.detection.window_size_secs,
        threshold = config.detection.threshold,
        telemetry = config.telemetry.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter");
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let listener = TcpListener::bind(&config.gateway.bind_address).await?;
    let admin_listener = if config.admin.enabled {
        Some(TcpListener::bind(&config.admin.bind_address).await?)
    } else {
        None
    };

    let server = HttpServer::new(config);

    if let Some(admin_listener) = admin_listener {
        let state = server.state().clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = admin::serve(admin_listener, state, shutdown).await {
                tracing::error!(error = %e, "Admin API stopped");
            }
        });
    }

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
