//! API gateway binary.
//!
//! The front door for the retail services: every inbound request passes
//! origin validation → rate limiting → routing → forwarding, with the
//! health endpoint served directly.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_gateway::config::{load_config, GatewayConfig};
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;
use api_gateway::observability::metrics;

#[derive(Debug, Parser)]
#[command(name = "api-gateway", about = "Front-door dispatcher for backend services")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Fail fast: a config that cannot be loaded and validated must never
    // turn into a half-configured gateway.
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: cannot load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    tracing::info!(
        config = %cli.config.display(),
        services = config.services.len(),
        environment = ?config.environment,
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

    let listener = match TcpListener::bind(&config.listener.bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(
                bind_address = %config.listener.bind_address,
                error = %e,
                "Failed to bind listener"
            );
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    let server = match HttpServer::new(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build server");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.run(listener, shutdown.subscribe()).await {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

fn init_tracing(config: &GatewayConfig) {
    let default_filter = format!(
        "api_gateway={level},tower_http={level}",
        level = config.observability.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
