//! Payment gateway (v1)
//!
//! Accepts `PAYMENT|<amount>` lines over TCP and answers each with a
//! `RESPONSE|...` line.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌────────────────────────────────────────────────┐
//!                 │                 PAYMENT GATEWAY                 │
//!   Client        │  ┌──────────┐   ┌──────────┐   ┌────────────┐  │
//!   ──────────────┼─▶│ listener │──▶│ session  │──▶│ processor  │  │
//!   ◀─────────────┼──│ + server │◀──│ (1/conn) │◀──│ (thread)   │  │
//!                 │  └────▲─────┘   └────▲─────┘   └────────────┘  │
//!                 │       │ stop         │ grace deadline          │
//!                 │  ┌────┴──────────────┴─────┐  ┌────────────┐   │
//!                 │  │  lifecycle::Shutdown    │◀─│  signals   │   │
//!                 │  └─────────────────────────┘  └────────────┘   │
//!                 └────────────────────────────────────────────────┘
//! ```
//!
//! On SIGINT/SIGTERM the listener closes at once, in-flight requests get
//! until the grace deadline to finish, and the process exits once every
//! connection has closed.

use clap::Parser;
use std::path::PathBuf;

use payment_gateway::config::{self, GatewayConfig, LogFormat};
use payment_gateway::lifecycle::{signals, Shutdown};
use payment_gateway::observability::{logging, metrics};
use payment_gateway::Server;

#[derive(Parser)]
#[command(name = "payment-gateway")]
#[command(about = "Line-oriented TCP payment gateway with graceful shutdown", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Grace period for in-flight requests in milliseconds.
    #[arg(short, long)]
    grace_period_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, config: &mut GatewayConfig) {
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(grace) = self.grace_period_ms {
            config.shutdown.grace_period_ms = grace;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if self.json_logs {
            config.observability.log_format = LogFormat::Json;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => GatewayConfig::default(),
    };
    cli.apply(&mut config);
    if let Err(errors) = config::validation::validate_config(&config) {
        return Err(config::ConfigError::Validation(errors).into());
    }

    logging::init_logging(&config.observability)?;

    tracing::info!("payment-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        grace_period_ms = config.shutdown.grace_period_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation guarantees this parses.
        let addr = config.observability.metrics_address.parse()?;
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(error = %e, "Failed to start metrics endpoint");
        }
    }

    let shutdown = Shutdown::new();
    signals::trigger_on_signal(shutdown.clone());

    let server = Server::new(config);
    server.start(shutdown.signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
