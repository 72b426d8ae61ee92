//! Envoy external processing server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                       EXT-PROC                       │
//!                       │                                                      │
//!   Envoy ext_proc      │  ┌──────────┐   ┌───────────┐   ┌────────────────┐   │
//!   ────────────────────┼─▶│   net    │──▶│   grpc    │──▶│   processing   │   │
//!   (one stream per     │  │ listener │   │  server   │   │ stream handler │   │
//!    HTTP transaction)  │  └──────────┘   └───────────┘   └───────┬────────┘   │
//!                       │                                         │            │
//!                       │                         context ◀───────┤            │
//!                       │                                         ▼            │
//!                       │                                 ┌────────────────┐   │
//!   ◀───────────────────┼──────── validated reply ◀───────│ processor chain│   │
//!                       │                                 │  + mutation    │   │
//!                       │                                 └────────────────┘   │
//!                       │                                                      │
//!   curl /headers       │  ┌──────────────┐                                    │
//!   ────────────────────┼─▶│ http (diag.) │                                    │
//!                       │  └──────────────┘                                    │
//!                       │                                                      │
//!                       │  Cross-cutting: config, lifecycle, observability     │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ext_proc::config::{load_config, validate_config, ConfigError, ExtProcConfig};
use ext_proc::lifecycle;
use ext_proc::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "ext-proc")]
#[command(about = "External processing server for Envoy", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `grpc.bind_address`.
    #[arg(long)]
    grpc_address: Option<String>,

    /// Override `diagnostics.bind_address`.
    #[arg(long)]
    diagnostics_address: Option<String>,
}

impl Cli {
    fn load(&self) -> Result<ExtProcConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ExtProcConfig::default(),
        };
        if let Some(addr) = &self.grpc_address {
            config.grpc.bind_address = addr.clone();
        }
        if let Some(addr) = &self.diagnostics_address {
            config.diagnostics.bind_address = addr.clone();
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.load()?;

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ext-proc starting");
    tracing::info!(
        grpc_address = %config.grpc.bind_address,
        diagnostics_enabled = config.diagnostics.enabled,
        metrics_enabled = config.observability.metrics_enabled,
        drain_timeout_secs = config.shutdown.drain_timeout_secs,
        "Configuration loaded"
    );

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
