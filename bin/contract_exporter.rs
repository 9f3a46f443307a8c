//! # Contract Exporter Service
//!
//! Long-running service that polls every configured contract and serves the results
//! on a Prometheus `/metrics` endpoint.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin contract_exporter -- --config Config.toml
//! ```
//!
//! Press Ctrl+C to stop gracefully. In-flight ticks finish before the process exits.

use anyhow::{Context, Result};
use clap::Parser;
use contract_metrics_exporter::{metrics, EthersCaller, Exporter, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "contract_exporter", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "Config.toml")]
    config: PathBuf,

    /// Override `metrics.listen_address`
    #[arg(long)]
    metrics_address: Option<String>,
}

fn init_logging() {
    #[cfg(feature = "observability")]
    {
        use tracing_subscriber::EnvFilter;
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }
    #[cfg(not(feature = "observability"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(feature = "observability")]
fn install_metrics_exporter(address: std::net::SocketAddr) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .context("failed to install Prometheus exporter")?;
    info!(%address, "Serving metrics");
    Ok(())
}

#[cfg(not(feature = "observability"))]
fn install_metrics_exporter(address: std::net::SocketAddr) -> Result<()> {
    tracing::warn!(%address, "Built without observability, metrics endpoint disabled");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let args = Args::parse();

    let mut settings = Settings::from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    if let Some(address) = args.metrics_address {
        settings.metrics.listen_address = address;
    }
    let metrics_address = settings.metrics_address()?;

    install_metrics_exporter(metrics_address)?;
    metrics::describe_metrics();
    metrics::record_heartbeat();

    let caller = EthersCaller::connect(&settings.rpc.url)?.with_qps_limit(settings.rpc.qps_limit);
    info!(endpoint = caller.endpoint(), "RPC caller ready");

    let exporter = Exporter::from_settings(&settings, Arc::new(caller))?;
    info!(jobs = ?exporter.job_names(), interval = ?settings.poll_interval(), "Exporter ready");

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(exporter.run(cancel.clone()));

    signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping jobs");
    cancel.cancel();
    handle.await?;

    info!("Shutdown complete");
    Ok(())
}
