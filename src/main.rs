//! Blockchain balance exporter.
//!
//! Startup order: logging, config (fatal on any violation, before the port is
//! bound), telemetry, poller, listener. Shutdown stops the listener first and
//! then the poller within a bounded grace period.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use balance_exporter::blockchain::RpcClientFactory;
use balance_exporter::config::ConfigLoader;
use balance_exporter::http::{AppContext, AuthGate, HttpServer};
use balance_exporter::lifecycle::shutdown_signal;
use balance_exporter::observability::{logging, metrics};
use balance_exporter::{BalancePoller, BalanceRegistry};

#[derive(Parser, Debug)]
#[command(name = "balance-exporter")]
#[command(about = "Exports blockchain account balances as Prometheus metrics", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, env = "BALANCE_EXPORTER_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Address to serve /metrics on.
    #[arg(short, long, env = "BALANCE_EXPORTER_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Log filter directive; overrides RUST_LOG.
    #[arg(long)]
    log_filter: Option<String>,

    #[arg(long, value_enum, default_value_t = logging::LogFormat::Text)]
    log_format: logging::LogFormat,

    /// Seconds to wait for the poller to stop on shutdown.
    #[arg(long, default_value_t = 5)]
    shutdown_grace_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_filter.as_deref(), cli.log_format)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "balance-exporter starting");

    let config = match ConfigLoader::new().load(&cli.config) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(path = %cli.config.display(), error = %e, "Error loading or validating config file");
            for violation in e.violations() {
                tracing::error!(field = %violation.path, "{}", violation.message);
            }
            return Err(e.into());
        }
    };

    tracing::info!(
        networks = config.networks.len(),
        addresses = config.addresses.len(),
        update_interval_secs = config.update_interval_seconds,
        rpc_timeout_secs = config.rpc_timeout_seconds,
        "Configuration loaded"
    );

    let telemetry = match metrics::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Exporter self-metrics disabled");
            None
        }
    };

    let registry = BalanceRegistry::new();
    let poller = Arc::new(BalancePoller::new(
        config.clone(),
        registry.clone(),
        Arc::new(RpcClientFactory),
    ));
    let poller_handle = poller.start(Duration::from_secs(config.update_interval_seconds));

    let mut context = AppContext::new(registry, AuthGate::new(config.static_bearer_token.as_deref()));
    if let Some(handle) = telemetry {
        context = context.with_telemetry(handle);
    }

    let listener = match TcpListener::bind(&cli.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %cli.listen, error = %e, "Failed to bind listener");
            poller_handle.stop(Duration::from_secs(cli.shutdown_grace_secs)).await;
            return Err(e.into());
        }
    };

    let served = HttpServer::new(context).run(listener, shutdown_signal()).await;
    poller_handle.stop(Duration::from_secs(cli.shutdown_grace_secs)).await;
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
