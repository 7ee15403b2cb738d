//! pushgate: push delivery sidecar for a pull-based message broker.
//!
//! Main entry point: loads the configuration named on the command line,
//! initializes logging, and serves the control plane until shutdown.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pushgate_api::Config;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "pushgate", about = "Push delivery sidecar for a pull-based message broker")]
struct Cli {
    /// Path for the required configuration file.
    #[arg(long, default_value = "/etc/pushgate/conf.d/pushgate-config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Could not load configuration file {}", cli.config.display()))?;

    init_tracing(&config);

    info!("starting pushgate");

    pushgate_api::serve(config).await
}

/// Initializes tracing from the configured log level, overridable through
/// `RUST_LOG`.
fn init_tracing(config: &Config) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .expect("Invalid RUST_LOG environment variable");

    let fmt_layer = fmt::layer().with_target(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}
