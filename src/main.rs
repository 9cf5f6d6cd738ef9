//! vedran-daemon - node metrics sidecar
//!
//! Samples the local node's metrics endpoint on a fixed interval and PUTs
//! the snapshot to the load balancer.
//!
//! # Usage
//! ```sh
//! LB_URL=https://lb.example.com LB_TOKEN=... vedran-daemon --interval 60
//! ```
//!
//! # Environment Variables
//! - `ENV` - Selects `config-$ENV.toml`; `test` disables crash reporting
//! - `STATS_INTERVAL` - Seconds between reports (default: 3600)
//! - `LB_URL` / `LB_TOKEN` - Load balancer base URL and node token
//! - `NODE_METRICS_URL` - Node Prometheus endpoint (default: http://localhost:9615/metrics)
//! - `LOG_LEVEL` - Log filter when RUST_LOG is unset (default: error)
//! - `SENTRY_DSN` - Enables crash reporting

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use vedran_daemon::application::system::Application;
use vedran_daemon::config::Settings;
use vedran_daemon::infrastructure::observability::{error_reporter_from, flush_before_exit};

#[derive(Parser)]
#[command(author, version, about = "Reports local node metrics to the load balancer", long_about = None)]
struct Cli {
    /// TOML config file (default: config.toml, or config-$ENV.toml when ENV is set)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between reports, overrides STATS_INTERVAL
    #[arg(short, long)]
    interval: Option<u64>,

    /// Load balancer base URL, overrides LB_URL
    #[arg(long)]
    lb_url: Option<String>,

    /// Log filter such as "info" or "vedran_daemon=debug", overrides LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single cycle and exit with its result
    #[arg(long)]
    once: bool,
}

impl Cli {
    /// Flags expressed as the environment keys they override.
    fn overrides(&self) -> HashMap<&'static str, String> {
        let mut overrides = HashMap::new();
        if let Some(interval) = self.interval {
            overrides.insert("STATS_INTERVAL", interval.to_string());
        }
        if let Some(url) = &self.lb_url {
            overrides.insert("LB_URL", url.clone());
        }
        if let Some(level) = &self.log_level {
            overrides.insert("LOG_LEVEL", level.clone());
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let overrides = cli.overrides();
    let lookup = |key: &str| {
        overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    };

    let settings =
        Settings::load(cli.config.as_deref(), &lookup).context("Failed to load configuration")?;

    // Setup logging (stdout only)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.observability.log_level))
        .context("Invalid log level")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    info!("vedran-daemon {} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {:?}", settings.lb);

    let errors = error_reporter_from(&settings.observability)?;
    let app = match Application::build(&settings, errors.clone()) {
        Ok(app) => app,
        Err(e) => {
            flush_before_exit(errors.as_ref());
            return Err(e);
        }
    };

    if cli.once {
        return app.run_once().await.map(|_| ()).map_err(anyhow::Error::from);
    }

    let handle = app.start();
    info!("Reporter running. Press Ctrl+C to shutdown.");
    handle.run_until(shutdown_signal()).await
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate =
            signal(SignalKind::terminate()).context("Unable to listen for SIGTERM")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Unable to listen for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Unable to listen for Ctrl+C")?;
    }

    Ok(())
}
