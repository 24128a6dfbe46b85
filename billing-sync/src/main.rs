//! billing-sync: reconcile recent subscriptions against the gateway.
//!
//! Meant to be run from cron:
//!
//! ```text
//! */15 * * * * billing-sync --config /etc/billing/gateway.toml \
//!     --store /var/lib/billing/store.json --window 3h
//! ```
//!
//! Exits non-zero when the run cannot start (bad configuration, unreadable
//! store) and, with `--fail-on-skipped`, when any profile was skipped.

#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest"
)]

mod observability;

use std::{path::PathBuf, process::ExitCode};

use billing_gateway::{
    GatewayClient, GatewayConfig,
    store::FileStore,
    sync::{SyncEngine, SyncReport},
};
use clap::Parser;
use tracing::{error, info, warn};

use crate::observability::{LogFormat, init_observability};

/// Pull gateway transaction history and record unseen transactions.
#[derive(Debug, Parser)]
#[command(name = "billing-sync", version, about)]
struct Cli {
    /// Gateway configuration file (TOML).
    #[arg(short, long, env = "BILLING_CONFIG")]
    config: Option<PathBuf>,

    /// JSON store holding profiles and recorded transactions.
    #[arg(short, long, env = "BILLING_STORE", default_value = "billing-store.json")]
    store: PathBuf,

    /// Lookback window: `<N>m`, `<N>h` or `<N>d`. Malformed values mean one hour.
    #[arg(short, long, default_value = "1h")]
    window: String,

    /// Log format; defaults to the `LOG_FORMAT` environment variable.
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Exit with a failure status if any profile was skipped.
    #[arg(long)]
    fail_on_skipped: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_observability(cli.log_format.unwrap_or_else(LogFormat::from_env));

    match run(&cli).await {
        Ok(report) if cli.fail_on_skipped && report.profiles_skipped > 0 => {
            warn!(
                profiles_skipped = report.profiles_skipped,
                "sync finished with skipped profiles"
            );
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "sync run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> billing_gateway::Result<SyncReport> {
    let config = match &cli.config {
        Some(path) => GatewayConfig::from_file(path)?,
        None => GatewayConfig::default(),
    }
    .with_env_overrides();

    let client = GatewayClient::new(&config)?;
    info!(
        environment = %config.environment,
        demo = client.is_demo(),
        store = %cli.store.display(),
        "starting billing sync"
    );

    let store = FileStore::open(&cli.store).await?;
    SyncEngine::new(client, store).sync(Some(cli.window.as_str())).await
}
