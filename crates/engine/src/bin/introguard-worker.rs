//! introguard-worker — periodic compliance sweep driver.
//!
//! Loads policy from the environment, rebuilds each tenant's introduced
//! cache on startup, then runs the escalation sweep on a fixed interval.
//!
//! Ships with the log-only console platform; a real chat adapter plugs
//! in by constructing the [`Engine`] with its own `Platform` impl.

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use introguard_core::config::{load_dotenv, Config};
use introguard_engine::{ConsolePlatform, Engine, EngineError};
use introguard_store::TenantStore;

// ── CLI ─────────────────────────────────────────────────────────────

/// Introduction-compliance sweep worker.
#[derive(Parser, Debug)]
#[command(name = "introguard-worker", version, about)]
struct Cli {
    /// Data directory holding per-tenant records.
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: String,

    /// Sweep interval in minutes (overrides SWEEP_INTERVAL_MINUTES).
    #[arg(long)]
    sweep_interval: Option<u64>,

    /// Run exactly one sweep and exit.
    #[arg(long, default_value_t = false)]
    once: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(minutes) = cli.sweep_interval {
        config.policy.sweep_interval_minutes = minutes;
    }
    config.log_summary();

    let store = TenantStore::open(&cli.data_dir)?;
    let mut engine = Engine::new(store, Arc::new(ConsolePlatform), config.policy.clone());

    // Startup reconciliation: replay intro-channel history for every
    // tenant that has one configured.
    for tenant in engine.known_tenants() {
        match engine.rebuild_introduced_cache(tenant).await {
            Ok(summary) => info!(
                tenant,
                scanned = summary.scanned,
                introduced = summary.introduced_total,
                "startup cache rebuild"
            ),
            Err(EngineError::NoIntroChannel(_)) => {
                info!(tenant, "intro channel not set, skipping startup scan");
            }
            Err(e) => warn!(tenant, error = %e, "startup cache rebuild failed"),
        }
    }

    let period = std::time::Duration::from_secs(config.policy.sweep_interval_minutes * 60);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(interval_min = config.policy.sweep_interval_minutes, "sweep loop starting");
    loop {
        ticker.tick().await;
        let summary = engine.run_sweep(Utc::now()).await;
        if cli.once {
            info!(?summary, "single sweep done, exiting");
            break;
        }
    }

    Ok(())
}
