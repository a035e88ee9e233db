// crates/fairshare-daemon/src/main.rs
//
// Binary entrypoint for the Fairshare daemon.
//
// Initializes tracing, parses CLI arguments, loads configuration, opens the
// configured store, wires the engines together, and runs the cycle
// scheduler until Ctrl-C (or a single cycle with --once).

mod config;
mod scheduler;
mod shared;

use std::sync::Arc;

use clap::Parser;
use config::DaemonConfig;
use scheduler::CycleScheduler;
use shared::CommunityServices;

use fairshare_core::{AccountStore, Clock, CommunityStore, Month, SystemClock};
use fairshare_store::{MemoryStore, RocksStore};

/// Fairshare daemon: recomputes fairness scores, issues the monthly
/// supply, and resolves closed proposals.
#[derive(Parser, Debug)]
#[command(name = "fairshare-daemon", version = "0.1.0", about = "Fairshare community currency daemon")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "~/.fairshare/config.toml")]
    config: String,

    /// Overrides `data_dir` from the configuration file.
    #[arg(long)]
    data_dir: Option<String>,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Configuration is loaded before tracing so that `log_level` can seed the
    // filter. Load failures are reported once the subscriber is up.
    let (mut daemon_config, load_error) = match DaemonConfig::load(&expand_tilde(&args.config)) {
        Ok(cfg) => (cfg, None),
        Err(e) => (DaemonConfig::default(), Some(e.to_string())),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&daemon_config.log_level)),
        )
        .init();

    match load_error {
        None => tracing::info!("Loaded configuration from {}", args.config),
        Some(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            args.config,
            e
        ),
    }

    if let Some(dir) = args.data_dir {
        daemon_config.data_dir = dir;
    }

    tracing::info!("Fairshare Daemon v0.1.0");
    tracing::info!("Store backend: {}", daemon_config.store);
    tracing::info!("Data directory: {}", daemon_config.data_dir);
    tracing::info!(
        "Transfer fee: {} bps ({})",
        daemon_config.ledger.fee_bps,
        daemon_config.ledger.fee_policy
    );
    tracing::info!(
        "Scheduler interval: {}s",
        daemon_config.scheduler.interval_secs
    );

    let store = open_store(&daemon_config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = CommunityServices::build(&daemon_config, store, clock).await?;
    tracing::info!(
        "{} accounts on record; current issuance month {}",
        services.store.list_accounts().await?.len(),
        Month::of(services.clock.now())
    );

    let mut scheduler = CycleScheduler::new(services.clone(), daemon_config.scheduler.interval_secs);
    if args.once {
        let report = scheduler.run_cycle().await;
        if !report.is_clean() {
            for error in &report.errors {
                tracing::error!("Cycle error: {}", error);
            }
            return Err(format!("cycle finished with {} errors", report.errors.len()).into());
        }
        tracing::info!("Single cycle complete");
        return Ok(());
    }

    scheduler.run().await?;

    tracing::info!(
        "Fairshare daemon shut down after {} cycles (uptime {}s)",
        scheduler.cycles_run(),
        services.start_time.elapsed().as_secs()
    );
    Ok(())
}

/// Open the configured store backend. RocksDB data lives under
/// `{data_dir}/rocksdb`.
fn open_store(config: &DaemonConfig) -> Result<Arc<dyn CommunityStore>, Box<dyn std::error::Error>> {
    match config.store.as_str() {
        "memory" => {
            tracing::warn!("Using in-memory store; state is lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        _ => {
            let data_dir = expand_tilde(&config.data_dir);
            std::fs::create_dir_all(&data_dir)?;
            let db_path = format!("{}/rocksdb", data_dir);
            let store = RocksStore::open(&db_path)?;
            tracing::info!("RocksStore opened at {}", db_path);
            Ok(Arc::new(store))
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
