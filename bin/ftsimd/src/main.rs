//! ---
//! ftsim_section: "01-core-functionality"
//! ftsim_subsection: "binary"
//! ftsim_type: "source"
//! ftsim_scope: "code"
//! ftsim_description: "Binary entrypoint for the FTSIM daemon."
//! ftsim_version: "v0.1.0"
//! ftsim_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ftsim_common::config::{AppConfig, PublisherKind};
use ftsim_common::logging::init_tracing;
use ftsim_core::BatchScheduler;
use ftsim_publish::{
    CredentialStore, DirectoryCredentialStore, JsonlPublisher, NullPublisher, TelemetryPublisher,
};
use ftsim_sim::EnergyLedger;
use tokio::signal;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "FTSIM daemon",
    long_about = "Simulates a fleet of factory sites and publishes aggregated telemetry events."
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Override the sampler random seed")]
    seed: Option<u64>,

    #[arg(long, value_name = "N", help = "Exit after N cycles instead of running until cancelled")]
    cycles: Option<u64>,

    #[arg(long, help = "Print the effective configuration and exit")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.dev.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    let config_path = loaded.source;

    if let Some(seed) = cli.seed {
        config.sampler.random_seed = seed;
    }
    if let Some(cycles) = cli.cycles {
        config.scheduler.max_cycles = Some(cycles);
    }

    if cli.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    init_tracing("ftsimd", &config.logging)?;
    info!(config_path = %config_path.display(), "configuration loaded");

    let credentials: Arc<dyn CredentialStore> =
        Arc::new(DirectoryCredentialStore::new(&config.credentials.root_dir));
    let publisher: Arc<dyn TelemetryPublisher> = match config.publisher.kind {
        PublisherKind::Jsonl => Arc::new(JsonlPublisher::new(&config.publisher.sink_dir)?),
        PublisherKind::Null => Arc::new(NullPublisher),
    };
    let ledger = Arc::new(EnergyLedger::new(config.energy.scope));

    let mut handle = BatchScheduler::new(config, ledger, credentials, publisher).start();

    info!("daemon running; waiting for termination signal");
    let finished = tokio::select! {
        _ = signal::ctrl_c() => false,
        result = handle.wait() => {
            result?;
            true
        }
    };

    if finished {
        info!("scheduler completed its cycle limit");
    } else {
        info!("ctrl-c received; shutting down");
        handle.shutdown().await?;
    }

    Ok(())
}
