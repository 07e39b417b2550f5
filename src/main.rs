//! dp-reptile sweep CLI.
//!
//! Resolves a sweep configuration (TOML file or the built-in initial-tuning
//! preset), then hands it to the sweep driver. Exits nonzero when the sweep
//! stops on a failed cohort.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dp_reptile::config::SweepConfig;
use dp_reptile::sweep::run_sweep;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "dp-reptile")]
#[command(about = "Hyperparameter sweeps for differentially-private Reptile few-shot learning")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Training seed; replaces the configured seed list
    seed: Option<u64>,

    /// Sweep configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Print the planned training commands without launching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mut config = match &args.config {
        Some(path) => SweepConfig::load(path)?,
        None => SweepConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seeds = vec![seed];
    }
    if args.dry_run {
        config.dry_run = true;
    }

    tracing::info!(
        "dp-reptile v{} starting {} sweep",
        env!("CARGO_PKG_VERSION"),
        config.dp_notion
    );

    let result = run_sweep(&config).await?;
    if result.all_completed() {
        tracing::info!(
            "done with experiments: {} cohort(s) completed",
            result.cohorts.len()
        );
        Ok(())
    } else {
        tracing::error!("sweep stopped after a cohort failure");
        std::process::exit(1);
    }
}

fn init_tracing(log_level: &str) {
    let level = match log_level {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("dp_reptile={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
