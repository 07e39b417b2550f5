//! Sweep driver: sample grid points and run their cohorts sequentially.

use tracing::{error, info};

use crate::config::SweepConfig;
use crate::error::SweepError;
use crate::grid::{DerivedParams, ExperimentGrid, HyperparamPoint};
use crate::launch::{Launcher, RunConfig};
use crate::sample::sample_indices;
use crate::supervise::{CohortOutcome, Supervisor};

/// Outcome of one cohort within a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohortReport {
    /// Index of the point within the full experiment grid.
    pub grid_index: usize,
    pub point: HyperparamPoint,
    pub outcome: CohortOutcome,
}

/// Aggregate result of one sweep invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub grid_size: usize,
    /// Grid indices selected for this sweep, in launch order.
    pub sampled: Vec<usize>,
    /// One report per cohort actually launched and supervised.
    pub cohorts: Vec<CohortReport>,
}

impl SweepResult {
    /// True when every launched cohort completed cleanly.
    pub fn all_completed(&self) -> bool {
        self.cohorts.iter().all(|c| c.outcome.is_success())
    }
}

/// Run the full sweep described by `config`.
///
/// Builds the experiment grid, samples the configured number of points, and
/// drives one cohort per sampled point. Cohorts run sequentially; within a
/// cohort the per-seed subprocesses run in parallel at the OS level. With
/// `abort_on_failure` set (the default), the first failed cohort stops the
/// remaining sweep.
pub async fn run_sweep(config: &SweepConfig) -> Result<SweepResult, SweepError> {
    if config.seeds.is_empty() {
        return Err(SweepError::NoSeeds);
    }

    let grid = ExperimentGrid::build(&config.grid)?;
    let derived = DerivedParams::from_grid(&config.grid, &config.fixed)?;
    let sampled = sample_indices(grid.len(), config.choices, config.sample_seed)?;
    info!(
        "sampled {} of {} grid points (sample seed {})",
        sampled.len(),
        grid.len(),
        config.sample_seed
    );

    let launcher = Launcher::from_config(config);
    let supervisor = Supervisor::new(config.poll_interval(), config.abort_on_failure);
    let mut cohorts = Vec::with_capacity(sampled.len());

    for &grid_index in &sampled {
        let point = grid.points()[grid_index];
        let runs: Vec<RunConfig> = config
            .seeds
            .iter()
            .map(|&seed| RunConfig::resolve(config, &point, &derived, seed))
            .collect();

        if config.dry_run {
            for run in &runs {
                info!("dry run: {}", launcher.command_line(run).join(" "));
            }
            continue;
        }

        info!(
            "launching cohort for grid point {grid_index} across {} seed(s)",
            runs.len()
        );
        let mut cohort = launcher.spawn_cohort(&runs)?;
        let outcome = supervisor.run(&mut cohort).await;
        cohorts.push(CohortReport {
            grid_index,
            point,
            outcome,
        });

        match outcome {
            CohortOutcome::Completed => info!("cohort for grid point {grid_index} done"),
            CohortOutcome::Failed { member, code } => {
                error!(
                    "cohort for grid point {grid_index} failed (process {member}, status {code:?})"
                );
                if config.abort_on_failure {
                    error!("stopping sweep after cohort failure");
                    break;
                }
            }
        }
    }

    Ok(SweepResult {
        grid_size: grid.len(),
        sampled,
        cohorts,
    })
}
