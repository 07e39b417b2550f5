//! Sweep configuration schema and loading.
//!
//! A [`SweepConfig`] fully describes one sweep invocation: the candidate
//! lists for every swept hyperparameter, the fixed training parameters, the
//! seeds to fan out over, and the supervision policy. Configs are plain TOML
//! files; every field has a default so partial files work, and
//! `SweepConfig::default()` is the reference `initial_tuning` preset.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Seed used when the CLI does not supply one.
pub const DEFAULT_TRAIN_SEED: u64 = 8_164_600;

/// Which notion of differential privacy the training runs account under.
///
/// The notion selects the training entrypoint script and the result-path
/// segment; the orchestrator itself treats both identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DpNotion {
    #[default]
    ExampleLevel,
    UserLevel,
}

impl DpNotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExampleLevel => "example_level",
            Self::UserLevel => "user_level",
        }
    }

    /// Training entrypoint script used when the config does not override it.
    pub fn default_entrypoint(&self) -> &'static str {
        match self {
            Self::ExampleLevel => "run_miniimagenet_example_level.py",
            Self::UserLevel => "run_miniimagenet_user_level.py",
        }
    }
}

impl fmt::Display for DpNotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate value lists for the seven swept hyperparameter dimensions.
///
/// Dimension order matters: the experiment grid enumerates the Cartesian
/// product with the last-listed dimension iterating fastest, and sampled
/// grid indices are only reproducible against the same ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub max_grad_norm: Vec<f64>,
    pub meta_batch: Vec<u32>,
    pub inner_batch: Vec<u32>,
    pub meta_step: Vec<f64>,
    pub learning_rate: Vec<f64>,
    pub dp_sgd_lr: Vec<f64>,
    pub train_shots: Vec<u32>,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            max_grad_norm: vec![0.7],
            meta_batch: vec![50],
            inner_batch: vec![30],
            meta_step: vec![1.0],
            learning_rate: vec![1e-3],
            dp_sgd_lr: vec![5e-4],
            train_shots: vec![45],
        }
    }
}

/// Training parameters that stay constant across the whole sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedParams {
    pub noise_multiplier: f64,
    pub classes: u32,
    pub shots: u32,
    pub meta_step_final: f64,
    pub inner_iters: u32,
    pub eval_batch: u32,
    pub eval_iters: u32,
    pub eval_samples: u32,
    /// Total meta-step budget; divided by the meta-batch size to obtain the
    /// per-run meta-iteration count.
    pub meta_step_budget: u32,
    /// Evaluation budget; divided by the meta-batch size (and a constant 10)
    /// to obtain the eval interval.
    pub eval_budget: u32,
    pub transductive: bool,
    pub sgd: bool,
}

impl Default for FixedParams {
    fn default() -> Self {
        Self {
            noise_multiplier: 0.564,
            classes: 5,
            shots: 5,
            meta_step_final: 0.0,
            inner_iters: 8,
            eval_batch: 15,
            eval_iters: 50,
            eval_samples: 1000,
            meta_step_budget: 10_000,
            eval_budget: 100_000,
            transductive: true,
            sgd: false,
        }
    }
}

/// Everything one sweep invocation needs, with no process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub dp_notion: DpNotion,
    /// Interpreter the training entrypoint is run under.
    pub interpreter: String,
    /// Training entrypoint script; defaults to the per-notion script.
    pub entrypoint: Option<String>,
    /// Seeds fanned out into one subprocess each per hyperparameter point.
    pub seeds: Vec<u64>,
    /// Seed for subsampling the experiment grid.
    pub sample_seed: u64,
    /// Number of grid points to actually run.
    pub choices: usize,
    /// Wall-clock pause between supervisor polls.
    pub poll_interval_secs: u64,
    /// Stop tracking a cohort on its first failure, and stop the sweep after
    /// a failed cohort.
    pub abort_on_failure: bool,
    /// Root under which per-point result directories are derived.
    pub result_root: String,
    /// Log planned commands instead of spawning them.
    pub dry_run: bool,
    pub grid: GridSpec,
    pub fixed: FixedParams,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self::initial_tuning()
    }
}

impl SweepConfig {
    /// The reference `initial_tuning` search preset.
    pub fn initial_tuning() -> Self {
        Self {
            dp_notion: DpNotion::ExampleLevel,
            interpreter: "python3".to_string(),
            entrypoint: None,
            seeds: vec![DEFAULT_TRAIN_SEED],
            sample_seed: 234,
            choices: 2,
            poll_interval_secs: 60,
            abort_on_failure: true,
            result_root: "./results/mini_imagenet/hyper_search/5_shot_5_way".to_string(),
            dry_run: false,
            grid: GridSpec::default(),
            fixed: FixedParams::default(),
        }
    }

    /// Load a sweep config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read sweep config from {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse sweep config from {}", path.display()))?;
        Ok(config)
    }

    /// Resolved training entrypoint script.
    pub fn entrypoint(&self) -> String {
        self.entrypoint
            .clone()
            .unwrap_or_else(|| self.dp_notion.default_entrypoint().to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
