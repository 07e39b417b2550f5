//! Subprocess construction and launch.
//!
//! A [`RunConfig`] is the fully resolved flag set for one training
//! subprocess: one hyperparameter point, one seed, and the derived result
//! paths. The [`Launcher`] turns run configs into OS processes and hands
//! them to the supervisor without waiting on them.

use tokio::process::{Child, Command};
use tracing::info;

use crate::config::{DpNotion, SweepConfig};
use crate::error::SweepError;
use crate::fingerprint::{result_dir, result_file};
use crate::grid::{DerivedParams, HyperparamPoint};
use crate::supervise::Cohort;

/// Fully resolved flag set for one training subprocess.
///
/// Immutable once resolved; its lifetime is exactly one subprocess
/// invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub dp_notion: DpNotion,
    pub max_grad_norm: f64,
    pub noise_multiplier: f64,
    pub meta_batch: u32,
    pub meta_iters: u32,
    pub meta_step: f64,
    pub meta_step_final: f64,
    pub classes: u32,
    pub shots: u32,
    pub train_shots: u32,
    pub inner_batch: u32,
    pub inner_iters: u32,
    pub learning_rate: f64,
    pub eval_batch: u32,
    pub eval_iters: u32,
    pub eval_samples: u32,
    pub eval_interval: u32,
    pub seed: u64,
    pub result_dir: String,
    pub result_file: String,
    pub dp_sgd_lr: f64,
    pub transductive: bool,
    pub sgd: bool,
}

impl RunConfig {
    /// Resolve one (hyperparameter point, seed) pair against the sweep
    /// configuration.
    pub fn resolve(
        config: &SweepConfig,
        point: &HyperparamPoint,
        derived: &DerivedParams,
        seed: u64,
    ) -> Self {
        Self {
            dp_notion: config.dp_notion,
            max_grad_norm: point.max_grad_norm,
            noise_multiplier: config.fixed.noise_multiplier,
            meta_batch: point.meta_batch,
            meta_iters: derived.meta_iters,
            meta_step: point.meta_step,
            meta_step_final: config.fixed.meta_step_final,
            classes: config.fixed.classes,
            shots: config.fixed.shots,
            train_shots: point.train_shots,
            inner_batch: point.inner_batch,
            inner_iters: config.fixed.inner_iters,
            learning_rate: point.learning_rate,
            eval_batch: config.fixed.eval_batch,
            eval_iters: config.fixed.eval_iters,
            eval_samples: config.fixed.eval_samples,
            eval_interval: derived.eval_interval,
            seed,
            result_dir: result_dir(
                &config.result_root,
                config.dp_notion,
                point,
                derived,
                &config.fixed,
            ),
            result_file: result_file(seed),
            dp_sgd_lr: point.dp_sgd_lr,
            transductive: config.fixed.transductive,
            sgd: config.fixed.sgd,
        }
    }

    /// Serialize into `--flag value` pairs for the training entrypoint.
    ///
    /// Boolean flags are bare and present only when set.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--dp-notion".to_string(),
            self.dp_notion.as_str().to_string(),
            "--max-grad-norm".to_string(),
            self.max_grad_norm.to_string(),
            "--noise-multiplier".to_string(),
            self.noise_multiplier.to_string(),
            "--meta-batch".to_string(),
            self.meta_batch.to_string(),
            "--meta-iters".to_string(),
            self.meta_iters.to_string(),
            "--meta-step".to_string(),
            self.meta_step.to_string(),
            "--meta-step-final".to_string(),
            self.meta_step_final.to_string(),
            "--classes".to_string(),
            self.classes.to_string(),
            "--shots".to_string(),
            self.shots.to_string(),
            "--train-shots".to_string(),
            self.train_shots.to_string(),
            "--inner-batch".to_string(),
            self.inner_batch.to_string(),
            "--inner-iters".to_string(),
            self.inner_iters.to_string(),
            "--learning-rate".to_string(),
            self.learning_rate.to_string(),
            "--eval-batch".to_string(),
            self.eval_batch.to_string(),
            "--eval-iters".to_string(),
            self.eval_iters.to_string(),
            "--eval-samples".to_string(),
            self.eval_samples.to_string(),
            "--eval-interval".to_string(),
            self.eval_interval.to_string(),
            "--seed".to_string(),
            self.seed.to_string(),
            "--result-dir".to_string(),
            self.result_dir.clone(),
            "--result-file".to_string(),
            self.result_file.clone(),
            "--dp-sgd-lr".to_string(),
            self.dp_sgd_lr.to_string(),
        ];
        if self.transductive {
            args.push("--transductive".to_string());
        }
        if self.sgd {
            args.push("--sgd".to_string());
        }
        args
    }
}

/// Spawns one training subprocess per seed for a hyperparameter point.
pub struct Launcher {
    program: String,
    leading_args: Vec<String>,
}

impl Launcher {
    pub fn new(program: impl Into<String>, leading_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    pub fn from_config(config: &SweepConfig) -> Self {
        Self::new(config.interpreter.clone(), vec![config.entrypoint()])
    }

    /// Full command line for one run, for dry runs and logging.
    pub fn command_line(&self, run: &RunConfig) -> Vec<String> {
        let mut line = Vec::with_capacity(1 + self.leading_args.len());
        line.push(self.program.clone());
        line.extend(self.leading_args.iter().cloned());
        line.extend(run.to_args());
        line
    }

    /// Start one subprocess per run config; does not wait for completion.
    ///
    /// A spawn failure aborts the whole cohort: returning a short cohort
    /// would break the one-process-per-seed invariant the supervisor
    /// depends on.
    pub fn spawn_cohort(&self, runs: &[RunConfig]) -> Result<Cohort<Child>, SweepError> {
        let mut members = Vec::with_capacity(runs.len());
        for (i, run) in runs.iter().enumerate() {
            let child = Command::new(&self.program)
                .args(&self.leading_args)
                .args(run.to_args())
                .spawn()
                .map_err(|source| SweepError::Launch {
                    command: self.program.clone(),
                    source,
                })?;
            info!("process {i} initiated (seed {})", run.seed);
            members.push(child);
        }
        Ok(Cohort::new(members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixedParams;
    use std::collections::HashMap;

    fn reference_run() -> RunConfig {
        let config = SweepConfig::default();
        let point = HyperparamPoint {
            max_grad_norm: 0.7,
            meta_batch: 50,
            inner_batch: 30,
            meta_step: 1.0,
            learning_rate: 1e-3,
            dp_sgd_lr: 5e-4,
            train_shots: 45,
        };
        let derived = DerivedParams::from_grid(&config.grid, &config.fixed).unwrap();
        RunConfig::resolve(&config, &point, &derived, 8_164_600)
    }

    /// Split an argument list back into `flag -> value` pairs plus the set
    /// of bare flags, the way the training entrypoint's parser sees them.
    fn reparse(args: &[String]) -> (HashMap<String, String>, Vec<String>) {
        let mut pairs = HashMap::new();
        let mut bare = Vec::new();
        let mut iter = args.iter().peekable();
        while let Some(flag) = iter.next() {
            assert!(flag.starts_with("--"), "unexpected operand: {flag}");
            match iter.peek() {
                Some(next) if !next.starts_with("--") => {
                    pairs.insert(flag.clone(), iter.next().unwrap().clone());
                }
                _ => bare.push(flag.clone()),
            }
        }
        (pairs, bare)
    }

    #[test]
    fn flag_serialization_round_trips() {
        let run = reference_run();
        let (pairs, bare) = reparse(&run.to_args());

        assert_eq!(pairs["--dp-notion"], "example_level");
        assert_eq!(pairs["--max-grad-norm"].parse::<f64>().unwrap(), 0.7);
        assert_eq!(pairs["--noise-multiplier"].parse::<f64>().unwrap(), 0.564);
        assert_eq!(pairs["--meta-batch"].parse::<u32>().unwrap(), 50);
        assert_eq!(pairs["--meta-iters"].parse::<u32>().unwrap(), 200);
        assert_eq!(pairs["--meta-step"].parse::<f64>().unwrap(), 1.0);
        assert_eq!(pairs["--meta-step-final"].parse::<f64>().unwrap(), 0.0);
        assert_eq!(pairs["--classes"].parse::<u32>().unwrap(), 5);
        assert_eq!(pairs["--shots"].parse::<u32>().unwrap(), 5);
        assert_eq!(pairs["--train-shots"].parse::<u32>().unwrap(), 45);
        assert_eq!(pairs["--inner-batch"].parse::<u32>().unwrap(), 30);
        assert_eq!(pairs["--inner-iters"].parse::<u32>().unwrap(), 8);
        assert_eq!(pairs["--learning-rate"].parse::<f64>().unwrap(), 1e-3);
        assert_eq!(pairs["--eval-batch"].parse::<u32>().unwrap(), 15);
        assert_eq!(pairs["--eval-iters"].parse::<u32>().unwrap(), 50);
        assert_eq!(pairs["--eval-samples"].parse::<u32>().unwrap(), 1000);
        assert_eq!(pairs["--eval-interval"].parse::<u32>().unwrap(), 200);
        assert_eq!(pairs["--seed"].parse::<u64>().unwrap(), 8_164_600);
        assert_eq!(pairs["--result-dir"], run.result_dir);
        assert_eq!(pairs["--result-file"], "seed_8164600");
        assert_eq!(pairs["--dp-sgd-lr"].parse::<f64>().unwrap(), 5e-4);
        assert_eq!(bare, vec!["--transductive".to_string()]);
    }

    #[test]
    fn boolean_flags_present_iff_true() {
        let mut run = reference_run();
        run.transductive = false;
        run.sgd = true;

        let (_, bare) = reparse(&run.to_args());
        assert_eq!(bare, vec!["--sgd".to_string()]);

        run.sgd = false;
        let (_, bare) = reparse(&run.to_args());
        assert!(bare.is_empty());
    }

    #[test]
    fn result_paths_embed_every_swept_value() {
        let run = reference_run();
        assert!(run
            .result_dir
            .starts_with("./results/mini_imagenet/hyper_search/5_shot_5_way/example_level/"));
        assert!(run.result_dir.contains("grad_0.70000"));
        assert!(run.result_dir.contains("train_shots45.00"));
    }

    #[test]
    fn fixed_params_flow_through_unchanged() {
        let run = reference_run();
        let fixed = FixedParams::default();
        assert_eq!(run.noise_multiplier, fixed.noise_multiplier);
        assert_eq!(run.inner_iters, fixed.inner_iters);
        assert_eq!(run.eval_samples, fixed.eval_samples);
    }

    #[tokio::test]
    async fn missing_entrypoint_is_a_launch_error() {
        let launcher = Launcher::new("/nonexistent/training-entrypoint", Vec::new());
        let err = launcher.spawn_cohort(&[reference_run()]).unwrap_err();
        assert!(matches!(err, SweepError::Launch { .. }));
    }

    #[test]
    fn command_line_starts_with_interpreter_and_script() {
        let config = SweepConfig::default();
        let launcher = Launcher::from_config(&config);
        let line = launcher.command_line(&reference_run());

        assert_eq!(line[0], "python3");
        assert_eq!(line[1], "run_miniimagenet_example_level.py");
        assert_eq!(line[2], "--dp-notion");
    }
}
