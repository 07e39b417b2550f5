//! Experiment grid construction.
//!
//! The grid is the full Cartesian product of the per-dimension candidate
//! lists in [`GridSpec`]. Enumeration order is fixed: dimensions iterate in
//! the order they are declared, with the last-listed dimension
//! (`train_shots`) moving fastest, so a grid index always names the same
//! point across runs.

use serde::{Deserialize, Serialize};

use crate::config::{FixedParams, GridSpec};
use crate::error::SweepError;

/// One concrete assignment of values to every swept hyperparameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HyperparamPoint {
    pub max_grad_norm: f64,
    pub meta_batch: u32,
    pub inner_batch: u32,
    pub meta_step: f64,
    pub learning_rate: f64,
    pub dp_sgd_lr: f64,
    pub train_shots: u32,
}

/// Schedule parameters derived from the meta-batch dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedParams {
    pub meta_iters: u32,
    pub eval_interval: u32,
}

impl DerivedParams {
    /// Derive the iteration schedule from the first meta-batch candidate.
    ///
    /// Both divisions truncate toward zero; callers must tolerate the
    /// truncation.
    pub fn from_grid(grid: &GridSpec, fixed: &FixedParams) -> Result<Self, SweepError> {
        let meta_batch = *grid
            .meta_batch
            .first()
            .ok_or(SweepError::EmptyDimension("meta_batch"))?;
        Ok(Self {
            meta_iters: fixed.meta_step_budget / meta_batch,
            eval_interval: fixed.eval_budget / meta_batch / 10,
        })
    }
}

/// Ordered sequence of all hyperparameter points in a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentGrid {
    points: Vec<HyperparamPoint>,
}

impl ExperimentGrid {
    /// Enumerate the full Cartesian product of the candidate lists.
    ///
    /// No filtering or deduplication; the length is always the product of
    /// the per-dimension list lengths.
    pub fn build(spec: &GridSpec) -> Result<Self, SweepError> {
        non_empty("max_grad_norm", &spec.max_grad_norm)?;
        non_empty("meta_batch", &spec.meta_batch)?;
        non_empty("inner_batch", &spec.inner_batch)?;
        non_empty("meta_step", &spec.meta_step)?;
        non_empty("learning_rate", &spec.learning_rate)?;
        non_empty("dp_sgd_lr", &spec.dp_sgd_lr)?;
        non_empty("train_shots", &spec.train_shots)?;

        let mut points = Vec::new();
        for &max_grad_norm in &spec.max_grad_norm {
            for &meta_batch in &spec.meta_batch {
                for &inner_batch in &spec.inner_batch {
                    for &meta_step in &spec.meta_step {
                        for &learning_rate in &spec.learning_rate {
                            for &dp_sgd_lr in &spec.dp_sgd_lr {
                                for &train_shots in &spec.train_shots {
                                    points.push(HyperparamPoint {
                                        max_grad_norm,
                                        meta_batch,
                                        inner_batch,
                                        meta_step,
                                        learning_rate,
                                        dp_sgd_lr,
                                        train_shots,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[HyperparamPoint] {
        &self.points
    }
}

fn non_empty<T>(name: &'static str, values: &[T]) -> Result<(), SweepError> {
    if values.is_empty() {
        Err(SweepError::EmptyDimension(name))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two_spec() -> GridSpec {
        GridSpec {
            max_grad_norm: vec![0.5, 0.7],
            meta_batch: vec![25, 50],
            inner_batch: vec![30],
            meta_step: vec![1.0],
            learning_rate: vec![1e-3],
            dp_sgd_lr: vec![5e-4],
            train_shots: vec![15, 45],
        }
    }

    #[test]
    fn cardinality_is_product_of_dimension_lengths() {
        let grid = ExperimentGrid::build(&two_by_two_spec()).unwrap();
        assert_eq!(grid.len(), 2 * 2 * 2);
    }

    #[test]
    fn last_dimension_iterates_fastest() {
        let grid = ExperimentGrid::build(&two_by_two_spec()).unwrap();
        let points = grid.points();

        assert_eq!(points[0].train_shots, 15);
        assert_eq!(points[1].train_shots, 45);
        // train_shots wraps before meta_batch advances.
        assert_eq!(points[0].meta_batch, points[1].meta_batch);
        assert_eq!(points[2].meta_batch, 50);
        // max_grad_norm is the slowest dimension.
        assert!(points[..4].iter().all(|p| p.max_grad_norm == 0.5));
        assert!(points[4..].iter().all(|p| p.max_grad_norm == 0.7));
    }

    #[test]
    fn enumeration_is_deterministic() {
        let spec = two_by_two_spec();
        let first = ExperimentGrid::build(&spec).unwrap();
        let second = ExperimentGrid::build(&spec).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn reference_grid_has_a_single_point() {
        let grid = ExperimentGrid::build(&GridSpec::default()).unwrap();
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn empty_dimension_is_rejected() {
        let mut spec = two_by_two_spec();
        spec.learning_rate.clear();
        let err = ExperimentGrid::build(&spec).unwrap_err();
        assert!(matches!(err, SweepError::EmptyDimension("learning_rate")));
    }

    #[test]
    fn schedule_derives_from_first_meta_batch_candidate() {
        let spec = GridSpec::default();
        let fixed = FixedParams::default();
        let derived = DerivedParams::from_grid(&spec, &fixed).unwrap();

        assert_eq!(derived.meta_iters, 200); // 10000 / 50
        assert_eq!(derived.eval_interval, 200); // 100000 / 50 / 10

        let spec = GridSpec {
            meta_batch: vec![3],
            ..GridSpec::default()
        };
        let derived = DerivedParams::from_grid(&spec, &fixed).unwrap();
        assert_eq!(derived.meta_iters, 3333); // truncates toward zero
    }
}
