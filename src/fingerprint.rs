//! Result-path derivation from hyperparameter values.
//!
//! The fingerprint is the on-disk storage key for one hyperparameter point:
//! every swept value (plus the derived meta-iteration count and the fixed
//! noise parameters) is formatted into the directory name at fixed decimal
//! precision. Points that differ in any field beyond that precision map to
//! distinct directories; points that differ only past it collide on disk.
//!
//! The orchestrator never creates these directories; the training
//! entrypoint owns them.

use crate::config::{DpNotion, FixedParams};
use crate::grid::{DerivedParams, HyperparamPoint};

/// Deterministic storage key for one hyperparameter point.
///
/// Precision per field: meta_batch and meta_iters 1 decimal, inner_batch
/// and train_shots 2, max_grad_norm 5, all remaining rates 4.
pub fn fingerprint(
    point: &HyperparamPoint,
    derived: &DerivedParams,
    fixed: &FixedParams,
) -> String {
    format!(
        "meta_batches_{:.1}_meta_iters_{:.1}_inner_batch{:.2}_grad_{:.5}_noise_multiplier_{:.4}_meta_step_{:.4}_meta_step_final_{:.4}_learning_rate_{:.4}_dp_sgd_lr_{:.4}_train_shots{:.2}",
        f64::from(point.meta_batch),
        f64::from(derived.meta_iters),
        f64::from(point.inner_batch),
        point.max_grad_norm,
        fixed.noise_multiplier,
        point.meta_step,
        fixed.meta_step_final,
        point.learning_rate,
        point.dp_sgd_lr,
        f64::from(point.train_shots),
    )
}

/// Directory all seeds of one hyperparameter point report into.
pub fn result_dir(
    root: &str,
    notion: DpNotion,
    point: &HyperparamPoint,
    derived: &DerivedParams,
    fixed: &FixedParams,
) -> String {
    format!(
        "{}/{}/{}",
        root,
        notion.as_str(),
        fingerprint(point, derived, fixed)
    )
}

/// Per-seed result file within a point's result directory.
pub fn result_file(seed: u64) -> String {
    format!("seed_{seed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_point() -> HyperparamPoint {
        HyperparamPoint {
            max_grad_norm: 0.7,
            meta_batch: 50,
            inner_batch: 30,
            meta_step: 1.0,
            learning_rate: 1e-3,
            dp_sgd_lr: 5e-4,
            train_shots: 45,
        }
    }

    fn derived() -> DerivedParams {
        DerivedParams {
            meta_iters: 200,
            eval_interval: 200,
        }
    }

    #[test]
    fn reference_fingerprint_layout() {
        let key = fingerprint(&reference_point(), &derived(), &FixedParams::default());
        assert_eq!(
            key,
            "meta_batches_50.0_meta_iters_200.0_inner_batch30.00_grad_0.70000_\
             noise_multiplier_0.5640_meta_step_1.0000_meta_step_final_0.0000_\
             learning_rate_0.0010_dp_sgd_lr_0.0005_train_shots45.00"
        );
    }

    #[test]
    fn distinct_points_get_distinct_directories() {
        let fixed = FixedParams::default();
        let a = reference_point();
        let mut b = a;
        b.dp_sgd_lr = 6e-4;

        assert_ne!(
            result_dir("./results", DpNotion::ExampleLevel, &a, &derived(), &fixed),
            result_dir("./results", DpNotion::ExampleLevel, &b, &derived(), &fixed),
        );
    }

    #[test]
    fn seeds_share_a_directory_but_not_a_file() {
        let fixed = FixedParams::default();
        let point = reference_point();
        let dir_a = result_dir("./results", DpNotion::ExampleLevel, &point, &derived(), &fixed);
        let dir_b = result_dir("./results", DpNotion::ExampleLevel, &point, &derived(), &fixed);

        assert_eq!(dir_a, dir_b);
        assert_ne!(result_file(0), result_file(1));
        assert_eq!(result_file(8_164_600), "seed_8164600");
    }

    #[test]
    fn notions_do_not_share_directories() {
        let fixed = FixedParams::default();
        let point = reference_point();

        assert_ne!(
            result_dir("./r", DpNotion::ExampleLevel, &point, &derived(), &fixed),
            result_dir("./r", DpNotion::UserLevel, &point, &derived(), &fixed),
        );
    }

    #[test]
    fn collisions_past_the_stated_precision() {
        let fixed = FixedParams::default();
        let a = reference_point();
        let mut b = a;
        // learning_rate is keyed at 4 decimals; a 5th-decimal difference
        // lands in the same directory.
        b.learning_rate = 1e-3 + 1e-5;

        assert_eq!(
            fingerprint(&a, &derived(), &fixed),
            fingerprint(&b, &derived(), &fixed),
        );
    }
}
