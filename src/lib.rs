//! dp-reptile - hyperparameter sweep orchestration for differentially-private
//! Reptile few-shot learning.
//!
//! The orchestrator builds the Cartesian product of the swept hyperparameter
//! dimensions, samples a seeded subset of points to bound experiment cost,
//! launches one training subprocess per (point, seed) pair, and supervises
//! each cohort with fixed-interval non-blocking polling. Training itself is
//! an external entrypoint invoked purely by contract: a flag list in, an
//! exit status out.
//!
//! Entry point: [`sweep::run_sweep`] with a [`config::SweepConfig`].

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod grid;
pub mod launch;
pub mod sample;
pub mod supervise;
pub mod sweep;

pub use config::{DpNotion, FixedParams, GridSpec, SweepConfig};
pub use error::SweepError;
pub use grid::{DerivedParams, ExperimentGrid, HyperparamPoint};
pub use launch::{Launcher, RunConfig};
pub use supervise::{Cohort, CohortOutcome, ProcessProbe, RunState, Supervisor};
pub use sweep::{run_sweep, CohortReport, SweepResult};
