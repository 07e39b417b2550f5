//! Error taxonomy for the sweep orchestrator.

use thiserror::Error;

/// Errors raised while preparing or launching a sweep.
///
/// Configuration errors (`InvalidSampleSize`, `EmptyDimension`, `NoSeeds`)
/// surface before any subprocess is spawned and are fatal to the whole
/// sweep. `Launch` is fatal to the cohort being started; bookkeeping for
/// cohorts that already finished is untouched.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Requested more grid points than the grid contains.
    #[error("cannot sample {requested} experiments from a grid of {available}")]
    InvalidSampleSize { requested: usize, available: usize },

    /// A hyperparameter dimension has no candidate values.
    #[error("hyperparameter dimension `{0}` has no candidate values")]
    EmptyDimension(&'static str),

    /// The seed list is empty, so no cohort could be formed.
    #[error("no training seeds configured")]
    NoSeeds,

    /// The training entrypoint could not be started.
    #[error("failed to launch `{command}`")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
