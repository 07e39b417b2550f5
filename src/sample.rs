//! Seeded subset selection over the experiment grid.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::SweepError;

/// Draw `count` distinct indices from `[0, population)` without replacement.
///
/// The selection is a pure function of the seed: the same seed, population,
/// and count always produce the identical index set. No ordering of the
/// returned indices is guaranteed beyond that determinism.
pub fn sample_indices(
    population: usize,
    count: usize,
    seed: u64,
) -> Result<Vec<usize>, SweepError> {
    if count > population {
        return Err(SweepError::InvalidSampleSize {
            requested: count,
            available: population,
        });
    }
    let mut rng = StdRng::seed_from_u64(seed);
    Ok(rand::seq::index::sample(&mut rng, population, count).into_vec())
}
