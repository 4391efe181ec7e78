//! Seeded train/test partitioning

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::Dataset;
use crate::error::{LearnError, LearnResult};

/// Fraction of rows held out for evaluation
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Seed used for the shuffle
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Shuffled row indices for each partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Number of held-out rows: `ceil(test_size * n)`
pub fn test_count(n: usize, test_size: f64) -> usize {
    (test_size * n as f64).ceil() as usize
}

/// Shuffle `0..n` with `seed` and cut off the test partition
pub fn split_indices(n: usize, test_size: f64, seed: u64) -> LearnResult<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(LearnError::SplitTooSmall { rows: n, test_size });
    }
    let n_test = test_count(n, test_size);
    if n_test == 0 || n_test >= n {
        return Err(LearnError::SplitTooSmall { rows: n, test_size });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Split a dataset into `(train, test)`
pub fn train_test_split(
    dataset: &Dataset,
    test_size: f64,
    seed: u64,
) -> LearnResult<(Dataset, Dataset)> {
    let indices = split_indices(dataset.n_rows(), test_size, seed)?;
    Ok((dataset.subset(&indices.train), dataset.subset(&indices.test)))
}
