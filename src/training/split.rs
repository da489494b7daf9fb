//! Seeded train/test split

use crate::error::{ModelHubError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of a train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_rows` with a ChaCha8 stream seeded by `random_state` and hold
/// out the first `ceil(test_size * n_rows)` indices.
///
/// The same seed and row count always give the same split. Both sides must
/// end up non-empty.
pub fn train_test_split(n_rows: usize, test_size: f64, random_state: u64) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ModelHubError::ConfigError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = (test_size * n_rows as f64).ceil() as usize;
    if n_test == 0 || n_test >= n_rows {
        return Err(ModelHubError::ConfigError(format!(
            "cannot split {} row(s) with test_size {}: train and test sets must both be non-empty",
            n_rows, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(random_state);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes_and_disjoint() {
        let split = train_test_split(10, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 2);
        assert_eq!(split.train.len(), 8);

        let all: HashSet<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_split_rounds_test_up() {
        let split = train_test_split(11, 0.2, 0).unwrap();
        assert_eq!(split.test.len(), 3);
    }

    #[test]
    fn test_same_seed_same_split() {
        assert_eq!(train_test_split(50, 0.3, 7).unwrap(), train_test_split(50, 0.3, 7).unwrap());
        assert_ne!(train_test_split(50, 0.3, 7).unwrap(), train_test_split(50, 0.3, 8).unwrap());
    }

    #[test]
    fn test_degenerate_splits_rejected() {
        assert!(train_test_split(1, 0.2, 42).is_err());
        assert!(train_test_split(0, 0.2, 42).is_err());
        assert!(train_test_split(10, 1.0, 42).is_err());
        assert!(train_test_split(10, 0.0, 42).is_err());
    }
}
