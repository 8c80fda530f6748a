//! Seeded row partitioning.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("need at least {needed} rows to split, got {rows}")]
    TooFewRows { rows: usize, needed: usize },
    #[error("k-fold needs at least 2 splits, got {0}")]
    TooFewSplits(usize),
}

/// Shuffle `0..n` with a seeded generator.
pub fn permutation(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    indices
}

/// Split positions `0..n` into `(train, test)`.
///
/// The test side gets `ceil(test_fraction * n)` positions; both sides must be non-empty.
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), SplitError> {
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n < 2 || n_test == 0 || n_test >= n {
        return Err(SplitError::TooFewRows { rows: n, needed: 2 });
    }
    let perm = permutation(n, seed);
    let (test, train) = perm.split_at(n_test);
    Ok((train.to_vec(), test.to_vec()))
}

/// One cross-validation round over positions of the partitioned set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Ascending positions used for fitting.
    pub train: Vec<usize>,
    /// Held-out positions, in shuffled order.
    pub validation: Vec<usize>,
}

/// Shuffled k-fold splitter.
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Folds over `0..n`. The first `n % k` folds hold one extra row.
    pub fn split(&self, n: usize) -> Result<Vec<Fold>, SplitError> {
        let k = self.n_splits;
        if k < 2 {
            return Err(SplitError::TooFewSplits(k));
        }
        if n < k {
            return Err(SplitError::TooFewRows { rows: n, needed: k });
        }
        let perm = permutation(n, self.seed);
        let base = n / k;
        let extra = n % k;
        let mut folds = Vec::with_capacity(k);
        let mut start = 0usize;
        for fold_idx in 0..k {
            let size = base + usize::from(fold_idx < extra);
            let validation = perm[start..start + size].to_vec();
            let mut held_out = vec![false; n];
            for &idx in &validation {
                held_out[idx] = true;
            }
            let train = (0..n).filter(|&idx| !held_out[idx]).collect();
            folds.push(Fold { train, validation });
            start += size;
        }
        Ok(folds)
    }
}
