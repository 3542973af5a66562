//! Fold generation for cross-validation
//!
//! A [`Splitter`] turns a row count into `K` disjoint test partitions whose
//! union covers every row, with the complement of each partition as its
//! training set. `K` is derived from the held-out fraction (`K =
//! round(1/fraction)`) or given directly.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChemflowError, Result};

/// How rows are assigned to test partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitMethod {
    /// Interleaved assignment: fold `i` holds rows `i, i+K, i+2K, ...`.
    /// Suited to data ordered along a gradient.
    Systematic,
    /// Consecutive blocks of rows. Suited to data grouped in batches.
    Contiguous,
    /// Blocks of a seeded random permutation of the rows.
    Random,
}

/// One train/test partition of the visible rows. Positions are relative to
/// the matrix being split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    pub train_rows: Vec<usize>,
    pub test_rows: Vec<usize>,
}

/// Fold-generation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Splitter {
    method: SplitMethod,
    n_splits: usize,
    seed: Option<u64>,
}

impl Splitter {
    /// Derive the fold count from a held-out fraction: `K = round(1/f)`.
    pub fn from_fraction(method: SplitMethod, fraction: f64) -> Result<Self> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(ChemflowError::ConfigError(format!(
                "held-out fraction must be in (0, 1), got {fraction}"
            )));
        }
        let n_splits = (1.0 / fraction).round() as usize;
        Self::with_n_splits(method, n_splits)
    }

    pub fn with_n_splits(method: SplitMethod, n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(ChemflowError::ConfigError(format!(
                "cross-validation needs at least 2 folds, got {n_splits}"
            )));
        }
        Ok(Self { method, n_splits, seed: None })
    }

    /// Fix the seed of the random method for reproducible folds.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn method(&self) -> SplitMethod {
        self.method
    }

    /// Partition `n_rows` rows into `n_splits` folds.
    pub fn split(&self, n_rows: usize) -> Result<Vec<Fold>> {
        if self.n_splits > n_rows {
            return Err(ChemflowError::ConfigError(format!(
                "cannot split {n_rows} rows into {} folds",
                self.n_splits
            )));
        }
        debug!(method = ?self.method, n_splits = self.n_splits, n_rows, "generating folds");

        let test_sets = match self.method {
            SplitMethod::Systematic => self.systematic(n_rows),
            SplitMethod::Contiguous => blocks((0..n_rows).collect(), self.n_splits),
            SplitMethod::Random => {
                let mut order: Vec<usize> = (0..n_rows).collect();
                let mut rng = match self.seed {
                    Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                    None => ChaCha8Rng::from_entropy(),
                };
                order.shuffle(&mut rng);
                let mut sets = blocks(order, self.n_splits);
                for set in &mut sets {
                    set.sort_unstable();
                }
                sets
            }
        };

        Ok(test_sets
            .into_iter()
            .enumerate()
            .map(|(index, test_rows)| {
                let train_rows = complement(&test_rows, n_rows);
                Fold { index, train_rows, test_rows }
            })
            .collect())
    }

    fn systematic(&self, n_rows: usize) -> Vec<Vec<usize>> {
        (0..self.n_splits)
            .map(|i| (i..n_rows).step_by(self.n_splits).collect())
            .collect()
    }
}

/// Split `items` into `k` consecutive blocks. The first `len % k` blocks
/// receive one extra element, so block sizes differ by at most one.
fn blocks(items: Vec<usize>, k: usize) -> Vec<Vec<usize>> {
    let base = items.len() / k;
    let remainder = items.len() % k;
    let mut out = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let size = base + usize::from(i < remainder);
        out.push(items[start..start + size].to_vec());
        start += size;
    }
    out
}

/// Ascending positions in `0..n` absent from the sorted-or-not `test` set.
fn complement(test: &[usize], n: usize) -> Vec<usize> {
    let mut held_out = vec![false; n];
    for &row in test {
        held_out[row] = true;
    }
    (0..n).filter(|&row| !held_out[row]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_rounds_to_fold_count() {
        let splitter = Splitter::from_fraction(SplitMethod::Systematic, 0.25).unwrap();
        assert_eq!(splitter.n_splits(), 4);
        let splitter = Splitter::from_fraction(SplitMethod::Systematic, 0.1).unwrap();
        assert_eq!(splitter.n_splits(), 10);
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        assert!(Splitter::from_fraction(SplitMethod::Systematic, 0.0).is_err());
        assert!(Splitter::from_fraction(SplitMethod::Systematic, 1.0).is_err());
        assert!(Splitter::from_fraction(SplitMethod::Systematic, -0.2).is_err());
        // 0.9 rounds to a single fold
        assert!(Splitter::from_fraction(SplitMethod::Systematic, 0.9).is_err());
    }

    #[test]
    fn test_more_folds_than_rows_rejected() {
        let splitter = Splitter::with_n_splits(SplitMethod::Contiguous, 5).unwrap();
        assert!(splitter.split(4).is_err());
    }

    #[test]
    fn test_systematic_interleaves() {
        let splitter = Splitter::with_n_splits(SplitMethod::Systematic, 4).unwrap();
        let folds = splitter.split(12).unwrap();
        assert_eq!(folds[0].test_rows, vec![0, 4, 8]);
        assert_eq!(folds[1].test_rows, vec![1, 5, 9]);
        assert_eq!(folds[3].test_rows, vec![3, 7, 11]);
        assert_eq!(folds[0].train_rows.len(), 9);
        assert!(!folds[0].train_rows.contains(&4));
    }

    #[test]
    fn test_contiguous_block_sizes() {
        let splitter = Splitter::with_n_splits(SplitMethod::Contiguous, 3).unwrap();
        let folds = splitter.split(10).unwrap();
        // 10 rows over 3 folds: the first fold takes the extra row
        assert_eq!(folds[0].test_rows, vec![0, 1, 2, 3]);
        assert_eq!(folds[1].test_rows, vec![4, 5, 6]);
        assert_eq!(folds[2].test_rows, vec![7, 8, 9]);
    }

    #[test]
    fn test_folds_cover_all_rows_disjointly() {
        for method in [SplitMethod::Systematic, SplitMethod::Contiguous, SplitMethod::Random] {
            let splitter = Splitter::with_n_splits(method, 4).unwrap().with_seed(7);
            let folds = splitter.split(11).unwrap();
            let mut seen = vec![0usize; 11];
            for fold in &folds {
                for &row in &fold.test_rows {
                    seen[row] += 1;
                }
                // Train and test partition the rows
                assert_eq!(fold.train_rows.len() + fold.test_rows.len(), 11);
            }
            assert!(seen.iter().all(|&count| count == 1), "{method:?}");
        }
    }

    #[test]
    fn test_random_is_seed_reproducible() {
        let a = Splitter::with_n_splits(SplitMethod::Random, 3)
            .unwrap()
            .with_seed(42)
            .split(9)
            .unwrap();
        let b = Splitter::with_n_splits(SplitMethod::Random, 3)
            .unwrap()
            .with_seed(42)
            .split(9)
            .unwrap();
        assert_eq!(a, b);

        let c = Splitter::with_n_splits(SplitMethod::Random, 3)
            .unwrap()
            .with_seed(43)
            .split(9)
            .unwrap();
        assert_ne!(a, c);
    }
}
