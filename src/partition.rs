//! balanced (censoring-stratified) fold assignment for nested cross-validation
//!
//! Built once per experiment from a seed and reused for every K candidate and
//! outer fold, so all candidates see identical splits. Serializes to JSON so a
//! re-run can load the exact same folds.

use log::debug;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{KnnSurvivalError, Result};

/// how to carve up a cohort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    pub n_folds: usize,              // cv folds per shuffle
    pub shuffles: usize,             // independent reshuffles of the cv folds
    pub n_outer: usize,              // optimization folds; 0 = no optimization split
    pub optim_valid_fraction: f64,   // share of each optimization set held out for validation
    pub seed: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            n_folds: 3,
            shuffles: 10,
            n_outer: 2,
            optim_valid_fraction: 0.3,
            seed: 0,
        }
    }
}

impl PartitionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    pub fn with_shuffles(mut self, shuffles: usize) -> Self {
        self.shuffles = shuffles;
        self
    }

    pub fn with_outer_folds(mut self, n_outer: usize) -> Self {
        self.n_outer = n_outer;
        self
    }

    pub fn with_optim_valid_fraction(mut self, fraction: f64) -> Self {
        self.optim_valid_fraction = fraction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_folds < 2 {
            return Err(KnnSurvivalError::invalid_parameter("n_folds", self.n_folds.to_string()));
        }
        if self.shuffles == 0 {
            return Err(KnnSurvivalError::invalid_parameter("shuffles", "0"));
        }
        if self.n_outer == 1 {
            return Err(KnnSurvivalError::invalid_parameter("n_outer", "1"));
        }
        if !(0.0..1.0).contains(&self.optim_valid_fraction) {
            return Err(KnnSurvivalError::invalid_parameter(
                "optim_valid_fraction",
                self.optim_valid_fraction.to_string(),
            ));
        }
        Ok(())
    }
}

/// fold indices for every outer fold.
///
/// `fold_cv_train[o][f]` / `fold_cv_test[o][f]` index into the full cohort;
/// there are `n_folds * shuffles` cv folds per outer fold, drawn from the
/// cohort minus `idx_optim[o]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldPartition {
    pub idx_optim: Vec<Vec<usize>>,
    pub idx_optim_train: Vec<Vec<usize>>,
    pub idx_optim_valid: Vec<Vec<usize>>,
    pub fold_cv_train: Vec<Vec<Vec<usize>>>,
    pub fold_cv_test: Vec<Vec<Vec<usize>>>,
}

impl FoldPartition {
    /// stratified split keeping the censored/observed mix about equal in every fold
    pub fn balanced(censored: &[bool], config: &PartitionConfig) -> Result<Self> {
        config.validate()?;

        let n = censored.len();
        if n == 0 {
            return Err(KnnSurvivalError::invalid_input("can't partition an empty cohort"));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let all: Vec<usize> = (0..n).collect();

        let outer: Vec<(Vec<usize>, Vec<usize>)> = if config.n_outer == 0 {
            vec![(all.clone(), all)]
        } else {
            if n < config.n_outer {
                return Err(KnnSurvivalError::invalid_parameter("n_outer", config.n_outer.to_string()));
            }
            stratified_chunks(&all, censored, config.n_outer, &mut rng)
                .into_iter()
                .map(|optim| {
                    let eval = complement(&all, &optim, n);
                    (optim, eval)
                })
                .collect()
        };

        let mut partition = Self {
            idx_optim: Vec::with_capacity(outer.len()),
            idx_optim_train: Vec::with_capacity(outer.len()),
            idx_optim_valid: Vec::with_capacity(outer.len()),
            fold_cv_train: Vec::with_capacity(outer.len()),
            fold_cv_test: Vec::with_capacity(outer.len()),
        };

        for (optim, eval) in outer {
            if eval.len() < config.n_folds {
                return Err(KnnSurvivalError::invalid_parameter(
                    "n_folds",
                    format!("{} (only {} subjects to split)", config.n_folds, eval.len()),
                ));
            }

            let (optim_train, optim_valid) =
                stratified_holdout(&optim, censored, config.optim_valid_fraction, &mut rng);

            let mut train_folds = Vec::with_capacity(config.n_folds * config.shuffles);
            let mut test_folds = Vec::with_capacity(config.n_folds * config.shuffles);
            for _ in 0..config.shuffles {
                for test in stratified_chunks(&eval, censored, config.n_folds, &mut rng) {
                    train_folds.push(complement(&eval, &test, n));
                    test_folds.push(test);
                }
            }

            partition.idx_optim.push(optim);
            partition.idx_optim_train.push(optim_train);
            partition.idx_optim_valid.push(optim_valid);
            partition.fold_cv_train.push(train_folds);
            partition.fold_cv_test.push(test_folds);
        }

        debug!(
            "built partition: {} outer folds x {} cv folds over {} subjects",
            partition.n_outer(),
            config.n_folds * config.shuffles,
            n
        );

        Ok(partition)
    }

    pub fn n_outer(&self) -> usize {
        self.idx_optim.len()
    }

    /// cv folds available under outer fold `outer`
    pub fn n_folds(&self, outer: usize) -> usize {
        self.fold_cv_test.get(outer).map_or(0, Vec::len)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let partition: Self = serde_json::from_str(json)?;
        partition.validate()?;
        Ok(partition)
    }

    /// every per-outer-fold list must have one entry per outer fold, and each
    /// outer fold needs as many cv train folds as cv test folds
    pub fn validate(&self) -> Result<()> {
        let n_outer = self.idx_optim.len();
        for (name, len) in [
            ("idx_optim_train", self.idx_optim_train.len()),
            ("idx_optim_valid", self.idx_optim_valid.len()),
            ("fold_cv_train", self.fold_cv_train.len()),
            ("fold_cv_test", self.fold_cv_test.len()),
        ] {
            if len != n_outer {
                return Err(KnnSurvivalError::invalid_parameter(
                    name,
                    format!("{} outer folds (idx_optim has {})", len, n_outer),
                ));
            }
        }

        for (o, (train, test)) in self.fold_cv_train.iter().zip(self.fold_cv_test.iter()).enumerate() {
            if train.len() != test.len() {
                return Err(KnnSurvivalError::invalid_parameter(
                    "fold_cv_train",
                    format!("{} train folds vs {} test folds in outer fold {}", train.len(), test.len(), o),
                ));
            }
        }
        Ok(())
    }
}

/// shuffle each stratum and deal them round-robin into `k` chunks
fn stratified_chunks(indices: &[usize], censored: &[bool], k: usize, rng: &mut StdRng) -> Vec<Vec<usize>> {
    let (mut observed, mut cens): (Vec<usize>, Vec<usize>) =
        indices.iter().copied().partition(|&i| !censored[i]);
    observed.shuffle(rng);
    cens.shuffle(rng);

    let mut chunks = vec![Vec::with_capacity(indices.len() / k + 1); k];
    for (slot, idx) in observed.into_iter().chain(cens).enumerate() {
        chunks[slot % k].push(idx);
    }
    for chunk in chunks.iter_mut() {
        chunk.sort_unstable();
    }
    chunks
}

/// hold out `fraction` of each stratum, returns (kept, held_out)
fn stratified_holdout(indices: &[usize], censored: &[bool], fraction: f64, rng: &mut StdRng) -> (Vec<usize>, Vec<usize>) {
    let mut kept = Vec::with_capacity(indices.len());
    let mut held_out = Vec::new();

    for want_censored in [false, true] {
        let mut stratum: Vec<usize> = indices.iter().copied().filter(|&i| censored[i] == want_censored).collect();
        stratum.shuffle(rng);
        let n_out = (stratum.len() as f64 * fraction).round() as usize;
        held_out.extend_from_slice(&stratum[..n_out]);
        kept.extend_from_slice(&stratum[n_out..]);
    }

    kept.sort_unstable();
    held_out.sort_unstable();
    (kept, held_out)
}

fn complement(indices: &[usize], remove: &[usize], n: usize) -> Vec<usize> {
    let mut drop = vec![false; n];
    for &i in remove {
        drop[i] = true;
    }
    indices.iter().copied().filter(|&i| !drop[i]).collect()
}
