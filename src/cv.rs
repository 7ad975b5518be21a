//! K selection and accuracy estimation by (nested) cross-validation

use log::{debug, info, warn};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    data::SurvivalData,
    error::{KnnSurvivalError, Result},
    metrics::{median, CIndexSummary},
    model::{predict, TestLabels},
    neighbors::rank_neighbors,
    partition::{FoldPartition, PartitionConfig},
};

/// what to do with a fold whose C-index is undefined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailedFoldPolicy {
    /// abort the whole call with `NoComparablePairs`
    #[default]
    Propagate,
    /// record the fold as `None` and leave it out of the median
    Exclude,
}

/// settings for tuning K on an optimization set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuneConfig {
    pub n_folds: usize,                 // cv folds
    pub shuffles: usize,                // reshuffles of the cv folds
    pub ks: Vec<usize>,                 // candidate neighbour counts, in preference order
    pub seed: u64,                      // fold assignment seed
    pub failed_folds: FailedFoldPolicy,
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            shuffles: 1,
            ks: (10..=150).step_by(10).collect(),
            seed: 0,
            failed_folds: FailedFoldPolicy::Propagate,
        }
    }
}

impl TuneConfig {
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

    pub fn with_ks(mut self, ks: Vec<usize>) -> Self {
        self.ks = ks;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_failed_folds(mut self, policy: FailedFoldPolicy) -> Self {
        self.failed_folds = policy;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.ks.is_empty() {
            return Err(KnnSurvivalError::invalid_parameter("ks", "[]"));
        }
        if self.ks.contains(&0) {
            return Err(KnnSurvivalError::invalid_parameter("ks", format!("{:?} (k must be >= 1)", self.ks)));
        }
        Ok(())
    }

    fn partition_config(&self) -> PartitionConfig {
        PartitionConfig::new()
            .with_folds(self.n_folds)
            .with_shuffles(self.shuffles)
            .with_outer_folds(0)
            .with_optim_valid_fraction(0.0)
            .with_seed(self.seed)
    }
}

/// per-fold, per-K scores from `cv_tune` and the chosen K
#[derive(Debug, Clone, PartialEq)]
pub struct TuneResult {
    pub ks: Vec<usize>,
    /// `c_indices[fold][k_idx]`; `None` = fold excluded
    pub c_indices: Vec<Vec<Option<f64>>>,
    /// median over folds for each candidate
    pub median_c_index: Vec<Option<f64>>,
    pub k_optim: usize,
    pub c_index_optim: f64,
}

/// outcome of `cv_accuracy` for one outer fold
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyResult {
    pub outer_fold: usize,
    pub k_optim: usize,
    /// one entry per cv fold; `None` = fold excluded
    pub c_indices: Vec<Option<f64>>,
    pub tuning: TuneResult,
}

impl AccuracyResult {
    pub fn summary(&self) -> Result<CIndexSummary> {
        CIndexSummary::from_folds(&self.c_indices)
    }
}

/// pick K on an optimization set by cross-validation.
///
/// Neighbour rankings are computed once per fold and sliced for every
/// candidate. The winner maximizes the median C-index over folds; ties go to
/// the earlier candidate in `config.ks`.
pub fn cv_tune(data: &SurvivalData, config: &TuneConfig) -> Result<TuneResult> {
    config.validate()?;

    let partition = FoldPartition::balanced(data.censored(), &config.partition_config())?;
    let folds: Vec<(&[usize], &[usize])> = partition.fold_cv_train[0]
        .iter()
        .zip(partition.fold_cv_test[0].iter())
        .map(|(train, test)| (train.as_slice(), test.as_slice()))
        .collect();

    info!("tuning k over {} candidates on {} folds", config.ks.len(), folds.len());

    #[cfg(feature = "parallel")]
    let c_indices: Vec<Vec<Option<f64>>> = folds
        .par_iter()
        .map(|&(train, test)| score_fold(data, train, test, &config.ks, config.failed_folds))
        .collect::<Result<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let c_indices: Vec<Vec<Option<f64>>> = folds
        .iter()
        .map(|&(train, test)| score_fold(data, train, test, &config.ks, config.failed_folds))
        .collect::<Result<_>>()?;

    for (fold, scores) in c_indices.iter().enumerate() {
        for (&k, score) in config.ks.iter().zip(scores) {
            match score {
                Some(c) => debug!("fold {} k {} c-index {:.3}", fold, k, c),
                None => debug!("fold {} k {} excluded", fold, k),
            }
        }
    }

    let median_c_index = (0..config.ks.len())
        .map(|k_idx| {
            let column: Vec<f64> = c_indices.iter().filter_map(|fold| fold[k_idx]).collect();
            if column.is_empty() { Ok(None) } else { median(&column).map(Some) }
        })
        .collect::<Result<Vec<_>>>()?;

    // first occurrence wins on ties
    let mut best: Option<(usize, f64)> = None;
    for (k_idx, score) in median_c_index.iter().enumerate() {
        if let Some(c) = *score {
            if best.map_or(true, |(_, best_c)| c > best_c) {
                best = Some((k_idx, c));
            }
        }
    }
    let (best_idx, c_index_optim) = best.ok_or(KnnSurvivalError::NoComparablePairs)?;
    let k_optim = config.ks[best_idx];

    info!("optimal k = {}, median c-index = {:.3}", k_optim, c_index_optim);

    Ok(TuneResult {
        ks: config.ks.clone(),
        c_indices,
        median_c_index,
        k_optim,
        c_index_optim,
    })
}

/// accuracy of knn on outer fold `outer_fold` of a precomputed partition.
///
/// K is tuned with `cv_tune` on `partition.idx_optim[outer_fold]`, then held
/// fixed while scoring every cv fold of that outer fold.
pub fn cv_accuracy(
    data: &SurvivalData,
    partition: &FoldPartition,
    outer_fold: usize,
    config: &TuneConfig,
) -> Result<AccuracyResult> {
    partition.validate()?;
    if outer_fold >= partition.n_outer() {
        return Err(KnnSurvivalError::invalid_parameter(
            "outer_fold",
            format!("{} (partition has {} outer folds)", outer_fold, partition.n_outer()),
        ));
    }

    info!("optimizing k for outer fold {}", outer_fold);
    let optim = data.subset(&partition.idx_optim[outer_fold])?;
    let tuning = cv_tune(&optim, config)?;
    let k = [tuning.k_optim];

    let folds: Vec<(&[usize], &[usize])> = partition.fold_cv_train[outer_fold]
        .iter()
        .zip(partition.fold_cv_test[outer_fold].iter())
        .map(|(train, test)| (train.as_slice(), test.as_slice()))
        .collect();

    #[cfg(feature = "parallel")]
    let scores: Vec<Vec<Option<f64>>> = folds
        .par_iter()
        .map(|&(train, test)| score_fold(data, train, test, &k, config.failed_folds))
        .collect::<Result<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let scores: Vec<Vec<Option<f64>>> = folds
        .iter()
        .map(|&(train, test)| score_fold(data, train, test, &k, config.failed_folds))
        .collect::<Result<_>>()?;

    let c_indices: Vec<Option<f64>> = scores.into_iter().map(|fold| fold[0]).collect();
    for (fold, score) in c_indices.iter().enumerate() {
        match score {
            Some(c) => info!("outer fold {} fold {} c-index {:.3}", outer_fold, fold, c),
            None => info!("outer fold {} fold {} excluded", outer_fold, fold),
        }
    }

    Ok(AccuracyResult {
        outer_fold,
        k_optim: tuning.k_optim,
        c_indices,
        tuning,
    })
}

/// C-index of every candidate K on one train/test split
fn score_fold(
    data: &SurvivalData,
    train_idx: &[usize],
    test_idx: &[usize],
    ks: &[usize],
    policy: FailedFoldPolicy,
) -> Result<Vec<Option<f64>>> {
    let train = data.subset(train_idx)?;
    let test = data.subset(test_idx)?;
    let ranking = rank_neighbors(test.features(), train.features())?;
    let labels = TestLabels {
        times: test.times(),
        censored: test.censored(),
    };

    ks.iter()
        .map(|&k| {
            match predict(ranking.view(), train.times(), train.censored(), k, Some(labels)) {
                Ok(prediction) => Ok(prediction.c_index),
                Err(KnnSurvivalError::NoComparablePairs) if policy == FailedFoldPolicy::Exclude => {
                    warn!("fold with {} test subjects has no comparable pairs, excluding it", test_idx.len());
                    Ok(None)
                }
                Err(err) => Err(err),
            }
        })
        .collect()
}
