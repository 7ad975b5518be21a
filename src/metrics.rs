use ndarray::ArrayView1;
use crate::error::{KnnSurvivalError, Result};

/// concordance index for survival scores - how often does the subject that
/// died first also get the lower predicted score?
///
/// A pair is comparable only when the earlier time is an observed event;
/// equal times and censored-first pairs are skipped. Tied predictions count
/// as half concordant.
pub fn concordance_index(
    predictions: ArrayView1<f64>,
    times: ArrayView1<f64>,
    censored: &[bool],
) -> Result<f64> {
    if predictions.len() != times.len() || times.len() != censored.len() {
        return Err(KnnSurvivalError::invalid_input(
            format!(
                "predictions ({}), times ({}) and censored ({}) must have same length",
                predictions.len(), times.len(), censored.len()
            )
        ));
    }

    let n = predictions.len();
    let mut concordant = 0u64;
    let mut tied = 0u64;
    let mut comparable = 0u64;

    for i in 0..n {
        if censored[i] {
            continue; // censored subjects can't be the earlier one
        }

        for j in 0..n {
            if times[i] < times[j] {
                comparable += 1;

                if predictions[i] < predictions[j] {
                    concordant += 1;
                } else if predictions[i] == predictions[j] {
                    tied += 1;
                }
            }
        }
    }

    if comparable == 0 {
        return Err(KnnSurvivalError::NoComparablePairs);
    }

    Ok((concordant as f64 + 0.5 * tied as f64) / comparable as f64)
}

/// q-th percentile (0..=100) w/ linear interpolation between order statistics
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(KnnSurvivalError::invalid_input("percentile of an empty sequence"));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(KnnSurvivalError::invalid_parameter("percentile", q.to_string()));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(values: &[f64]) -> Result<f64> {
    percentile(values, 50.0)
}

/// spread of per-fold C-indices. Failed folds (`None`) are left out and counted.
#[derive(Debug, Clone, PartialEq)]
pub struct CIndexSummary {
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub n_folds: usize,
    pub n_failed: usize,
}

impl CIndexSummary {
    pub fn from_folds(c_indices: &[Option<f64>]) -> Result<Self> {
        let scored: Vec<f64> = c_indices.iter().flatten().copied().collect();
        if scored.is_empty() {
            return Err(KnnSurvivalError::NoComparablePairs);
        }

        Ok(Self {
            p25: percentile(&scored, 25.0)?,
            median: percentile(&scored, 50.0)?,
            p75: percentile(&scored, 75.0)?,
            n_folds: c_indices.len(),
            n_failed: c_indices.len() - scored.len(),
        })
    }

    /// print summary
    pub fn print(&self) {
        println!("C-index over {} folds ({} failed)", self.n_folds, self.n_failed);
        println!("----------------------------------");
        println!("25th percentile:   {:.4}", self.p25);
        println!("50th percentile:   {:.4}", self.median);
        println!("75th percentile:   {:.4}", self.p75);
    }
}
