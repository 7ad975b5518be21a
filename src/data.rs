use log::warn;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use crate::error::{KnnSurvivalError, Result};

/// a cohort - times, censoring flags, and patient features
#[derive(Debug, Clone)]
pub struct SurvivalData {
    times: Array1<f64>,      // time to event/censoring
    censored: Vec<bool>,     // true = censored, false = event observed
    features: Array2<f64>,   // patient features (n_samples x n_features)
}

impl SurvivalData {
    /// make a cohort from already cleaned vecs/arrays
    pub fn new(
        times: Vec<f64>,         // survival/censoring times
        censored: Vec<bool>,     // true = censored, false = event observed
        features: Array2<f64>,   // patient features matrix
    ) -> Result<Self> {
        let n_samples = times.len();

        if n_samples == 0 {
            return Err(KnnSurvivalError::invalid_input("cohort is empty"));
        }

        if censored.len() != n_samples {
            return Err(KnnSurvivalError::invalid_input(
                format!("times len ({}) != censored len ({})", n_samples, censored.len())
            ));
        }

        if features.nrows() != n_samples {
            return Err(KnnSurvivalError::invalid_input(
                format!("feature rows ({}) != n_samples ({})", features.nrows(), n_samples)
            ));
        }

        if times.iter().any(|&t| t <= 0.0 || !t.is_finite()) {
            return Err(KnnSurvivalError::invalid_survival_data(
                "survival times must be positive & finite"
            ));
        }

        Ok(Self {
            times: Array1::from(times),
            censored,
            features,
        })
    }

    /// make a cohort from raw loader output.
    ///
    /// If any time is non-positive every time is shifted by `1 - min(time)`
    /// so the smallest one lands on 1. The shift happens once, here.
    pub fn from_raw(
        mut times: Vec<f64>,
        censored: Vec<bool>,
        features: Array2<f64>,
    ) -> Result<Self> {
        if times.iter().any(|t| !t.is_finite()) {
            return Err(KnnSurvivalError::invalid_survival_data(
                "survival times must be finite"
            ));
        }

        let min_time = times.iter().copied().fold(f64::INFINITY, f64::min);
        if min_time <= 0.0 {
            let shift = 1.0 - min_time;
            warn!("non-positive survival times found, shifting all times by {}", shift);
            for t in times.iter_mut() {
                *t += shift;
            }
        }

        Self::new(times, censored, features)
    }

    /// how many patients
    pub fn n_samples(&self) -> usize {
        self.times.len()
    }

    /// how many features per patient
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// survival/censoring times
    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.times.view()
    }

    /// censoring flags (true = censored)
    pub fn censored(&self) -> &[bool] {
        &self.censored
    }

    /// event indicators, the complement of `censored`
    pub fn observed(&self) -> Vec<bool> {
        self.censored.iter().map(|&c| !c).collect()
    }

    pub fn n_censored(&self) -> usize {
        self.censored.iter().filter(|&&c| c).count()
    }

    /// patient feature matrix
    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    /// grab a subset of patients by indices
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_samples()) {
            return Err(KnnSurvivalError::invalid_input(
                format!("subset index {} out of bounds for {} samples", bad, self.n_samples())
            ));
        }

        let times: Vec<f64> = indices.iter().map(|&i| self.times[i]).collect();
        let censored: Vec<bool> = indices.iter().map(|&i| self.censored[i]).collect();
        let features = self.features.select(Axis(0), indices);

        Self::new(times, censored, features)
    }

    /// drop constant columns, returns the indices of the columns that were kept
    pub fn remove_zero_variance_features(&mut self) -> Vec<usize> {
        let stds = self.features.std_axis(Axis(0), 0.0);
        let keep: Vec<usize> = stds
            .iter()
            .enumerate()
            .filter_map(|(j, &s)| if s > 0.0 { Some(j) } else { None })
            .collect();

        if keep.len() != self.n_features() {
            self.features = self.features.select(Axis(1), &keep);
        }
        keep
    }

    /// standardize features (mean=0, std=1) - modifies in place
    pub fn standardize_features(&mut self) -> Result<(Array1<f64>, Array1<f64>)> {
        let means = self
            .features
            .mean_axis(Axis(0))
            .ok_or_else(|| KnnSurvivalError::invalid_input("no features to standardize"))?;
        let stds = self.features.std_axis(Axis(0), 0.0);

        if let Some(j) = stds.iter().position(|&s| s == 0.0) {
            return Err(KnnSurvivalError::invalid_survival_data(
                format!("feature {} has zero variance - can't standardize", j)
            ));
        }

        // z-score normalization
        for mut row in self.features.rows_mut() {
            row -= &means;
            row /= &stds;
        }

        Ok((means, stds))
    }

    /// new cohort with features scaled column-wise by `weights`, i.e. `X · diag(w)`
    pub fn apply_feature_weights(&self, weights: ArrayView1<f64>) -> Result<Self> {
        if weights.len() != self.n_features() {
            return Err(KnnSurvivalError::dimension_mismatch(self.n_features(), weights.len()));
        }

        let features = &self.features * &weights;

        Ok(Self {
            times: self.times.clone(),
            censored: self.censored.clone(),
            features,
        })
    }
}
