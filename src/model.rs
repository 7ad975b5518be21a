use ndarray::{Array1, ArrayView1, ArrayView2};
use crate::{
    data::SurvivalData,
    error::{KnnSurvivalError, Result},
    metrics::concordance_index,
    neighbors::rank_neighbors,
    risk_set::compute_at_risk,
};

/// survival curve built from one query's k nearest neighbours
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalCurve {
    pub times: Vec<f64>,     // neighbour times, ascending
    pub survival: Vec<f64>,  // cumulative survival at each of those times
}

impl SurvivalCurve {
    /// scalar survival score - the sum over the curve's steps
    pub fn score(&self) -> f64 {
        self.survival.iter().sum()
    }
}

/// predictions for a query set, plus the C-index when test labels were given
#[derive(Debug, Clone)]
pub struct Prediction {
    pub predictions: Array1<f64>,
    pub c_index: Option<f64>,
}

/// labels of the query subjects, used only for scoring
#[derive(Debug, Clone, Copy)]
pub struct TestLabels<'a> {
    pub times: ArrayView1<'a, f64>,
    pub censored: &'a [bool],
}

/// per-query survival curves from precomputed neighbour rankings (nq x nr),
/// keeping only the first `k` neighbours of each row.
pub fn predict_curves(
    neighbor_idxs: ArrayView2<usize>,
    train_times: ArrayView1<f64>,
    train_censored: &[bool],
    k: usize,
) -> Result<Vec<SurvivalCurve>> {
    if train_times.len() != train_censored.len() {
        return Err(KnnSurvivalError::invalid_input(
            format!("train times len ({}) != train censored len ({})", train_times.len(), train_censored.len())
        ));
    }

    if k == 0 || k > neighbor_idxs.ncols() {
        return Err(KnnSurvivalError::invalid_k(k, neighbor_idxs.ncols()));
    }

    let n_train = train_times.len();
    let mut curves = Vec::with_capacity(neighbor_idxs.nrows());
    let mut times = Vec::with_capacity(k);
    let mut observed = Vec::with_capacity(k);

    for row in neighbor_idxs.rows() {
        times.clear();
        observed.clear();
        for &j in row.iter().take(k) {
            if j >= n_train {
                return Err(KnnSurvivalError::invalid_input(
                    format!("neighbour index {} out of bounds for {} training subjects", j, n_train)
                ));
            }
            times.push(train_times[j]);
            observed.push(!train_censored[j]);
        }

        curves.push(neighborhood_curve(&times, &observed, k)?);
    }

    Ok(curves)
}

/// predicted survival score per query row, and the C-index if `test` is given.
///
/// Scores aren't probabilities - only their order means anything.
pub fn predict(
    neighbor_idxs: ArrayView2<usize>,
    train_times: ArrayView1<f64>,
    train_censored: &[bool],
    k: usize,
    test: Option<TestLabels<'_>>,
) -> Result<Prediction> {
    let curves = predict_curves(neighbor_idxs, train_times, train_censored, k)?;
    let predictions: Array1<f64> = curves.iter().map(SurvivalCurve::score).collect();

    let c_index = match test {
        Some(labels) => Some(concordance_index(predictions.view(), labels.times, labels.censored)?),
        None => None,
    };

    Ok(Prediction { predictions, c_index })
}

// Within the neighbourhood, a step's denominator is the number of neighbours
// strictly before it (k - at_risk). An empty denominator contributes no risk.
fn neighborhood_curve(times: &[f64], observed: &[bool], k: usize) -> Result<SurvivalCurve> {
    let risk = compute_at_risk(times, observed)?;

    let mut survival = Vec::with_capacity(risk.len());
    let mut cumulative = 1.0;
    for (&at_risk, &obs) in risk.at_risk.iter().zip(risk.sorted_observed.iter()) {
        let departed = (k - at_risk) as f64;
        let step = if departed > 0.0 {
            (departed - if obs { 1.0 } else { 0.0 }) / departed
        } else {
            1.0
        };
        cumulative *= step;
        survival.push(cumulative);
    }

    Ok(SurvivalCurve {
        times: risk.sorted_times,
        survival,
    })
}

/// knn survival model - keeps a reference cohort and predicts from its labels
#[derive(Debug, Clone)]
pub struct KnnSurvival {
    k: usize,                          // neighbours per prediction
    reference: Option<SurvivalData>,   // "training" cohort
}

impl Default for KnnSurvival {
    fn default() -> Self {
        Self {
            k: 15,
            reference: None,
        }
    }
}

impl KnnSurvival {
    /// new model w/ defaults (k = 15)
    pub fn new() -> Self {
        Self::default()
    }

    /// how many neighbours to use
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// remember the reference cohort. No training happens in knn, but `k` is
    /// checked against the cohort size here.
    pub fn fit(&mut self, data: &SurvivalData) -> Result<&mut Self> {
        if self.k == 0 || self.k > data.n_samples() {
            return Err(KnnSurvivalError::invalid_k(self.k, data.n_samples()));
        }
        self.reference = Some(data.clone());
        Ok(self)
    }

    pub fn is_fitted(&self) -> bool {
        self.reference.is_some()
    }

    fn reference(&self) -> Result<&SurvivalData> {
        self.reference.as_ref().ok_or(KnnSurvivalError::ModelNotFitted)
    }

    /// survival curves for new patients
    pub fn predict_curves(&self, features: ArrayView2<f64>) -> Result<Vec<SurvivalCurve>> {
        let reference = self.reference()?;
        let ranking = rank_neighbors(features, reference.features())?;
        predict_curves(ranking.view(), reference.times(), reference.censored(), self.k)
    }

    /// survival scores for new patients (higher = expected to live longer)
    pub fn predict(&self, features: ArrayView2<f64>) -> Result<Array1<f64>> {
        let reference = self.reference()?;
        let ranking = rank_neighbors(features, reference.features())?;
        Ok(predict(ranking.view(), reference.times(), reference.censored(), self.k, None)?.predictions)
    }

    /// C-index on a labelled cohort
    pub fn evaluate(&self, test: &SurvivalData) -> Result<f64> {
        let predictions = self.predict(test.features())?;
        concordance_index(predictions.view(), test.times(), test.censored())
    }
}
