//! brute-force nearest neighbour ranking
//!
//! Distances are plain euclidean. Nothing here rescales features, so unless
//! the features went through a learned transform (or were standardized) the
//! widest-range column dominates the ranking. That's on the caller.

use ndarray::{Array2, ArrayView1, ArrayView2};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{KnnSurvivalError, Result};

/// euclidean distance between every query row and every reference row (nq x nr)
pub fn pairwise_distances(query: ArrayView2<f64>, reference: ArrayView2<f64>) -> Result<Array2<f64>> {
    check_dims(query, reference)?;

    let mut dist = Array2::zeros((query.nrows(), reference.nrows()));
    for (q, mut out) in query.rows().into_iter().zip(dist.rows_mut()) {
        for (r, slot) in reference.rows().into_iter().zip(out.iter_mut()) {
            *slot = euclidean(q, r);
        }
    }
    Ok(dist)
}

/// for each query row, reference indices sorted by ascending distance.
///
/// Ties keep the original reference order. Row `i` of the output only depends
/// on row `i` of `query`, so with the `parallel` feature rows are ranked on
/// the rayon pool and the result is the same as the serial one.
pub fn rank_neighbors(query: ArrayView2<f64>, reference: ArrayView2<f64>) -> Result<Array2<usize>> {
    check_dims(query, reference)?;

    let n_query = query.nrows();

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<usize>> = (0..n_query)
        .into_par_iter()
        .map(|i| rank_row(query.row(i), reference))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<usize>> = (0..n_query)
        .map(|i| rank_row(query.row(i), reference))
        .collect();

    let mut ranking = Array2::zeros((n_query, reference.nrows()));
    for (mut out, row) in ranking.rows_mut().into_iter().zip(rows) {
        for (slot, idx) in out.iter_mut().zip(row) {
            *slot = idx;
        }
    }
    Ok(ranking)
}

fn check_dims(query: ArrayView2<f64>, reference: ArrayView2<f64>) -> Result<()> {
    if query.ncols() != reference.ncols() {
        return Err(KnnSurvivalError::dimension_mismatch(reference.ncols(), query.ncols()));
    }
    Ok(())
}

fn rank_row(q: ArrayView1<f64>, reference: ArrayView2<f64>) -> Vec<usize> {
    let dist: Vec<f64> = reference.rows().into_iter().map(|r| euclidean(q, r)).collect();
    let mut order: Vec<usize> = (0..dist.len()).collect();
    // sort_by is stable
    order.sort_by(|&a, &b| dist[a].total_cmp(&dist[b]));
    order
}

#[inline]
fn euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
