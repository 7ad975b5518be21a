//! at-risk accounting over a set of (time, observed) pairs

use crate::error::{KnnSurvivalError, Result};

/// the input pairs sorted by ascending time, with at-risk counts
#[derive(Debug, Clone, PartialEq)]
pub struct AtRiskSet {
    pub sorted_times: Vec<f64>,
    pub sorted_observed: Vec<bool>,
    /// `at_risk[i]` = how many entries have time >= `sorted_times[i]`
    pub at_risk: Vec<usize>,
    /// `order[i]` = position in the input of the i-th sorted entry
    pub order: Vec<usize>,
}

impl AtRiskSet {
    pub fn len(&self) -> usize {
        self.sorted_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted_times.is_empty()
    }
}

/// sort by time (stable) and count who's still at risk at each time.
///
/// Tied times end up adjacent and share the same count.
pub fn compute_at_risk(times: &[f64], observed: &[bool]) -> Result<AtRiskSet> {
    if times.len() != observed.len() {
        return Err(KnnSurvivalError::invalid_input(
            format!("times len ({}) != observed len ({})", times.len(), observed.len())
        ));
    }

    if times.is_empty() {
        return Err(KnnSurvivalError::invalid_input("need at least one subject for risk sets"));
    }

    let n = times.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

    let sorted_times: Vec<f64> = order.iter().map(|&i| times[i]).collect();
    let sorted_observed: Vec<bool> = order.iter().map(|&i| observed[i]).collect();

    // one pass from the right; a run of equal times takes the count of its leftmost member
    let mut at_risk = vec![0usize; n];
    let mut end = n;
    while end > 0 {
        let mut start = end - 1;
        while start > 0 && sorted_times[start - 1] == sorted_times[end - 1] {
            start -= 1;
        }
        let count = n - start;
        for slot in &mut at_risk[start..end] {
            *slot = count;
        }
        end = start;
    }

    Ok(AtRiskSet {
        sorted_times,
        sorted_observed,
        at_risk,
        order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_times() {
        let risk = compute_at_risk(&[6.0, 2.0, 8.0, 4.0], &[false, true, true, true]).unwrap();

        assert_eq!(risk.sorted_times, vec![2.0, 4.0, 6.0, 8.0]);
        assert_eq!(risk.sorted_observed, vec![true, true, false, true]);
        assert_eq!(risk.at_risk, vec![4, 3, 2, 1]);
        assert_eq!(risk.order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_tied_times_share_count() {
        let risk = compute_at_risk(&[3.0, 1.0, 3.0, 5.0, 3.0], &[true; 5]).unwrap();

        assert_eq!(risk.sorted_times, vec![1.0, 3.0, 3.0, 3.0, 5.0]);
        assert_eq!(risk.at_risk, vec![5, 4, 4, 4, 1]);
        // stable: the tied 3.0s keep their input order
        assert_eq!(risk.order, vec![1, 0, 2, 4, 3]);
    }

    #[test]
    fn test_at_risk_invariants() {
        let times = [4.0, 4.0, 1.0, 9.0, 2.0, 2.0, 2.0, 7.0];
        let observed = [true, false, true, true, false, true, true, false];
        let risk = compute_at_risk(&times, &observed).unwrap();
        let n = times.len();

        assert_eq!(risk.at_risk[0], n);
        for i in 0..n {
            let expected = risk.sorted_times.iter().filter(|&&t| t >= risk.sorted_times[i]).count();
            assert_eq!(risk.at_risk[i], expected);
        }
        for w in risk.at_risk.windows(2) {
            assert!(w[1] <= w[0]);
        }
    }

    #[test]
    fn test_single_subject() {
        let risk = compute_at_risk(&[3.0], &[false]).unwrap();
        assert_eq!(risk.at_risk, vec![1]);
        assert_eq!(risk.len(), 1);
    }

    #[test]
    fn test_non_positive_times_allowed() {
        let risk = compute_at_risk(&[0.0, -1.0], &[true, true]).unwrap();
        assert_eq!(risk.sorted_times, vec![-1.0, 0.0]);
        assert_eq!(risk.at_risk, vec![2, 1]);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            compute_at_risk(&[1.0, 2.0], &[true]),
            Err(KnnSurvivalError::InvalidInput { .. })
        ));
    }
}
