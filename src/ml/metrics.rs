//! Evaluation metrics for binary classifiers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Area under the ROC curve.
///
/// Computed through the rank-sum statistic with average ranks for ties. Returns `None` when
/// either class is absent, since the curve is undefined then.
pub fn roc_auc_score(labels: &[u8], scores: &[f64]) -> Option<f64> {
    if labels.len() != scores.len() || labels.is_empty() {
        return None;
    }
    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0f64;
    let mut start = 0usize;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based; tied block shares the mean rank
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            if labels[idx] == 1 {
                positive_rank_sum += mean_rank;
            }
        }
        start = end;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Share of rows whose thresholded probability matches the label.
pub fn accuracy_at(labels: &[u8], probabilities: &[f64], threshold: f64) -> f64 {
    if labels.is_empty() || labels.len() != probabilities.len() {
        return 0.0;
    }
    let correct = labels
        .iter()
        .zip(probabilities)
        .filter(|&(&y, &p)| (p >= threshold) == (y == 1))
        .count();
    correct as f64 / labels.len() as f64
}

/// Mean and population standard deviation of a score set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let count = scores.len();
        let mean = scores.iter().sum::<f64>() / count as f64;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / count as f64;
        Some(Self {
            mean,
            std: variance.sqrt(),
            count,
        })
    }
}

impl std::fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} +- {:.3}", self.mean, self.std)
    }
}
