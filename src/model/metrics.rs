//! Ranking metrics for rare-positive binary outcomes.

use serde::{Deserialize, Serialize};

use super::FitError;

/// Held-out evaluation of one calibrated candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    /// Area under the precision-recall curve (average precision); primary.
    pub pr_auc: f64,
    /// Area under the ROC curve; secondary.
    pub roc_auc: f64,
}

impl Scores {
    /// Evaluate predicted probabilities against true labels.
    ///
    /// # Errors
    /// Returns error if the labels hold a single class or lengths differ.
    pub fn evaluate(probs: &[f64], labels: &[bool]) -> Result<Self, FitError> {
        Ok(Self {
            pr_auc: average_precision(probs, labels)?,
            roc_auc: roc_auc(probs, labels)?,
        })
    }
}

fn check(scores: &[f64], labels: &[bool]) -> Result<(usize, usize), FitError> {
    if scores.len() != labels.len() {
        return Err(FitError::LengthMismatch {
            rows: scores.len(),
            labels: labels.len(),
        });
    }
    if scores.is_empty() {
        return Err(FitError::Empty);
    }
    let pos = labels.iter().filter(|&&v| v).count();
    let neg = labels.len() - pos;
    if pos == 0 || neg == 0 {
        return Err(FitError::SingleClass(labels.len()));
    }
    Ok((pos, neg))
}

/// Step-wise average precision: `sum_n (R_n - R_{n-1}) * P_n` over distinct
/// score thresholds in decreasing order.
///
/// # Errors
/// Returns error if the labels hold a single class or lengths differ.
pub fn average_precision(scores: &[f64], labels: &[bool]) -> Result<f64, FitError> {
    let (pos, _) = check(scores, labels)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut prev_recall = 0.0;
    let mut ap = 0.0;

    for (k, &i) in order.iter().enumerate() {
        if labels[i] {
            tp += 1;
        } else {
            fp += 1;
        }
        // Only evaluate at the last row of a tie group.
        let last_of_group = order
            .get(k + 1)
            .map_or(true, |&next| scores[next] != scores[i]);
        if !last_of_group {
            continue;
        }
        let recall = tp as f64 / pos as f64;
        let precision = tp as f64 / (tp + fp) as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }

    Ok(ap)
}

/// ROC AUC via the rank-sum statistic with tie-averaged ranks.
///
/// # Errors
/// Returns error if the labels hold a single class or lengths differ.
pub fn roc_auc(scores: &[f64], labels: &[bool]) -> Result<f64, FitError> {
    let (pos, neg) = check(scores, labels)?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; a tie group shares its mean rank.
        let mean_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| labels[i]).count();
        rank_sum += mean_rank * positives as f64;
        start = end;
    }

    let (p, n) = (pos as f64, neg as f64);
    Ok((rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}
