//! Estimators: preprocessing, the two candidate classifiers, Platt
//! calibration and evaluation metrics.
//!
//! Everything here works on dense rows in canonical feature order
//! (see [`crate::domain::FEATURE_NAMES`]).

mod calibration;
mod forest;
mod logistic;
mod metrics;
mod pipeline;
mod scaler;

#[cfg(test)]
pub(crate) mod fixtures;

pub use calibration::{CalibratedFold, CalibratedModel, PlattScaling};
pub use forest::{DecisionTree, ForestConfig, RandomForest};
pub use logistic::{LogisticConfig, LogisticRegression};
pub use metrics::{average_precision, roc_auc, Scores};
pub use pipeline::{CandidateKind, CandidateSpec, Estimator, Pipeline};
pub use scaler::ColumnStandardizer;

use crate::domain::N_FEATURES;

/// One model input row.
pub type Row = [f64; N_FEATURES];

/// Errors raised while fitting or scoring an estimator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("Empty training set")]
    Empty,

    #[error("Row/label count mismatch: {rows} rows, {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("Only one class present among {0} samples")]
    SingleClass(usize),

    #[error("Class with {have} members cannot be split into {needed} partitions")]
    TooFewMembers { needed: usize, have: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),
}

impl FitError {
    /// True when the failure comes from the data rather than the numerics.
    #[must_use]
    pub fn is_degenerate_data(&self) -> bool {
        matches!(
            self,
            Self::Empty
                | Self::LengthMismatch { .. }
                | Self::SingleClass(_)
                | Self::TooFewMembers { .. }
        )
    }
}

/// Logistic function.
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Validate a labelled training set and return (positives, negatives).
pub(crate) fn check_training_set(x: &[Row], y: &[bool]) -> Result<(usize, usize), FitError> {
    if x.len() != y.len() {
        return Err(FitError::LengthMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }
    if x.is_empty() {
        return Err(FitError::Empty);
    }
    let pos = y.iter().filter(|&&v| v).count();
    let neg = y.len() - pos;
    if pos == 0 || neg == 0 {
        return Err(FitError::SingleClass(y.len()));
    }
    Ok((pos, neg))
}

/// Balanced class weights `n / (2 * n_c)` as (positive, negative).
pub(crate) fn balanced_weights(pos: usize, neg: usize) -> (f64, f64) {
    let n = (pos + neg) as f64;
    (n / (2.0 * pos as f64), n / (2.0 * neg as f64))
}

/// Solve `a * x = b` in place by Gaussian elimination with partial pivoting.
pub(crate) fn solve_linear<const D: usize>(
    mut a: [[f64; D]; D],
    mut b: [f64; D],
) -> Result<[f64; D], FitError> {
    for col in 0..D {
        let pivot = (col..D)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(FitError::Numerical("singular system".into()));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..D {
            let factor = a[row][col] / a[col][col];
            for k in col..D {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0; D];
    for row in (0..D).rev() {
        let mut acc = b[row];
        for k in (row + 1)..D {
            acc -= a[row][k] * x[k];
        }
        x[row] = acc / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_is_stable() {
        assert!((sigmoid(0.0) - 0.5).abs() < f64::EPSILON);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_linear() {
        let a = [[2.0, 1.0], [1.0, 3.0]];
        let b = [3.0, 5.0];
        let x = solve_linear(a, b).expect("Should solve");
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);

        assert!(solve_linear([[1.0, 2.0], [2.0, 4.0]], [1.0, 2.0]).is_err());
    }

    #[test]
    fn test_check_training_set() {
        let x = vec![[0.0; N_FEATURES]; 3];
        assert_eq!(check_training_set(&x, &[true, false, false]), Ok((1, 2)));
        assert_eq!(
            check_training_set(&x, &[true, true, true]),
            Err(FitError::SingleClass(3))
        );
        assert!(matches!(
            check_training_set(&x, &[true]),
            Err(FitError::LengthMismatch { .. })
        ));
        assert_eq!(check_training_set(&[], &[]), Err(FitError::Empty));
    }

    #[test]
    fn test_balanced_weights() {
        let (wp, wn) = balanced_weights(10, 90);
        assert!((wp - 5.0).abs() < 1e-12);
        assert!((wn - 100.0 / 180.0).abs() < 1e-12);
        // Each class contributes half of the total weight.
        assert!((wp * 10.0 - wn * 90.0).abs() < 1e-9);
    }
}
