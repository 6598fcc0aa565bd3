//! Column standardizer shared by both candidate pipelines.

use serde::{Deserialize, Serialize};

use super::{FitError, Row};
use crate::domain::{BINARY_COLUMN, N_FEATURES};

/// Standardizes the four scored columns to zero mean and unit variance and
/// passes the binary ASQ column through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStandardizer {
    pub mean: Row,
    pub scale: Row,
}

impl ColumnStandardizer {
    /// Fit column means and (population) standard deviations.
    ///
    /// A zero-variance column keeps scale 1 so it maps to a constant 0.
    ///
    /// # Errors
    /// Returns `FitError::Empty` on an empty matrix.
    pub fn fit(x: &[Row]) -> Result<Self, FitError> {
        if x.is_empty() {
            return Err(FitError::Empty);
        }
        let n = x.len() as f64;

        let mut mean = [0.0; N_FEATURES];
        for row in x {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = [0.0; N_FEATURES];
        for row in x {
            for j in 0..N_FEATURES {
                let d = row[j] - mean[j];
                var[j] += d * d;
            }
        }

        let mut scale = [1.0; N_FEATURES];
        for j in 0..N_FEATURES {
            let sd = (var[j] / n).sqrt();
            if sd > f64::EPSILON {
                scale[j] = sd;
            }
        }

        mean[BINARY_COLUMN] = 0.0;
        scale[BINARY_COLUMN] = 1.0;

        Ok(Self { mean, scale })
    }

    #[must_use]
    pub fn transform(&self, row: &Row) -> Row {
        let mut out = [0.0; N_FEATURES];
        for j in 0..N_FEATURES {
            out[j] = (row[j] - self.mean[j]) / self.scale[j];
        }
        out
    }

    #[must_use]
    pub fn transform_all(&self, x: &[Row]) -> Vec<Row> {
        x.iter().map(|r| self.transform(r)).collect()
    }
}
