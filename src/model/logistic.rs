//! L2-regularised logistic regression (the linear candidate).
//!
//! Fit by Newton-Raphson with step halving. With five inputs the Hessian is
//! a 6x6 system, so each iteration is one pass over the data plus a tiny solve.

use serde::{Deserialize, Serialize};

use super::{balanced_weights, check_training_set, sigmoid, solve_linear, FitError, Row};
use crate::domain::N_FEATURES;

const DIM: usize = N_FEATURES + 1;

/// Logistic regression hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularisation strength (intercept is not penalised).
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
    /// Reweight classes to `n / (2 * n_c)`.
    pub balanced: bool,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-8,
            balanced: true,
        }
    }
}

/// Fitted linear model: `logit = intercept + coef . x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Row,
    pub intercept: f64,
}

fn softplus(x: f64) -> f64 {
    x.max(0.0) + (-x.abs()).exp().ln_1p()
}

impl LogisticRegression {
    /// Fit on (already preprocessed) rows.
    ///
    /// # Errors
    /// Returns error for empty or single-class input, or a singular Hessian.
    pub fn fit(x: &[Row], y: &[bool], config: &LogisticConfig) -> Result<Self, FitError> {
        let (pos, neg) = check_training_set(x, y)?;
        if !(config.c.is_finite() && config.c > 0.0) {
            return Err(FitError::InvalidParameter(format!("C must be positive, got {}", config.c)));
        }
        let (w_pos, w_neg) = if config.balanced {
            balanced_weights(pos, neg)
        } else {
            (1.0, 1.0)
        };
        let inv_c = 1.0 / config.c;

        let weight = |label: bool| if label { w_pos } else { w_neg };
        let loss = |theta: &[f64; DIM]| -> f64 {
            let data: f64 = x
                .iter()
                .zip(y)
                .map(|(row, &label)| {
                    let z = logit(theta, row);
                    weight(label) * if label { softplus(-z) } else { softplus(z) }
                })
                .sum();
            let penalty: f64 = theta[1..].iter().map(|w| w * w).sum::<f64>() * 0.5 * inv_c;
            data + penalty
        };

        let mut theta = [0.0; DIM];
        let mut current = loss(&theta);
        let mut converged = false;

        for iter in 0..config.max_iter {
            let mut grad = [0.0; DIM];
            let mut hess = [[0.0; DIM]; DIM];

            for (row, &label) in x.iter().zip(y) {
                let p = sigmoid(logit(&theta, row));
                let s = weight(label);
                let r = s * (p - if label { 1.0 } else { 0.0 });
                let h = s * p * (1.0 - p);

                let z = design(row);
                for k in 0..DIM {
                    grad[k] += r * z[k];
                    for l in k..DIM {
                        hess[k][l] += h * z[k] * z[l];
                    }
                }
            }
            for k in 0..DIM {
                for l in 0..k {
                    hess[k][l] = hess[l][k];
                }
            }
            for k in 1..DIM {
                grad[k] += theta[k] * inv_c;
                hess[k][k] += inv_c;
            }

            let step = solve_linear(hess, grad)?;

            let mut t = 1.0;
            let mut candidate = theta;
            let mut accepted = false;
            for _ in 0..30 {
                for k in 0..DIM {
                    candidate[k] = theta[k] - t * step[k];
                }
                let next = loss(&candidate);
                if next.is_finite() && next <= current + 1e-12 {
                    current = next;
                    accepted = true;
                    break;
                }
                t *= 0.5;
            }
            if !accepted {
                tracing::debug!("Logistic fit: line search stalled at iteration {iter}");
                converged = true;
                break;
            }

            let max_delta = (0..DIM)
                .map(|k| (candidate[k] - theta[k]).abs())
                .fold(0.0, f64::max);
            theta = candidate;
            if max_delta < config.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::warn!(
                "Logistic regression did not converge within {} iterations",
                config.max_iter
            );
        }

        let mut coef = [0.0; N_FEATURES];
        coef.copy_from_slice(&theta[1..]);
        Ok(Self {
            coef,
            intercept: theta[0],
        })
    }

    /// Log-odds of the positive class.
    #[must_use]
    pub fn decision(&self, row: &Row) -> f64 {
        self.intercept + self.coef.iter().zip(row).map(|(w, v)| w * v).sum::<f64>()
    }

    #[must_use]
    pub fn predict_proba(&self, row: &Row) -> f64 {
        sigmoid(self.decision(row))
    }
}

fn design(row: &Row) -> [f64; DIM] {
    let mut z = [1.0; DIM];
    z[1..].copy_from_slice(row);
    z
}

fn logit(theta: &[f64; DIM], row: &Row) -> f64 {
    theta[0] + theta[1..].iter().zip(row).map(|(w, v)| w * v).sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn simulated(n: usize, seed: u64) -> (Vec<Row>, Vec<bool>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        for _ in 0..n {
            let a: f64 = rng.gen_range(-2.0..2.0);
            let b: f64 = rng.gen_range(-2.0..2.0);
            let p = sigmoid(-0.5 + 1.5 * a - 1.0 * b);
            x.push([a, b, 0.0, 0.0, 0.0]);
            y.push(rng.gen::<f64>() < p);
        }
        (x, y)
    }

    #[test]
    fn test_recovers_coefficient_signs() {
        let (x, y) = simulated(4000, 7);
        let config = LogisticConfig {
            balanced: false,
            ..Default::default()
        };
        let model = LogisticRegression::fit(&x, &y, &config).expect("Should fit");

        assert!((model.coef[0] - 1.5).abs() < 0.25, "coef[0]={}", model.coef[0]);
        assert!((model.coef[1] + 1.0).abs() < 0.25, "coef[1]={}", model.coef[1]);
        assert!(model.coef[2].abs() < 1e-9);
    }

    #[test]
    fn test_balancing_raises_minority_scores() {
        let (x, y) = simulated(3000, 11);
        let plain = LogisticRegression::fit(
            &x,
            &y,
            &LogisticConfig {
                balanced: false,
                ..Default::default()
            },
        )
        .expect("Should fit");
        let balanced = LogisticRegression::fit(&x, &y, &LogisticConfig::default())
            .expect("Should fit");

        let pos_rate = y.iter().filter(|&&v| v).count() as f64 / y.len() as f64;
        let row = [0.0; N_FEATURES];
        // Positives are the minority here, so balancing shifts the intercept up.
        assert!(pos_rate < 0.5);
        assert!(balanced.predict_proba(&row) > plain.predict_proba(&row));
    }

    #[test]
    fn test_single_class_is_rejected() {
        let x = vec![[0.0; N_FEATURES]; 4];
        let err = LogisticRegression::fit(&x, &[false; 4], &LogisticConfig::default())
            .expect_err("Should reject");
        assert_eq!(err, FitError::SingleClass(4));
    }
}
