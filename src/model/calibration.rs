//! Platt (sigmoid) calibration fit through stratified cross-validation.
//!
//! For each of the k folds a pipeline is fit on the other k-1 folds and a
//! Platt scaler is fit on that pipeline's scores for the held-out fold. The
//! calibrated probability is the mean over the k (pipeline, scaler) pairs.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{sigmoid, solve_linear, CandidateKind, CandidateSpec, FitError, Pipeline, Row};
use crate::domain::{FeatureVector, Outcome};
use crate::ports::RiskModel;

/// `p = sigmoid(a * score + b)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl PlattScaling {
    /// Fit on raw scores with Platt's smoothed targets
    /// `(n+ + 1) / (n+ + 2)` and `1 / (n- + 2)`.
    ///
    /// # Errors
    /// Returns error for empty or single-class input.
    pub fn fit(scores: &[f64], labels: &[bool]) -> Result<Self, FitError> {
        if scores.len() != labels.len() {
            return Err(FitError::LengthMismatch {
                rows: scores.len(),
                labels: labels.len(),
            });
        }
        if scores.is_empty() {
            return Err(FitError::Empty);
        }
        let pos = labels.iter().filter(|&&v| v).count() as f64;
        let neg = labels.len() as f64 - pos;
        if pos == 0.0 || neg == 0.0 {
            return Err(FitError::SingleClass(labels.len()));
        }

        let t_pos = (pos + 1.0) / (pos + 2.0);
        let t_neg = 1.0 / (neg + 2.0);
        let target = |label: bool| if label { t_pos } else { t_neg };

        let (lo, hi) = scores
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
        if hi - lo < 1e-12 {
            // Constant scores: only the intercept is identifiable.
            let mean_t = (pos * t_pos + neg * t_neg) / (pos + neg);
            return Ok(Self {
                a: 0.0,
                b: (mean_t / (1.0 - mean_t)).ln(),
            });
        }

        let loss = |a: f64, b: f64| -> f64 {
            scores
                .iter()
                .zip(labels)
                .map(|(&s, &label)| {
                    let z = a * s + b;
                    let t = target(label);
                    // t * softplus(-z) + (1 - t) * softplus(z)
                    let sp = z.max(0.0) + (-z.abs()).exp().ln_1p();
                    sp - t * z
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((pos + 1.0) / (neg + 1.0)).ln();
        let mut current = loss(a, b);

        for _ in 0..100 {
            let mut g = [0.0; 2];
            let mut h = [[1e-12, 0.0], [0.0, 1e-12]];
            for (&s, &label) in scores.iter().zip(labels) {
                let p = sigmoid(a * s + b);
                let r = p - target(label);
                let w = p * (1.0 - p);
                g[0] += r * s;
                g[1] += r;
                h[0][0] += w * s * s;
                h[0][1] += w * s;
                h[1][1] += w;
            }
            h[1][0] = h[0][1];

            let step = match solve_linear(h, g) {
                Ok(step) => step,
                Err(_) => [0.0, g[1] / h[1][1]],
            };

            let mut t = 1.0;
            let mut moved = false;
            for _ in 0..30 {
                let (na, nb) = (a - t * step[0], b - t * step[1]);
                let next = loss(na, nb);
                if next.is_finite() && next <= current + 1e-12 {
                    let delta = (na - a).abs().max((nb - b).abs());
                    a = na;
                    b = nb;
                    current = next;
                    moved = delta > 1e-10;
                    break;
                }
                t *= 0.5;
            }
            if !moved {
                break;
            }
        }

        Ok(Self { a, b })
    }

    #[must_use]
    pub fn apply(&self, score: f64) -> f64 {
        sigmoid(self.a * score + self.b)
    }
}

/// One cross-validation member: a pipeline and its calibrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedFold {
    pub pipeline: Pipeline,
    pub platt: PlattScaling,
}

/// Calibrated classifier for one outcome. Immutable once fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedModel {
    pub outcome: Outcome,
    pub kind: CandidateKind,
    pub folds: Vec<CalibratedFold>,
}

impl CalibratedModel {
    /// Fit one pipeline + scaler per held-out fold.
    ///
    /// `folds` are disjoint held-out index sets covering `0..x.len()`.
    ///
    /// # Errors
    /// Returns error when a fold or its complement cannot be fit.
    pub fn fit<R: Rng + ?Sized>(
        outcome: Outcome,
        spec: &CandidateSpec,
        x: &[Row],
        y: &[bool],
        folds: &[Vec<usize>],
        rng: &mut R,
    ) -> Result<Self, FitError> {
        if folds.len() < 2 {
            return Err(FitError::TooFewMembers {
                needed: 2,
                have: folds.len(),
            });
        }

        let mut members = Vec::with_capacity(folds.len());
        for (k, held_out) in folds.iter().enumerate() {
            let mut in_fold = vec![false; x.len()];
            for &i in held_out {
                in_fold[i] = true;
            }
            let (train_x, train_y): (Vec<Row>, Vec<bool>) = (0..x.len())
                .filter(|&i| !in_fold[i])
                .map(|i| (x[i], y[i]))
                .unzip();

            let pipeline = Pipeline::fit(spec, &train_x, &train_y, rng)?;
            let scores: Vec<f64> = held_out.iter().map(|&i| pipeline.decision_score(&x[i])).collect();
            let labels: Vec<bool> = held_out.iter().map(|&i| y[i]).collect();
            let platt = PlattScaling::fit(&scores, &labels)?;

            tracing::debug!(
                "[{outcome}] {} fold {}: platt a={:.4} b={:.4}",
                spec.kind(),
                k + 1,
                platt.a,
                platt.b
            );
            members.push(CalibratedFold { pipeline, platt });
        }

        Ok(Self {
            outcome,
            kind: spec.kind(),
            folds: members,
        })
    }

    /// Calibrated probability of the positive class for one row.
    #[must_use]
    pub fn predict_row(&self, row: &Row) -> f64 {
        if self.folds.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .folds
            .iter()
            .map(|f| f.platt.apply(f.pipeline.decision_score(row)))
            .sum();
        sum / self.folds.len() as f64
    }

    #[must_use]
    pub fn predict_many(&self, x: &[Row]) -> Vec<f64> {
        x.iter().map(|r| self.predict_row(r)).collect()
    }

    /// Structural check of a model read back from storage.
    ///
    /// # Errors
    /// Returns a description of the first malformed fold.
    pub fn check(&self) -> Result<(), String> {
        if self.folds.is_empty() {
            return Err("model has no calibration folds".into());
        }
        for (k, fold) in self.folds.iter().enumerate() {
            if fold.pipeline.kind() != self.kind {
                return Err(format!("fold {k} holds a {} pipeline", fold.pipeline.kind()));
            }
            if !(fold.platt.a.is_finite() && fold.platt.b.is_finite()) {
                return Err(format!("fold {k} has non-finite Platt parameters"));
            }
            fold.pipeline.check().map_err(|e| format!("fold {k}: {e}"))?;
        }
        Ok(())
    }
}

impl RiskModel for CalibratedModel {
    fn predict_proba(&self, features: &FeatureVector) -> f64 {
        self.predict_row(&features.to_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LogisticConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_platt_recovers_known_link() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let (scores, labels): (Vec<f64>, Vec<bool>) = (0..5000)
            .map(|_| {
                let s: f64 = rng.gen_range(-3.0..3.0);
                (s, rng.gen::<f64>() < sigmoid(2.0 * s - 1.0))
            })
            .unzip();

        let platt = PlattScaling::fit(&scores, &labels).expect("Should fit");
        assert!((platt.a - 2.0).abs() < 0.3, "a={}", platt.a);
        assert!((platt.b + 1.0).abs() < 0.3, "b={}", platt.b);
    }

    #[test]
    fn test_platt_constant_scores_fall_back_to_prior() {
        let scores = vec![0.5; 100];
        let labels: Vec<bool> = (0..100).map(|i| i < 20).collect();
        let platt = PlattScaling::fit(&scores, &labels).expect("Should fit");
        let p = platt.apply(0.5);
        assert!((p - 0.2).abs() < 0.02, "p={p}");
    }

    #[test]
    fn test_calibrated_model_requires_folds() {
        let x = vec![[0.0; 5]; 4];
        let y = vec![true, false, true, false];
        let spec = CandidateSpec::Linear(LogisticConfig::default());
        let err = CalibratedModel::fit(
            Outcome::Stress,
            &spec,
            &x,
            &y,
            &[vec![0, 1, 2, 3]],
            &mut ChaCha8Rng::seed_from_u64(0),
        )
        .expect_err("Should reject a single fold");
        assert!(matches!(err, FitError::TooFewMembers { .. }));
    }

    #[test]
    fn test_check_flags_hollow_forest() {
        use crate::model::fixtures::{hollow_forest_model, linear_model};

        assert_eq!(linear_model(Outcome::Depression).check(), Ok(()));
        let err = hollow_forest_model(Outcome::Depression)
            .check()
            .expect_err("Should reject an empty tree");
        assert!(err.contains("tree 0"), "{err}");

        let mut mixed = linear_model(Outcome::Depression);
        mixed.kind = CandidateKind::Ensemble;
        assert!(mixed.check().is_err());
    }

    #[test]
    fn test_calibration_undoes_class_balancing() {
        // Balanced weights inflate raw minority scores; after calibration the
        // mean predicted probability must track the observed prevalence.
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let (x, y): (Vec<Row>, Vec<bool>) = (0..3000)
            .map(|_| {
                let a: f64 = rng.gen_range(0.0..27.0);
                let p = sigmoid(-4.0 + 0.15 * a);
                ([a, 3.0, 20.0, 0.0, 0.0], rng.gen::<f64>() < p)
            })
            .unzip();
        let folds: Vec<Vec<usize>> = (0..3)
            .map(|k| (0..x.len()).filter(|i| i % 3 == k).collect())
            .collect();

        let spec = CandidateSpec::Linear(LogisticConfig::default());
        let model = CalibratedModel::fit(Outcome::Suicidal, &spec, &x, &y, &folds, &mut rng)
            .expect("Should fit");

        let prevalence = y.iter().filter(|&&v| v).count() as f64 / y.len() as f64;
        let mean = model.predict_many(&x).iter().sum::<f64>() / x.len() as f64;
        assert!((mean - prevalence).abs() < 0.02, "mean={mean} prevalence={prevalence}");
        assert_eq!(model.folds.len(), 3);
    }
}
