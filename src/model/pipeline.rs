//! Preprocessing + classifier pipelines for the two candidates.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{
    ColumnStandardizer, FitError, ForestConfig, LogisticConfig, LogisticRegression, RandomForest,
    Row,
};

/// Which candidate family a model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// Logistic regression
    Linear,
    /// Random forest
    Ensemble,
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "cal_logreg"),
            Self::Ensemble => write!(f, "cal_rf"),
        }
    }
}

/// A candidate family together with its hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateSpec {
    Linear(LogisticConfig),
    Ensemble(ForestConfig),
}

impl CandidateSpec {
    #[must_use]
    pub fn kind(&self) -> CandidateKind {
        match self {
            Self::Linear(_) => CandidateKind::Linear,
            Self::Ensemble(_) => CandidateKind::Ensemble,
        }
    }
}

/// The fitted classifier behind a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    Logistic(LogisticRegression),
    Forest(RandomForest),
}

/// Standardizer followed by one classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub scaler: ColumnStandardizer,
    pub estimator: Estimator,
}

impl Pipeline {
    /// Fit the standardizer, then the classifier on the standardized rows.
    ///
    /// # Errors
    /// Propagates estimator fitting errors.
    pub fn fit<R: Rng + ?Sized>(
        spec: &CandidateSpec,
        x: &[Row],
        y: &[bool],
        rng: &mut R,
    ) -> Result<Self, FitError> {
        let scaler = ColumnStandardizer::fit(x)?;
        let xt = scaler.transform_all(x);
        let estimator = match spec {
            CandidateSpec::Linear(config) => {
                Estimator::Logistic(LogisticRegression::fit(&xt, y, config)?)
            }
            CandidateSpec::Ensemble(config) => {
                Estimator::Forest(RandomForest::fit(&xt, y, config, rng)?)
            }
        };
        Ok(Self { scaler, estimator })
    }

    /// Uncalibrated score fed to Platt scaling.
    ///
    /// Log-odds for the linear model, mean tree probability for the forest.
    #[must_use]
    pub fn decision_score(&self, row: &Row) -> f64 {
        let t = self.scaler.transform(row);
        match &self.estimator {
            Estimator::Logistic(m) => m.decision(&t),
            Estimator::Forest(f) => f.predict_proba(&t),
        }
    }

    /// Reject parameters that would make scoring panic or return NaN.
    ///
    /// # Errors
    /// Returns a description of the first malformed part.
    pub fn check(&self) -> Result<(), String> {
        let finite = |v: &[f64]| v.iter().all(|x| x.is_finite());
        if !finite(&self.scaler.mean) || !self.scaler.scale.iter().all(|s| s.is_finite() && *s != 0.0) {
            return Err("standardizer holds non-finite or zero scale values".into());
        }
        match &self.estimator {
            Estimator::Logistic(m) => {
                if finite(&m.coef) && m.intercept.is_finite() {
                    Ok(())
                } else {
                    Err("logistic coefficients are not finite".into())
                }
            }
            Estimator::Forest(f) => f.check(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> CandidateKind {
        match self.estimator {
            Estimator::Logistic(_) => CandidateKind::Linear,
            Estimator::Forest(_) => CandidateKind::Ensemble,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn data() -> (Vec<Row>, Vec<bool>) {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        (0..600)
            .map(|_| {
                let phq = f64::from(rng.gen_range(0..=27_i32));
                let p = crate::model::sigmoid(-3.0 + 0.2 * phq);
                ([phq, 5.0, 20.0, 0.0, 0.0], rng.gen::<f64>() < p)
            })
            .unzip()
    }

    #[test]
    fn test_linear_pipeline_score_is_monotone() {
        let (x, y) = data();
        let spec = CandidateSpec::Linear(LogisticConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let p = Pipeline::fit(&spec, &x, &y, &mut rng).expect("Should fit");

        assert_eq!(p.kind(), CandidateKind::Linear);
        assert!(
            p.decision_score(&[25.0, 5.0, 20.0, 0.0, 0.0])
                > p.decision_score(&[2.0, 5.0, 20.0, 0.0, 0.0])
        );
    }

    #[test]
    fn test_ensemble_pipeline_scores_in_unit_interval() {
        let (x, y) = data();
        let spec = CandidateSpec::Ensemble(ForestConfig {
            n_trees: 8,
            max_depth: 4,
            workers: Some(1),
            ..Default::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let p = Pipeline::fit(&spec, &x, &y, &mut rng).expect("Should fit");

        assert_eq!(p.kind(), CandidateKind::Ensemble);
        let s = p.decision_score(&[14.0, 5.0, 20.0, 0.0, 0.0]);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn test_kind_display_matches_selection_tags() {
        assert_eq!(CandidateKind::Linear.to_string(), "cal_logreg");
        assert_eq!(CandidateKind::Ensemble.to_string(), "cal_rf");
    }
}
