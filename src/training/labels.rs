//! Noisy logistic label model.
//!
//! Each outcome is a Bernoulli draw whose log-odds are an affine function of
//! the features plus Gaussian noise. Labels are drawn independently.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::generator::standard_normal;
use crate::domain::{Dataset, FeatureVector, Outcome, SyntheticSample, N_FEATURES};
use crate::model::sigmoid;

/// `log-odds = intercept + weights . features` (canonical column order).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogitWeights {
    pub intercept: f64,
    pub weights: [f64; N_FEATURES],
}

impl LogitWeights {
    #[must_use]
    pub fn log_odds(&self, features: &FeatureVector) -> f64 {
        self.intercept
            + self
                .weights
                .iter()
                .zip(features.to_array())
                .map(|(w, v)| w * v)
                .sum::<f64>()
    }
}

/// Ground-truth label model for all three outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelModelConfig {
    /// Standard deviation of the noise added to each log-odds
    pub noise_std: f64,
    pub suicidal: LogitWeights,
    pub depression: LogitWeights,
    pub stress: LogitWeights,
}

impl Default for LabelModelConfig {
    fn default() -> Self {
        Self {
            noise_std: 0.25,
            // phq, gad, k10, item9, asq
            suicidal: LogitWeights {
                intercept: -3.2,
                weights: [0.12, 0.0, 0.0, 0.85, 1.10],
            },
            depression: LogitWeights {
                intercept: -2.6,
                weights: [0.11, 0.10, 0.0, 0.0, 0.0],
            },
            stress: LogitWeights {
                intercept: -3.0,
                weights: [0.0, 0.05, 0.09, 0.0, 0.0],
            },
        }
    }
}

impl LabelModelConfig {
    #[must_use]
    pub fn weights(&self, outcome: Outcome) -> &LogitWeights {
        match outcome {
            Outcome::Suicidal => &self.suicidal,
            Outcome::Depression => &self.depression,
            Outcome::Stress => &self.stress,
        }
    }

    /// Draw one label.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        outcome: Outcome,
        features: &FeatureVector,
        rng: &mut R,
    ) -> bool {
        let z = self.weights(outcome).log_odds(features) + self.noise_std * standard_normal(rng);
        rng.gen::<f64>() < sigmoid(z)
    }
}

/// Attach labels for every outcome to each feature vector.
pub fn label_population<R: Rng + ?Sized>(
    features: Vec<FeatureVector>,
    config: &LabelModelConfig,
    rng: &mut R,
) -> Dataset {
    let samples = features
        .into_iter()
        .map(|f| SyntheticSample {
            features: f,
            suicidal: config.draw(Outcome::Suicidal, &f, rng),
            depression: config.draw(Outcome::Depression, &f, rng),
            stress: config.draw(Outcome::Stress, &f, rng),
        })
        .collect();
    Dataset::new(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn respondent(phq: i64, gad: i64, k10: i64, item9: i64, asq: bool) -> FeatureVector {
        FeatureVector {
            phq_total: phq,
            gad_total: gad,
            k10_total: k10,
            phq_item9: item9,
            asq_any_yes: asq,
        }
    }

    #[test]
    fn test_log_odds_match_reference_formulas() {
        let config = LabelModelConfig::default();
        let f = respondent(10, 8, 30, 1, true);

        let s = -3.2 + 0.12 * 10.0 + 0.85 * 1.0 + 1.10;
        let d = -2.6 + 0.11 * 10.0 + 0.10 * 8.0;
        let t = -3.0 + 0.09 * 30.0 + 0.05 * 8.0;
        assert!((config.suicidal.log_odds(&f) - s).abs() < 1e-12);
        assert!((config.depression.log_odds(&f) - d).abs() < 1e-12);
        assert!((config.stress.log_odds(&f) - t).abs() < 1e-12);
    }

    #[test]
    fn test_label_rate_tracks_log_odds() {
        let config = LabelModelConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let low = respondent(0, 0, 10, 0, false);
        let high = respondent(27, 21, 50, 3, true);

        let rate = |f: &FeatureVector, rng: &mut ChaCha8Rng| {
            (0..4000)
                .filter(|_| config.draw(Outcome::Suicidal, f, rng))
                .count() as f64
                / 4000.0
        };
        let (lo, hi) = (rate(&low, &mut rng), rate(&high, &mut rng));
        // sigmoid(-3.2) is about 0.04; the maximal respondent is near certain.
        assert!(lo < 0.08, "lo={lo}");
        assert!(hi > 0.95, "hi={hi}");
    }

    #[test]
    fn test_label_population_keeps_order() {
        let features = vec![respondent(1, 1, 11, 0, false), respondent(20, 15, 40, 2, true)];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let ds = label_population(features.clone(), &LabelModelConfig::default(), &mut rng);

        assert_eq!(ds.len(), 2);
        assert_eq!(ds.samples[0].features, features[0]);
        assert_eq!(ds.samples[1].features, features[1]);
    }
}
