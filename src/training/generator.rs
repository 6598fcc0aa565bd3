//! Synthetic respondent generator.
//!
//! Three correlated latent severities (depression, anxiety, distress) are
//! drawn from a multivariate normal, min-max normalised over the sample,
//! rescaled to each instrument's range and jittered. The self-harm item and
//! the ASQ screen are derived from the depression total.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::labels::{label_population, LabelModelConfig};
use super::TrainingError;
use crate::domain::{
    Dataset, FeatureVector, Outcome, GAD_TOTAL_RANGE, K10_TOTAL_RANGE, PHQ_ITEM9_RANGE,
    PHQ_TOTAL_RANGE,
};

/// Feature generator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Correlation of the latent (depression, anxiety, distress) severities
    pub correlation: [[f64; 3]; 3],
    /// Guard against a zero range during min-max normalisation
    pub minmax_eps: f64,
    pub phq_jitter: i64,
    pub gad_jitter: i64,
    pub k10_jitter: i64,
    pub item9_jitter: i64,
    pub asq_base: f64,
    pub asq_phq_weight: f64,
    pub asq_item9_weight: f64,
    pub asq_noise_std: f64,
    /// Upper bound of the ASQ "yes" probability
    pub asq_cap: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            correlation: [[1.0, 0.6, 0.5], [0.6, 1.0, 0.5], [0.5, 0.5, 1.0]],
            minmax_eps: 1e-9,
            phq_jitter: 1,
            gad_jitter: 1,
            k10_jitter: 2,
            item9_jitter: 1,
            asq_base: 0.03,
            asq_phq_weight: 0.03,
            asq_item9_weight: 0.20,
            asq_noise_std: 0.02,
            asq_cap: 0.85,
        }
    }
}

/// Standard normal draw (Box-Muller, cosine branch).
pub(crate) fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // 1 - U lies in (0, 1], so the log is finite.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Lower-triangular Cholesky factor of a 3x3 correlation matrix.
fn cholesky(m: &[[f64; 3]; 3]) -> Result<[[f64; 3]; 3], TrainingError> {
    let mut l = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..=i {
            let dot: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = m[i][i] - dot;
                if !(d.is_finite() && d > 0.0) {
                    return Err(TrainingError::InvalidConfig(
                        "correlation matrix is not positive definite".into(),
                    ));
                }
                l[i][j] = d.sqrt();
            } else {
                if (m[i][j] - m[j][i]).abs() > 1e-12 {
                    return Err(TrainingError::InvalidConfig(
                        "correlation matrix is not symmetric".into(),
                    ));
                }
                l[i][j] = (m[i][j] - dot) / l[j][j];
            }
        }
    }
    Ok(l)
}

fn jittered<R: Rng + ?Sized>(value: i64, width: i64, range: (i64, i64), rng: &mut R) -> i64 {
    let noise = if width > 0 { rng.gen_range(-width..=width) } else { 0 };
    (value + noise).clamp(range.0, range.1)
}

/// Draw `n` feature vectors.
///
/// Every field of every returned vector lies inside its instrument's range.
///
/// # Errors
/// Returns error for `n == 0` or an invalid correlation matrix.
pub fn generate_features<R: Rng + ?Sized>(
    n: usize,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<Vec<FeatureVector>, TrainingError> {
    if n == 0 {
        return Err(TrainingError::InvalidConfig(
            "sample count must be positive".into(),
        ));
    }
    let l = cholesky(&config.correlation)?;

    let latent: Vec<[f64; 3]> = (0..n)
        .map(|_| {
            let z = [standard_normal(rng), standard_normal(rng), standard_normal(rng)];
            let mut v = [0.0; 3];
            for i in 0..3 {
                v[i] = (0..=i).map(|k| l[i][k] * z[k]).sum();
            }
            v
        })
        .collect();

    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for v in &latent {
        for c in 0..3 {
            lo[c] = lo[c].min(v[c]);
            hi[c] = hi[c].max(v[c]);
        }
    }
    let unit = |v: &[f64; 3], c: usize| (v[c] - lo[c]) / (hi[c] - lo[c] + config.minmax_eps);

    let features = latent
        .iter()
        .map(|v| {
            let phq = (unit(v, 0) * 27.0).round() as i64;
            let gad = (unit(v, 1) * 21.0).round() as i64;
            let k10 = (10.0 + unit(v, 2) * 40.0).round() as i64;

            let phq_total = jittered(phq, config.phq_jitter, PHQ_TOTAL_RANGE, rng);
            let gad_total = jittered(gad, config.gad_jitter, GAD_TOTAL_RANGE, rng);
            let k10_total = jittered(k10, config.k10_jitter, K10_TOTAL_RANGE, rng);
            let phq_item9 = jittered(phq_total / 7, config.item9_jitter, PHQ_ITEM9_RANGE, rng);

            let p_asq = (config.asq_base
                + config.asq_phq_weight * phq_total as f64 / 27.0
                + config.asq_item9_weight * phq_item9 as f64 / 3.0
                + config.asq_noise_std * standard_normal(rng))
            .clamp(0.0, config.asq_cap);
            let asq_any_yes = rng.gen::<f64>() < p_asq;

            FeatureVector {
                phq_total,
                gad_total,
                k10_total,
                phq_item9,
                asq_any_yes,
            }
        })
        .collect();

    Ok(features)
}

/// Generate a labelled population and log each outcome's prevalence.
///
/// # Errors
/// Propagates generator configuration errors.
pub fn generate_population<R: Rng + ?Sized>(
    n: usize,
    generator: &GeneratorConfig,
    labels: &LabelModelConfig,
    rng: &mut R,
) -> Result<Dataset, TrainingError> {
    let features = generate_features(n, generator, rng)?;
    let dataset = label_population(features, labels, rng);

    info!("Generated synthetic population: {} samples", dataset.len());
    for outcome in Outcome::ALL {
        info!("Prevalence {outcome}: {:.3}", dataset.prevalence(outcome));
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn correlation(xs: &[f64], ys: &[f64]) -> f64 {
        let n = xs.len() as f64;
        let (mx, my) = (xs.iter().sum::<f64>() / n, ys.iter().sum::<f64>() / n);
        let cov: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
        let vx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
        let vy: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();
        cov / (vx * vy).sqrt()
    }

    #[test]
    fn test_features_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let features = generate_features(5000, &GeneratorConfig::default(), &mut rng)
            .expect("Should generate");

        assert_eq!(features.len(), 5000);
        for f in &features {
            assert!(f.validate().is_ok(), "out of range: {f:?}");
        }
    }

    #[test]
    fn test_totals_are_positively_correlated() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let features = generate_features(8000, &GeneratorConfig::default(), &mut rng)
            .expect("Should generate");
        let phq: Vec<f64> = features.iter().map(|f| f.phq_total as f64).collect();
        let gad: Vec<f64> = features.iter().map(|f| f.gad_total as f64).collect();
        let item9: Vec<f64> = features.iter().map(|f| f.phq_item9 as f64).collect();

        let r = correlation(&phq, &gad);
        assert!(r > 0.4 && r < 0.8, "phq/gad r={r}");
        assert!(correlation(&phq, &item9) > 0.3);
    }

    #[test]
    fn test_asq_positive_rate_is_low() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let features = generate_features(10_000, &GeneratorConfig::default(), &mut rng)
            .expect("Should generate");
        let rate = features.iter().filter(|f| f.asq_any_yes).count() as f64 / 10_000.0;
        assert!(rate > 0.02 && rate < 0.30, "rate={rate}");
    }

    #[test]
    fn test_same_seed_same_population() {
        let config = GeneratorConfig::default();
        let a = generate_features(500, &config, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        let b = generate_features(500, &config, &mut ChaCha8Rng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_sample_does_not_divide_by_zero() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let features = generate_features(1, &GeneratorConfig::default(), &mut rng)
            .expect("Should generate");
        assert!(features[0].validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_configuration() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(matches!(
            generate_features(0, &GeneratorConfig::default(), &mut rng),
            Err(TrainingError::InvalidConfig(_))
        ));

        let config = GeneratorConfig {
            correlation: [[1.0, 2.0, 0.0], [2.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            ..Default::default()
        };
        assert!(matches!(
            generate_features(10, &config, &mut rng),
            Err(TrainingError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_standard_normal_moments() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let draws: Vec<f64> = (0..20_000).map(|_| standard_normal(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!(mean.abs() < 0.03, "mean={mean}");
        assert!((var - 1.0).abs() < 0.05, "var={var}");
    }
}
