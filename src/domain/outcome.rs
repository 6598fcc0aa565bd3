//! Risk outcomes and the prediction returned to callers.

use serde::{Deserialize, Serialize};

/// Default display margin for `soften`.
pub const DEFAULT_SOFTEN_EPS: f64 = 0.005;

/// The three independently modelled risk outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Suicidal signal
    Suicidal,
    /// Depression risk
    Depression,
    /// Stress risk
    Stress,
}

impl Outcome {
    /// All outcomes in training order.
    pub const ALL: [Outcome; 3] = [Self::Suicidal, Self::Depression, Self::Stress];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suicidal => "suicidal",
            Self::Depression => "depression",
            Self::Stress => "stress",
        }
    }

    /// File name of this outcome's model artifact.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!("{}_model.json", self.as_str())
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a model output into [0, 1].
///
/// Floating-point overshoot is corrected silently; NaN maps to 0.
#[must_use]
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        return 0.0;
    }
    p.clamp(0.0, 1.0)
}

/// Map a probability into [eps, 1 - eps] for display.
///
/// Presentation only: the canonical probability is never softened.
#[must_use]
pub fn soften(p: f64, eps: f64) -> f64 {
    clamp_probability(p).clamp(eps, 1.0 - eps)
}

/// Three independent risk percentages, each in [0, 100].
///
/// They are not a distribution over exclusive classes and need not sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub suicidal_signal_pct: f64,
    pub depression_risk_pct: f64,
    pub stress_risk_pct: f64,
}

impl RiskPrediction {
    /// Build from raw model probabilities (clamped, then scaled to percent).
    #[must_use]
    pub fn from_probabilities(suicidal: f64, depression: f64, stress: f64) -> Self {
        Self {
            suicidal_signal_pct: clamp_probability(suicidal) * 100.0,
            depression_risk_pct: clamp_probability(depression) * 100.0,
            stress_risk_pct: clamp_probability(stress) * 100.0,
        }
    }

    /// Percentage for a single outcome.
    #[must_use]
    pub fn pct(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Suicidal => self.suicidal_signal_pct,
            Outcome::Depression => self.depression_risk_pct,
            Outcome::Stress => self.stress_risk_pct,
        }
    }

    /// Copy with every percentage kept away from exactly 0% and 100%.
    #[must_use]
    pub fn softened(&self, eps: f64) -> Self {
        let s = |pct: f64| soften(pct / 100.0, eps) * 100.0;
        Self {
            suicidal_signal_pct: s(self.suicidal_signal_pct),
            depression_risk_pct: s(self.depression_risk_pct),
            stress_risk_pct: s(self.stress_risk_pct),
        }
    }
}
