//! Instrument severity bands and the overall screening tier.
//!
//! These are the conventional published cut-offs for each instrument. They are
//! shown next to the model percentages and play no part in model training.

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;

/// PHQ-9 depression severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhqBand {
    None,
    Mild,
    Moderate,
    ModeratelySevere,
    Severe,
}

impl PhqBand {
    #[must_use]
    pub fn from_total(total: i64) -> Self {
        match total {
            t if t <= 4 => Self::None,
            t if t <= 9 => Self::Mild,
            t if t <= 14 => Self::Moderate,
            t if t <= 19 => Self::ModeratelySevere,
            _ => Self::Severe,
        }
    }
}

/// GAD-7 anxiety severity band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GadBand {
    None,
    Mild,
    Moderate,
    Severe,
}

impl GadBand {
    #[must_use]
    pub fn from_total(total: i64) -> Self {
        match total {
            t if t <= 4 => Self::None,
            t if t <= 9 => Self::Mild,
            t if t <= 14 => Self::Moderate,
            _ => Self::Severe,
        }
    }
}

/// K10 psychological distress band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum K10Band {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl K10Band {
    #[must_use]
    pub fn from_total(total: i64) -> Self {
        match total {
            t if t <= 15 => Self::Low,
            t if t <= 21 => Self::Medium,
            t if t <= 29 => Self::High,
            _ => Self::VeryHigh,
        }
    }
}

/// Overall screening tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Low,
    Mid,
    High,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Mid => write!(f, "MID"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Banded view of one respondent's answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAssessment {
    pub phq_band: PhqBand,
    pub gad_band: GadBand,
    pub k10_band: K10Band,
    pub tier: Tier,
    /// Why the tier was assigned; empty for `Low`.
    pub rationale: Vec<String>,
}

/// Band each instrument and derive the overall tier.
///
/// Any direct self-harm signal (ASQ positive, PHQ item 9 above zero or a PHQ
/// total of 20+) forces `High` regardless of the other instruments.
#[must_use]
pub fn assess(features: &FeatureVector) -> SurveyAssessment {
    let phq_band = PhqBand::from_total(features.phq_total);
    let gad_band = GadBand::from_total(features.gad_total);
    let k10_band = K10Band::from_total(features.k10_total);
    let item9_flag = features.phq_item9 > 0;

    let mut rationale = Vec::new();

    if features.asq_any_yes || item9_flag || features.phq_total >= 20 {
        if features.asq_any_yes {
            rationale.push("ASQ positive screen".to_string());
        }
        if item9_flag {
            rationale.push("PHQ-9 item 9 above zero".to_string());
        }
        if features.phq_total >= 20 {
            rationale.push("PHQ-9 total 20 or higher".to_string());
        }
        return SurveyAssessment {
            phq_band,
            gad_band,
            k10_band,
            tier: Tier::High,
            rationale,
        };
    }

    let phq_high = matches!(phq_band, PhqBand::ModeratelySevere | PhqBand::Severe);
    let tier = if phq_high || gad_band == GadBand::Severe || k10_band == K10Band::VeryHigh {
        if phq_high {
            rationale.push(format!("PHQ-9 {}", band_label(&phq_band)));
        }
        if gad_band == GadBand::Severe {
            rationale.push("GAD-7 severe".to_string());
        }
        if k10_band == K10Band::VeryHigh {
            rationale.push("K10 very high".to_string());
        }
        Tier::High
    } else if phq_band == PhqBand::Moderate
        || gad_band == GadBand::Moderate
        || k10_band == K10Band::High
    {
        if phq_band == PhqBand::Moderate {
            rationale.push("PHQ-9 moderate".to_string());
        }
        if gad_band == GadBand::Moderate {
            rationale.push("GAD-7 moderate".to_string());
        }
        if k10_band == K10Band::High {
            rationale.push("K10 high".to_string());
        }
        Tier::Mid
    } else {
        Tier::Low
    };

    SurveyAssessment {
        phq_band,
        gad_band,
        k10_band,
        tier,
        rationale,
    }
}

fn band_label(band: &PhqBand) -> &'static str {
    match band {
        PhqBand::None => "none",
        PhqBand::Mild => "mild",
        PhqBand::Moderate => "moderate",
        PhqBand::ModeratelySevere => "moderately severe",
        PhqBand::Severe => "severe",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(phq: i64, gad: i64, k10: i64, item9: i64, asq: bool) -> FeatureVector {
        FeatureVector {
            phq_total: phq,
            gad_total: gad,
            k10_total: k10,
            phq_item9: item9,
            asq_any_yes: asq,
        }
    }

    #[test]
    fn test_band_cutoffs() {
        assert_eq!(PhqBand::from_total(4), PhqBand::None);
        assert_eq!(PhqBand::from_total(5), PhqBand::Mild);
        assert_eq!(PhqBand::from_total(15), PhqBand::ModeratelySevere);
        assert_eq!(PhqBand::from_total(20), PhqBand::Severe);
        assert_eq!(GadBand::from_total(14), GadBand::Moderate);
        assert_eq!(GadBand::from_total(15), GadBand::Severe);
        assert_eq!(K10Band::from_total(15), K10Band::Low);
        assert_eq!(K10Band::from_total(22), K10Band::High);
        assert_eq!(K10Band::from_total(30), K10Band::VeryHigh);
    }

    #[test]
    fn test_self_harm_signal_forces_high() {
        let a = assess(&fv(2, 1, 12, 1, false));
        assert_eq!(a.tier, Tier::High);
        assert_eq!(a.rationale, vec!["PHQ-9 item 9 above zero".to_string()]);

        let a = assess(&fv(2, 1, 12, 0, true));
        assert_eq!(a.tier, Tier::High);
    }

    #[test]
    fn test_tiers_from_bands() {
        assert_eq!(assess(&fv(16, 3, 12, 0, false)).tier, Tier::High);
        assert_eq!(assess(&fv(3, 3, 35, 0, false)).tier, Tier::High);

        let mid = assess(&fv(11, 3, 12, 0, false));
        assert_eq!(mid.tier, Tier::Mid);
        assert_eq!(mid.rationale, vec!["PHQ-9 moderate".to_string()]);

        let low = assess(&fv(2, 1, 12, 0, false));
        assert_eq!(low.tier, Tier::Low);
        assert!(low.rationale.is_empty());
    }
}
