use std::fmt;

use serde::{Deserialize, Serialize};

/// How sure the model is, bucketed on the over-perform probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_probability(probability: f64) -> Self {
        if probability >= 0.8 {
            Self::High
        } else if probability >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        };
        write!(f, "{s}")
    }
}

/// Actionable tier derived from (prediction, over-perform probability).
///
/// Over-perform predictions split at 0.7; under-perform predictions split at
/// 0.7 probability of the *under* outcome, i.e. 0.3 on the over scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongStart,
    ConsiderStarting,
    ConsiderBenching,
    Avoid,
}

impl Recommendation {
    pub fn derive(prediction: u8, over_probability: f64) -> Self {
        if prediction == 1 {
            if over_probability >= 0.7 {
                Self::StrongStart
            } else {
                Self::ConsiderStarting
            }
        } else if 1.0 - over_probability >= 0.7 {
            Self::Avoid
        } else {
            Self::ConsiderBenching
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StrongStart => "STRONG START",
            Self::ConsiderStarting => "CONSIDER STARTING",
            Self::ConsiderBenching => "CONSIDER BENCHING",
            Self::Avoid => "AVOID",
        };
        write!(f, "{s}")
    }
}

/// A globally important feature annotated with one record's own value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyFeature {
    pub feature: String,
    pub value: f64,
    pub importance: f64,
}

/// One finished prediction. Constructed fresh per call, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub player_name: String,
    pub season: u16,
    pub week: u8,
    pub projection: f64,
    pub prediction: u8,
    pub over_perform_probability: f64,
    pub confidence: ConfidenceTier,
    pub recommendation: Recommendation,
    pub key_features: Vec<KeyFeature>,
}

/// A per-player failure, isolated so batch callers can keep going.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionFailure {
    pub player_name: String,
    pub season: u16,
    pub week: u8,
    pub error: String,
}

/// Outcome of one prediction call: either a result or a labeled failure.
#[derive(Debug, Clone)]
pub enum PredictionOutcome {
    Ok(PredictionResult),
    Failed(PredictionFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_tiers() {
        assert_eq!(ConfidenceTier::from_probability(0.85), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_probability(0.8), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_probability(0.65), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_probability(0.59), ConfidenceTier::Low);
    }

    #[test]
    fn test_recommendation_over_perform_side() {
        assert_eq!(Recommendation::derive(1, 0.85), Recommendation::StrongStart);
        assert_eq!(Recommendation::derive(1, 0.7), Recommendation::StrongStart);
        assert_eq!(Recommendation::derive(1, 0.62), Recommendation::ConsiderStarting);
    }

    #[test]
    fn test_recommendation_under_perform_side() {
        // 0.25 over-prob means 0.75 under-prob: confident under-performance.
        assert_eq!(Recommendation::derive(0, 0.25), Recommendation::Avoid);
        assert_eq!(Recommendation::derive(0, 0.42), Recommendation::ConsiderBenching);
    }

    #[test]
    fn test_display_strings_match_report_vocabulary() {
        assert_eq!(ConfidenceTier::High.to_string(), "HIGH");
        assert_eq!(Recommendation::StrongStart.to_string(), "STRONG START");
        assert_eq!(Recommendation::Avoid.to_string(), "AVOID");
    }
}
