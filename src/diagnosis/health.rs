//! Health Scoring
//!
//! Deterministic 0-100 score from curve shape and the diagnosed fault:
//!
//! `clamp(0, 100, fill_factor·70 + (i_ratio + v_ratio)·15 + penalty[fault])`
//!
//! A textbook module (FF ~0.8, ratios ~0.9) lands just above 80; each fault
//! then costs a fixed penalty taken from configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;

use crate::analysis::CurveFeatures;
use crate::config::HealthConfig;
use crate::domain::FaultLabel;

/// Coarse reading of a health score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HealthBand {
    Critical,
    Poor,
    Fair,
    Good,
}

impl HealthBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthBand::Good
        } else if score >= 60.0 {
            HealthBand::Fair
        } else if score >= 40.0 {
            HealthBand::Poor
        } else {
            HealthBand::Critical
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthScorer {
    fill_factor_weight: f64,
    ratio_weight: f64,
    penalties: HashMap<FaultLabel, f64>,
    default_penalty: f64,
}

impl Default for HealthScorer {
    fn default() -> Self {
        Self::new(&HealthConfig::default())
    }
}

impl HealthScorer {
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            fill_factor_weight: config.fill_factor_weight,
            ratio_weight: config.ratio_weight,
            penalties: config.penalties.clone(),
            default_penalty: config.default_penalty,
        }
    }

    pub fn penalty(&self, fault: FaultLabel) -> f64 {
        self.penalties
            .get(&fault)
            .copied()
            .unwrap_or(self.default_penalty)
    }

    pub fn score(&self, features: &CurveFeatures, fault: FaultLabel) -> f64 {
        let raw = features.fill_factor * self.fill_factor_weight
            + (features.i_ratio + features.v_ratio) * self.ratio_weight
            + self.penalty(fault);

        if raw.is_finite() {
            raw.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn features(ff: f64, i_ratio: f64, v_ratio: f64) -> CurveFeatures {
        CurveFeatures {
            fill_factor: ff,
            i_ratio,
            v_ratio,
            ..CurveFeatures::default()
        }
    }

    #[test]
    fn test_reference_module_scores_above_80() {
        let score = HealthScorer::default().score(&features(0.786, 0.922, 0.852), FaultLabel::Normal);
        assert!((score - (0.786 * 70.0 + 1.774 * 15.0)).abs() < 1e-9);
        assert!(score > 80.0);
        assert_eq!(HealthBand::from_score(score), HealthBand::Good);
    }

    #[rstest]
    #[case(FaultLabel::Normal, 0.0)]
    #[case(FaultLabel::Soiling, -10.0)]
    #[case(FaultLabel::PartialShading, -15.0)]
    #[case(FaultLabel::ShuntResistance, -20.0)]
    #[case(FaultLabel::SeriesResistance, -25.0)]
    #[case(FaultLabel::Degradation, -30.0)]
    #[case(FaultLabel::BypassDiodeFailure, -40.0)]
    fn test_penalty_table(#[case] fault: FaultLabel, #[case] penalty: f64) {
        assert_eq!(HealthScorer::default().penalty(fault), penalty);
    }

    #[test]
    fn test_missing_penalty_uses_default() {
        let mut config = HealthConfig::default();
        config.penalties.remove(&FaultLabel::Soiling);
        let scorer = HealthScorer::new(&config);
        assert_eq!(scorer.penalty(FaultLabel::Soiling), -30.0);
    }

    #[test]
    fn test_score_is_clamped() {
        let scorer = HealthScorer::default();
        assert_eq!(scorer.score(&features(0.0, 0.0, 0.0), FaultLabel::BypassDiodeFailure), 0.0);
        assert_eq!(scorer.score(&features(2.0, 2.0, 2.0), FaultLabel::Normal), 100.0);
        assert_eq!(scorer.score(&features(f64::NAN, 0.9, 0.8), FaultLabel::Normal), 0.0);
        assert_eq!(
            scorer.score(&features(f64::INFINITY, 0.9, 0.8), FaultLabel::Normal),
            0.0
        );
    }

    #[rstest]
    #[case(100.0, HealthBand::Good)]
    #[case(80.0, HealthBand::Good)]
    #[case(79.9, HealthBand::Fair)]
    #[case(60.0, HealthBand::Fair)]
    #[case(45.0, HealthBand::Poor)]
    #[case(39.99, HealthBand::Critical)]
    #[case(0.0, HealthBand::Critical)]
    fn test_bands(#[case] score: f64, #[case] band: HealthBand) {
        assert_eq!(HealthBand::from_score(score), band);
    }
}
