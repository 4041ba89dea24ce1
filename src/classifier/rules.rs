//! Rule-based fault scoring.
//!
//! Every rule whose condition holds adds its weights to a per-label score.
//! Rules are independent and additive. The winning label is the highest score,
//! with ties going to the label declared first in [`FaultLabel`].

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::trace;

use super::{Classification, ClassifierKind, FaultClassifier};
use crate::analysis::CurveFeatures;
use crate::domain::FaultLabel;
use crate::error::Result;

/// Predicate over a feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    InflectionsAtLeast(usize),
    FillFactorBelow(f64),
    /// Half-open range `[low, high)`
    FillFactorBetween(f64, f64),
    FillFactorAbove(f64),
    CurrentRatioBelow(f64),
    CurrentRatioAbove(f64),
    VoltageRatioBelow(f64),
    VoltageRatioAbove(f64),
    LowVoltageSlopeAbove(f64),
}

impl Condition {
    pub fn holds(&self, f: &CurveFeatures) -> bool {
        match *self {
            Condition::InflectionsAtLeast(n) => f.inflection_points >= n,
            Condition::FillFactorBelow(t) => f.fill_factor < t,
            Condition::FillFactorBetween(lo, hi) => f.fill_factor >= lo && f.fill_factor < hi,
            Condition::FillFactorAbove(t) => f.fill_factor > t,
            Condition::CurrentRatioBelow(t) => f.i_ratio < t,
            Condition::CurrentRatioAbove(t) => f.i_ratio > t,
            Condition::VoltageRatioBelow(t) => f.v_ratio < t,
            Condition::VoltageRatioAbove(t) => f.v_ratio > t,
            Condition::LowVoltageSlopeAbove(t) => f.slope_low_v > t,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub condition: Condition,
    pub weights: Vec<(FaultLabel, f64)>,
}

impl Rule {
    pub fn new(condition: Condition, weights: &[(FaultLabel, f64)]) -> Self {
        Self {
            condition,
            weights: weights.to_vec(),
        }
    }
}

/// Immutable rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        use Condition::*;
        use FaultLabel::*;

        Self::new(vec![
            Rule::new(InflectionsAtLeast(2), &[(PartialShading, 0.5)]),
            Rule::new(
                FillFactorBelow(0.5),
                &[
                    (Degradation, 0.3),
                    (SeriesResistance, 0.2),
                    (BypassDiodeFailure, 0.2),
                ],
            ),
            Rule::new(
                FillFactorBetween(0.5, 0.65),
                &[(Degradation, 0.2), (SeriesResistance, 0.1)],
            ),
            Rule::new(FillFactorAbove(0.75), &[(Normal, 0.4)]),
            Rule::new(CurrentRatioBelow(0.85), &[(ShuntResistance, 0.3)]),
            Rule::new(CurrentRatioAbove(0.9), &[(Normal, 0.2)]),
            Rule::new(VoltageRatioBelow(0.7), &[(SeriesResistance, 0.3)]),
            Rule::new(VoltageRatioAbove(0.8), &[(Normal, 0.2)]),
            Rule::new(LowVoltageSlopeAbove(-0.05), &[(ShuntResistance, 0.4)]),
        ])
    }
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Accumulated score per label, indexed by [`FaultLabel::index`]
    pub fn scores(&self, features: &CurveFeatures) -> [f64; FaultLabel::COUNT] {
        let mut scores = [0.0; FaultLabel::COUNT];
        for rule in self.rules.iter().filter(|r| r.condition.holds(features)) {
            trace!(condition = ?rule.condition, "rule fired");
            for (label, weight) in &rule.weights {
                scores[label.index()] += weight;
            }
        }
        scores
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleBasedClassifier {
    rules: RuleSet,
}

impl RuleBasedClassifier {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }
}

impl FaultClassifier for RuleBasedClassifier {
    fn classify(&self, features: &CurveFeatures) -> Result<Classification> {
        let scores = self.rules.scores(features);

        // Strict comparison keeps the earliest label on ties
        let mut winner = FaultLabel::Normal;
        for label in FaultLabel::iter() {
            if scores[label.index()] > scores[winner.index()] {
                winner = label;
            }
        }

        let total: f64 = scores.iter().sum();
        let confidence = if total > 0.0 {
            (scores[winner.index()] / total).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Ok(Classification {
            fault_type: winner,
            confidence,
            scores: FaultLabel::iter().map(|l| (l, scores[l.index()])).collect(),
        })
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::RuleBased
    }
}
