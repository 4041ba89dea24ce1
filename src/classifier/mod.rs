//! Fault classification strategies.
//!
//! Two interchangeable implementations of [`FaultClassifier`]:
//! - [`RuleBasedClassifier`]: weighted threshold rules, always available
//! - [`ClassifierState`]: a fitted scaler plus a trained SVM or random forest

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::analysis::CurveFeatures;
use crate::domain::FaultLabel;
use crate::error::Result;

pub mod rules;
pub mod trained;

pub use rules::{Condition, Rule, RuleBasedClassifier, RuleSet};
pub use trained::{ClassifierState, TrainingReport};

/// Which strategy produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClassifierKind {
    RuleBased,
    Trained,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub fault_type: FaultLabel,
    /// In [0, 1]
    pub confidence: f64,
    /// Per-label score or probability, in label declaration order
    pub scores: Vec<(FaultLabel, f64)>,
}

impl Classification {
    pub fn score(&self, label: FaultLabel) -> f64 {
        self.scores
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, s)| *s)
            .unwrap_or(0.0)
    }
}

pub trait FaultClassifier: Send + Sync {
    fn classify(&self, features: &CurveFeatures) -> Result<Classification>;

    fn kind(&self) -> ClassifierKind;
}
