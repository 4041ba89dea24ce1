//! ML Model Definitions
//!
//! Shared prediction type and the trait every trained classifier implements.

use super::{FeatureVector, ModelMetadata, ModelType};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Trait for trained classifiers
pub trait MLClassifier: Send + Sync + std::fmt::Debug {
    /// Predict a class from (already standardized) features
    fn predict(&self, features: &FeatureVector) -> Result<ClassPrediction>;

    /// Get model metadata
    fn metadata(&self) -> &ModelMetadata;

    /// Get model type
    fn model_type(&self) -> ModelType {
        self.metadata().model_type
    }

    /// Class ids known to the model, in probability order
    fn classes(&self) -> &[usize] {
        &self.metadata().classes
    }
}

/// ML Prediction Result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrediction {
    pub class: usize,
    /// Probability of `class`
    pub confidence: f64,
    /// (class id, probability) for every known class
    pub probabilities: Vec<(usize, f64)>,
}

impl ClassPrediction {
    /// Pick the most probable class; the first one wins ties.
    ///
    /// Probabilities are renormalized to sum to one. If they carry no mass
    /// the distribution falls back to uniform.
    pub fn from_probabilities(classes: &[usize], probabilities: &[f64]) -> Result<Self> {
        if classes.is_empty() || classes.len() != probabilities.len() {
            anyhow::bail!(
                "Probability count mismatch: {} classes, {} probabilities",
                classes.len(),
                probabilities.len()
            );
        }

        let cleaned: Vec<f64> = probabilities
            .iter()
            .map(|p| if p.is_finite() && *p > 0.0 { *p } else { 0.0 })
            .collect();
        let total: f64 = cleaned.iter().sum();
        let normalized: Vec<f64> = if total > 0.0 {
            cleaned.iter().map(|p| p / total).collect()
        } else {
            vec![1.0 / classes.len() as f64; classes.len()]
        };

        let mut best = 0;
        for (k, p) in normalized.iter().enumerate() {
            if *p > normalized[best] {
                best = k;
            }
        }

        Ok(Self {
            class: classes[best],
            confidence: normalized[best].clamp(0.0, 1.0),
            probabilities: classes.iter().copied().zip(normalized).collect(),
        })
    }
}
