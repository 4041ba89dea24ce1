//! Trained classifier state.
//!
//! A [`ClassifierState`] is built whole from labelled curves and never
//! modified afterwards; retraining produces a new state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Classification, ClassifierKind, FaultClassifier};
use crate::analysis::{CurveFeatures, ParameterExtractor};
use crate::config::ClassifierConfig;
use crate::domain::FaultLabel;
use crate::error::{DiagnosisError, Result};
use crate::ml::models::MLClassifier;
use crate::ml::training::{ModelTrainer, TrainingDataset, TrainingSample};
use crate::ml::{ModelType, StandardScaler};

/// Summary of a successful training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_id: String,
    pub model_type: ModelType,
    pub samples: usize,
    pub classes: Vec<FaultLabel>,
    /// Accuracy on the training set itself
    pub training_accuracy: f64,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ClassifierState {
    scaler: StandardScaler,
    model: Box<dyn MLClassifier>,
    report: TrainingReport,
}

impl ClassifierState {
    /// Extract features from every sample, standardize them and fit `model_type`.
    ///
    /// Fails without side effects on an unsupported model type, invalid curves,
    /// unknown labels or fewer than two distinct labels.
    pub fn fit(
        samples: &[TrainingSample],
        model_type: ModelType,
        config: &ClassifierConfig,
        extractor: &ParameterExtractor,
    ) -> Result<Self> {
        if !model_type.is_implemented() {
            return Err(DiagnosisError::UnsupportedModel(model_type));
        }

        let mut features = Vec::with_capacity(samples.len());
        let mut targets = Vec::with_capacity(samples.len());
        for sample in samples {
            let curve = sample.curve()?;
            let label = sample.label()?;
            features.push(extractor.extract(&curve).features().to_feature_vector());
            targets.push(label.index());
        }

        let dataset = TrainingDataset::new(features, targets)?;
        let distinct = dataset.classes().len();
        if distinct < 2 {
            return Err(DiagnosisError::InsufficientLabels { distinct });
        }

        let x = dataset.matrix()?;
        let scaler = StandardScaler::fit(&x)?;
        let scaled = scaler.transform_matrix(&x)?;

        let model = ModelTrainer::new(config.clone()).train(
            model_type,
            &scaled,
            &dataset.targets,
            dataset.feature_names(),
        )?;

        let metadata = model.metadata();
        let report = TrainingReport {
            model_id: metadata.model_id.clone(),
            model_type,
            samples: dataset.len(),
            classes: metadata
                .classes
                .iter()
                .filter_map(|&c| FaultLabel::from_index(c))
                .collect(),
            training_accuracy: metadata.validation_metrics.accuracy,
            trained_at: metadata.trained_at,
        };

        Ok(Self {
            scaler,
            model,
            report,
        })
    }

    pub fn report(&self) -> &TrainingReport {
        &self.report
    }

    pub fn model_type(&self) -> ModelType {
        self.model.model_type()
    }
}

impl FaultClassifier for ClassifierState {
    fn classify(&self, features: &CurveFeatures) -> Result<Classification> {
        let prediction = self
            .scaler
            .transform(&features.to_feature_vector())
            .and_then(|scaled| self.model.predict(&scaled))
            .map_err(|e| DiagnosisError::Prediction(e.to_string()))?;

        let fault_type = FaultLabel::from_index(prediction.class).ok_or_else(|| {
            DiagnosisError::Prediction(format!("unknown class id {}", prediction.class))
        })?;

        let mut scores: Vec<(FaultLabel, f64)> = prediction
            .probabilities
            .iter()
            .filter_map(|&(c, p)| FaultLabel::from_index(c).map(|l| (l, p)))
            .collect();
        scores.sort_by_key(|(l, _)| *l);

        Ok(Classification {
            fault_type,
            confidence: prediction.confidence.clamp(0.0, 1.0),
            scores,
        })
    }

    fn kind(&self) -> ClassifierKind {
        ClassifierKind::Trained
    }
}
