//! Diagnosis orchestration.
//!
//! [`DiagnosisEngine`] runs validate, extract, classify, score and recommend
//! for one measured curve. It prefers a trained classifier when one has been
//! installed and otherwise answers with the rule table.
//!
//! Training builds a complete [`ClassifierState`] without holding any lock and
//! publishes it with a single pointer swap, so concurrent `diagnose` calls see
//! either the previous model or the new one.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::{CurveParameters, ParameterExtractor};
use crate::classifier::{
    Classification, ClassifierKind, ClassifierState, FaultClassifier, RuleBasedClassifier,
    TrainingReport,
};
use crate::config::Config;
use crate::domain::{Curve, FaultLabel, ModelParameters, STC_TEMPERATURE_C};
use crate::error::{DiagnosisError, Result};
use crate::ml::training::TrainingSample;
use crate::ml::ModelType;
use crate::simulation::{CurveSimulator, DiodeSolver};

pub mod health;
pub mod recommendations;

pub use health::{HealthBand, HealthScorer};
pub use recommendations::Recommender;

/// Extracted figures of merit plus the ambient temperature correction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisParameters {
    #[serde(flatten)]
    pub curve: CurveParameters,
    pub temperature_c: f64,
    /// Open-circuit voltage referred to 25 °C
    pub v_oc_stc: f64,
}

impl DiagnosisParameters {
    fn new(curve: CurveParameters, temperature_c: f64, voc_temp_coefficient: f64) -> Self {
        let factor = 1.0 + voc_temp_coefficient * (temperature_c - STC_TEMPERATURE_C);
        let v_oc_stc = if factor > 0.0 && factor.is_finite() {
            curve.v_oc / factor
        } else {
            curve.v_oc
        };

        Self {
            curve,
            temperature_c,
            v_oc_stc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub id: Uuid,
    pub diagnosed_at: DateTime<Utc>,
    pub fault_type: FaultLabel,
    pub confidence: f64,
    pub health_score: f64,
    pub health_band: HealthBand,
    pub parameters: DiagnosisParameters,
    pub recommendations: Vec<String>,
    pub classifier: ClassifierKind,
}

#[derive(Debug)]
pub struct DiagnosisEngine {
    config: Config,
    simulator: CurveSimulator,
    extractor: ParameterExtractor,
    rules: RuleBasedClassifier,
    health: HealthScorer,
    recommender: Recommender,
    state: RwLock<Option<Arc<ClassifierState>>>,
}

impl Default for DiagnosisEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl DiagnosisEngine {
    pub fn new(config: Config) -> Self {
        let solver = DiodeSolver::new(config.solver.clone());
        Self {
            simulator: CurveSimulator::new(solver, config.simulator.clone()),
            extractor: ParameterExtractor::new(config.extractor.clone()),
            rules: RuleBasedClassifier::default(),
            health: HealthScorer::new(&config.health),
            recommender: Recommender::default(),
            state: RwLock::new(None),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn simulator(&self) -> &CurveSimulator {
        &self.simulator
    }

    pub fn is_trained(&self) -> bool {
        self.state.read().is_some()
    }

    /// Report of the installed trained model, if any
    pub fn training_report(&self) -> Option<TrainingReport> {
        self.state.read().as_ref().map(|s| s.report().clone())
    }

    /// Drop the trained model and go back to rule-based classification
    pub fn reset(&self) {
        if self.state.write().take().is_some() {
            info!("Trained classifier removed, using rule-based classification");
        }
    }

    /// Diagnose one measured curve taken at `temperature_c`.
    pub fn diagnose(
        &self,
        voltage: Vec<f64>,
        current: Vec<f64>,
        temperature_c: f64,
    ) -> Result<DiagnosisResult> {
        if !temperature_c.is_finite() {
            return Err(DiagnosisError::Validation(format!(
                "temperature must be finite, got {}",
                temperature_c
            )));
        }
        let curve = Curve::new(voltage, current)?;
        self.diagnose_curve(&curve, temperature_c)
    }

    pub fn diagnose_curve(&self, curve: &Curve, temperature_c: f64) -> Result<DiagnosisResult> {
        let params = self.extractor.extract(curve);
        let features = params.features();

        let (classification, kind) = self.classify(&features)?;
        let health_score = self.health.score(&features, classification.fault_type);
        let recommendations = self
            .recommender
            .recommend(classification.fault_type, features.fill_factor);

        debug!(
            fault = %classification.fault_type,
            confidence = classification.confidence,
            health_score,
            classifier = %kind,
            points = curve.len(),
            "Curve diagnosed"
        );

        Ok(DiagnosisResult {
            id: Uuid::new_v4(),
            diagnosed_at: Utc::now(),
            fault_type: classification.fault_type,
            confidence: classification.confidence,
            health_score,
            health_band: HealthBand::from_score(health_score),
            parameters: DiagnosisParameters::new(
                params,
                temperature_c,
                self.config.health.voc_temp_coefficient,
            ),
            recommendations,
            classifier: kind,
        })
    }

    fn classify(
        &self,
        features: &crate::analysis::CurveFeatures,
    ) -> Result<(Classification, ClassifierKind)> {
        // Clone the Arc so prediction runs without holding the lock
        let state = self.state.read().clone();

        if let Some(state) = state {
            match state.classify(features) {
                Ok(classification) => return Ok((classification, state.kind())),
                Err(e) => {
                    warn!(error = %e, "Trained classifier failed, falling back to rules");
                }
            }
        }

        Ok((self.rules.classify(features)?, self.rules.kind()))
    }

    /// Train the configured model type
    pub fn train(&self, samples: &[TrainingSample]) -> Result<TrainingReport> {
        self.train_with(samples, self.config.classifier.model_type)
    }

    /// Train `model_type` and install it. On failure the current state is kept.
    pub fn train_with(
        &self,
        samples: &[TrainingSample],
        model_type: ModelType,
    ) -> Result<TrainingReport> {
        let fitted = ClassifierState::fit(
            samples,
            model_type,
            &self.config.classifier,
            &self.extractor,
        );

        match fitted {
            Ok(state) => {
                let report = state.report().clone();
                *self.state.write() = Some(Arc::new(state));
                info!(
                    model_id = %report.model_id,
                    model_type = %report.model_type,
                    samples = report.samples,
                    classes = report.classes.len(),
                    training_accuracy = report.training_accuracy,
                    "Classifier trained"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    model_type = %model_type,
                    samples = samples.len(),
                    "Training rejected, keeping current classifier"
                );
                Err(e)
            }
        }
    }

    /// Train from a model type given by name (`svm`, `random_forest`, `cnn`)
    pub fn train_named(&self, samples: &[TrainingSample], model_type: &str) -> Result<TrainingReport> {
        let model_type = model_type
            .trim()
            .parse::<ModelType>()
            .map_err(|_| DiagnosisError::UnknownModelType(model_type.to_string()))?;
        self.train_with(samples, model_type)
    }

    pub fn simulate(
        &self,
        params: &ModelParameters,
        v_oc_approx: f64,
        fault: Option<FaultLabel>,
    ) -> Result<Curve> {
        self.simulator.simulate(params, v_oc_approx, fault)
    }

    pub fn simulate_named(
        &self,
        params: &ModelParameters,
        v_oc_approx: f64,
        fault: Option<&str>,
    ) -> Result<Curve> {
        self.simulator.simulate_named(params, v_oc_approx, fault)
    }
}
