//! ML Model Training Pipeline
//!
//! Labelled datasets, the trainer that fits the configured model type and a
//! builder for synthetic training curves.

use super::models::MLClassifier;
use super::svm::{RbfSvm, SvmParameters};
use super::{feature_matrix, FeatureVector, ModelType};
use crate::config::ClassifierConfig;
use crate::domain::{Curve, FaultLabel, ModelParameters};
use crate::simulation::{with_noise, CurveSimulator};
use anyhow::Result;
use itertools::{iproduct, Itertools};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// One labelled curve as supplied by callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSample {
    pub voltage: Vec<f64>,
    pub current: Vec<f64>,
    pub fault_type: String,
}

impl TrainingSample {
    pub fn labelled(curve: &Curve, label: FaultLabel) -> Self {
        Self {
            voltage: curve.voltage().to_vec(),
            current: curve.current().to_vec(),
            fault_type: label.to_string(),
        }
    }

    pub fn curve(&self) -> crate::error::Result<Curve> {
        Curve::new(self.voltage.clone(), self.current.clone())
    }

    pub fn label(&self) -> crate::error::Result<FaultLabel> {
        FaultLabel::parse(&self.fault_type)
    }
}

/// Training Dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<usize>,
}

impl TrainingDataset {
    pub fn new(features: Vec<FeatureVector>, targets: Vec<usize>) -> Result<Self> {
        if features.len() != targets.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                features.len(),
                targets.len()
            );
        }
        Ok(Self { features, targets })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Sorted distinct class ids
    pub fn classes(&self) -> Vec<usize> {
        self.targets.iter().copied().sorted().dedup().collect()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.features
            .first()
            .map(|f| f.feature_names.clone())
            .unwrap_or_default()
    }

    pub fn matrix(&self) -> Result<Array2<f64>> {
        feature_matrix(&self.features)
    }
}

/// Model Trainer
pub struct ModelTrainer {
    config: ClassifierConfig,
}

impl ModelTrainer {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Fit `model_type` on an already standardized matrix
    pub fn train(
        &self,
        model_type: ModelType,
        x: &Array2<f64>,
        y: &[usize],
        feature_names: Vec<String>,
    ) -> Result<Box<dyn MLClassifier>> {
        match model_type {
            ModelType::Svm => {
                let params = SvmParameters::from_config(&self.config);
                Ok(Box::new(RbfSvm::train(x, y, &params, feature_names)?))
            }
            #[cfg(feature = "ml")]
            ModelType::RandomForest => {
                use super::smartcore::{ForestParameters, SmartcoreRandomForest};
                let params = ForestParameters::from_config(&self.config);
                Ok(Box::new(SmartcoreRandomForest::train(
                    x,
                    y,
                    &params,
                    feature_names,
                )?))
            }
            #[cfg(not(feature = "ml"))]
            ModelType::RandomForest => {
                anyhow::bail!("Model type not implemented: {}", model_type)
            }
            ModelType::Cnn => anyhow::bail!("Model type not implemented: {}", model_type),
        }
    }
}

/// Simulated, labelled curves for every combination of photocurrent and fault
#[derive(Debug, Clone)]
pub struct SyntheticDatasetBuilder {
    simulator: CurveSimulator,
    base: ModelParameters,
    v_oc_approx: f64,
    iph_values: Vec<f64>,
    faults: Vec<FaultLabel>,
    noise_sigma: f64,
    seed: u64,
}

impl SyntheticDatasetBuilder {
    pub fn new(simulator: CurveSimulator, base: ModelParameters, v_oc_approx: f64) -> Self {
        Self {
            simulator,
            iph_values: vec![base.iph],
            base,
            v_oc_approx,
            faults: FaultLabel::all(),
            noise_sigma: 0.0,
            seed: 42,
        }
    }

    pub fn with_iph_values(mut self, iph_values: Vec<f64>) -> Self {
        self.iph_values = iph_values;
        self
    }

    pub fn with_faults(mut self, faults: Vec<FaultLabel>) -> Self {
        self.faults = faults;
        self
    }

    /// Gaussian current noise; each curve gets its own derived seed
    pub fn with_noise(mut self, sigma: f64, seed: u64) -> Self {
        self.noise_sigma = sigma;
        self.seed = seed;
        self
    }

    pub fn build(&self) -> Result<Vec<TrainingSample>> {
        iproduct!(self.iph_values.iter(), self.faults.iter())
            .enumerate()
            .map(|(k, (&iph, &fault))| {
                let params = ModelParameters {
                    iph,
                    ..self.base.clone()
                };
                let curve = self.simulator.simulate(&params, self.v_oc_approx, Some(fault))?;
                let curve = with_noise(&curve, self.noise_sigma, self.seed.wrapping_add(k as u64))?;
                Ok(TrainingSample::labelled(&curve, fault))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(values: Vec<f64>) -> FeatureVector {
        FeatureVector::named(values, &["f0", "f1"])
    }

    #[test]
    fn test_dataset_classes_and_matrix() {
        let dataset =
            TrainingDataset::new(vec![fv(vec![1.0]), fv(vec![2.0]), fv(vec![3.0])], vec![5, 1, 5])
                .unwrap();
        assert_eq!(dataset.classes(), vec![1, 5]);
        assert_eq!(dataset.feature_names(), vec!["f0".to_string()]);
        assert_eq!(dataset.matrix().unwrap().shape(), &[3, 1]);
        assert!(TrainingDataset::new(vec![fv(vec![1.0])], vec![]).is_err());
    }

    #[test]
    fn test_trainer_rejects_cnn() {
        let trainer = ModelTrainer::new(ClassifierConfig::default());
        let x = Array2::from_shape_vec((2, 1), vec![0.0, 1.0]).unwrap();
        let err = trainer
            .train(ModelType::Cnn, &x, &[0, 1], vec!["f".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("cnn"));
    }

    #[test]
    fn test_trainer_fits_svm() {
        let trainer = ModelTrainer::new(ClassifierConfig::default());
        let x = Array2::from_shape_vec((4, 1), vec![-1.0, -0.9, 0.9, 1.0]).unwrap();
        let model = trainer
            .train(ModelType::Svm, &x, &[0, 0, 1, 1], vec!["f".to_string()])
            .unwrap();
        assert_eq!(model.model_type(), ModelType::Svm);
        assert_eq!(model.classes(), &[0, 1]);
    }

    #[test]
    fn test_synthetic_builder_covers_every_combination() {
        let base = ModelParameters::new(10.0, 1e-10, 0.1, 100.0);
        let samples = SyntheticDatasetBuilder::new(CurveSimulator::default(), base, 40.0)
            .with_iph_values(vec![9.0, 10.0])
            .with_noise(0.01, 3)
            .build()
            .unwrap();

        assert_eq!(samples.len(), 2 * FaultLabel::COUNT);
        assert_eq!(samples[0].fault_type, "normal");
        for sample in &samples {
            assert!(sample.label().is_ok());
            assert_eq!(sample.curve().unwrap().len(), 100);
        }
    }

    #[test]
    fn test_synthetic_builder_propagates_invalid_parameters() {
        let base = ModelParameters::new(10.0, 1e-10, 0.1, 100.0);
        let result = SyntheticDatasetBuilder::new(CurveSimulator::default(), base, 40.0)
            .with_iph_values(vec![-1.0])
            .with_faults(vec![FaultLabel::Normal])
            .build();
        assert!(result.is_err());
    }
}
