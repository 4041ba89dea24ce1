//! Machine Learning Module
//!
//! Trainable fault classifiers operating on fixed-length feature vectors:
//! - RBF-kernel support vector machine with probability estimates
//! - Random forest of bagged decision trees (feature `ml`, via smartcore)
//! - Z-score standardization fitted on the training matrix
//!
//! # Architecture
//! - Models implement [`models::MLClassifier`] and are trained offline from a
//!   [`training::TrainingDataset`]
//! - Class ids are plain `usize` values; the classifier layer maps them to
//!   fault labels

use anyhow::Result;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub mod models;
pub mod svm;
pub mod training;

#[cfg(feature = "ml")]
pub mod smartcore;

/// ML Model Type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelType {
    Svm,
    RandomForest,
    /// Declared for configuration compatibility; training always fails
    Cnn,
}

impl ModelType {
    pub fn is_implemented(&self) -> bool {
        match self {
            ModelType::Svm => true,
            ModelType::RandomForest => cfg!(feature = "ml"),
            ModelType::Cnn => false,
        }
    }
}

/// ML Model Metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub model_type: ModelType,
    pub version: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
    pub training_samples: usize,
    pub classes: Vec<usize>,
    pub validation_metrics: ClassificationMetrics,
    pub feature_names: Vec<String>,
}

impl ModelMetadata {
    pub fn new(
        model_type: ModelType,
        training_samples: usize,
        classes: Vec<usize>,
        validation_metrics: ClassificationMetrics,
        feature_names: Vec<String>,
    ) -> Self {
        Self {
            model_id: format!("{}_{}", model_type, uuid::Uuid::new_v4()),
            model_type,
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: chrono::Utc::now(),
            training_samples,
            classes,
            validation_metrics,
            feature_names,
        }
    }
}

/// Classification quality on a labelled set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub samples: usize,
}

impl ClassificationMetrics {
    pub fn calculate(predictions: &[usize], targets: &[usize]) -> Result<Self> {
        if predictions.len() != targets.len() {
            anyhow::bail!(
                "Prediction and target count mismatch: {} predictions, {} targets",
                predictions.len(),
                targets.len()
            );
        }
        if predictions.is_empty() {
            anyhow::bail!("No predictions to evaluate");
        }

        let correct = predictions
            .iter()
            .zip(targets.iter())
            .filter(|(p, t)| p == t)
            .count();

        Ok(Self {
            accuracy: correct as f64 / predictions.len() as f64,
            samples: predictions.len(),
        })
    }
}

/// Feature Vector for ML models
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    /// Build from static names; extra values or names are dropped
    pub fn named(features: Vec<f64>, names: &[&str]) -> Self {
        let n = features.len().min(names.len());
        let mut features = features;
        features.truncate(n);
        Self {
            features,
            feature_names: names[..n].iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Standardize features using z-score normalization
    pub fn standardize(&self, means: &[f64], stds: &[f64]) -> Result<Self> {
        if means.len() != self.features.len() || stds.len() != self.features.len() {
            anyhow::bail!("Standardization parameter count mismatch");
        }

        let standardized = self
            .features
            .iter()
            .zip(means.iter().zip(stds.iter()))
            .map(|(f, (mean, std))| {
                if std.abs() < 1e-10 {
                    0.0 // Constant feature in training data
                } else {
                    (f - mean) / std
                }
            })
            .collect();

        Ok(Self {
            features: standardized,
            feature_names: self.feature_names.clone(),
        })
    }
}

/// Z-score scaler fitted on a training matrix (rows = samples)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| anyhow::anyhow!("Cannot fit scaler on an empty matrix"))?;
        let stds = x.std_axis(Axis(0), 0.0);
        Ok(Self {
            means: means.to_vec(),
            stds: stds.to_vec(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, features: &FeatureVector) -> Result<FeatureVector> {
        features.standardize(&self.means, &self.stds)
    }

    pub fn transform_matrix(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            anyhow::bail!(
                "Scaler expects {} features, matrix has {}",
                self.n_features(),
                x.ncols()
            );
        }
        let means = Array1::from(self.means.clone());
        let stds = Array1::from(
            self.stds
                .iter()
                .map(|s| if s.abs() < 1e-10 { f64::INFINITY } else { *s })
                .collect::<Vec<_>>(),
        );
        Ok((x - &means) / &stds)
    }
}

/// Stack equally long rows into a matrix
pub fn feature_matrix(rows: &[FeatureVector]) -> Result<Array2<f64>> {
    let n_samples = rows.len();
    if n_samples == 0 {
        anyhow::bail!("Cannot build a matrix from zero samples");
    }
    let n_features = rows[0].len();

    let mut flat = Vec::with_capacity(n_samples * n_features);
    for row in rows {
        if row.len() != n_features {
            anyhow::bail!("All feature vectors must have the same length");
        }
        flat.extend_from_slice(&row.features);
    }

    Ok(Array2::from_shape_vec((n_samples, n_features), flat)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 3] = ["f1", "f2", "f3"];

    fn fv(values: Vec<f64>) -> FeatureVector {
        FeatureVector::named(values, &NAMES)
    }

    #[test]
    fn test_feature_vector_creation() {
        let v = fv(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.len(), 3);
        assert!(!v.is_empty());
        assert_eq!(v.feature_names, vec!["f1", "f2", "f3"]);

        let short = FeatureVector::named(vec![1.0, 2.0, 3.0], &NAMES[..2]);
        assert_eq!(short.features, vec![1.0, 2.0]);
        assert_eq!(short.feature_names.len(), 2);
    }

    #[test]
    fn test_feature_vector_standardize() {
        let v = fv(vec![10.0, 20.0, 30.0]);
        let standardized = v
            .standardize(&[10.0, 10.0, 30.0], &[2.0, 5.0, 0.0])
            .unwrap();
        assert_eq!(standardized.features, vec![0.0, 2.0, 0.0]);
        assert!(v.standardize(&[0.0], &[1.0]).is_err());
    }

    #[test]
    fn test_scaler_fit_and_transform() {
        let rows = vec![
            fv(vec![1.0, 5.0]),
            fv(vec![3.0, 5.0]),
        ];
        let x = feature_matrix(&rows).unwrap();
        let scaler = StandardScaler::fit(&x).unwrap();
        assert_eq!(scaler.means, vec![2.0, 5.0]);
        assert_eq!(scaler.stds, vec![1.0, 0.0]);

        let scaled = scaler.transform(&rows[0]).unwrap();
        assert_eq!(scaled.features, vec![-1.0, 0.0]);

        let matrix = scaler.transform_matrix(&x).unwrap();
        assert_eq!(matrix.row(1).to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_feature_matrix_rejects_ragged_rows() {
        let rows = vec![
            fv(vec![1.0, 5.0]),
            fv(vec![3.0]),
        ];
        assert!(feature_matrix(&rows).is_err());
        assert!(feature_matrix(&[]).is_err());
    }

    #[test]
    fn test_classification_metrics() {
        let metrics = ClassificationMetrics::calculate(&[0, 1, 2, 2], &[0, 1, 1, 2]).unwrap();
        assert_eq!(metrics.accuracy, 0.75);
        assert_eq!(metrics.samples, 4);
        assert!(ClassificationMetrics::calculate(&[], &[]).is_err());
        assert!(ClassificationMetrics::calculate(&[0], &[0, 1]).is_err());
    }

    #[test]
    fn test_model_type_names() {
        assert_eq!(ModelType::RandomForest.to_string(), "random_forest");
        assert_eq!("svm".parse::<ModelType>().unwrap(), ModelType::Svm);
        assert!("lstm".parse::<ModelType>().is_err());
        assert!(!ModelType::Cnn.is_implemented());
        assert!(ModelType::Svm.is_implemented());
    }
}
