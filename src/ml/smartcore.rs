//! SmartCore Random Forest Classifier
//!
//! Ensemble of single-tree smartcore `RandomForestClassifier`s. Each member
//! draws its own stratified bootstrap and considers a random subset of
//! `ceil(sqrt(n_features))` features at every split; the class probability of
//! a prediction is the share of members voting for it.

use super::models::{ClassPrediction, MLClassifier};
use super::{ClassificationMetrics, FeatureVector, ModelMetadata, ModelType};
use crate::config::ClassifierConfig;
use anyhow::Result;
use itertools::Itertools;
use ndarray::{Array2, ArrayView1};
use tracing::debug;

use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;

type Tree = RandomForestClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

#[derive(Debug, Clone)]
pub struct ForestParameters {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub seed: u64,
}

impl Default for ForestParameters {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            seed: 42,
        }
    }
}

impl ForestParameters {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            seed: config.seed,
        }
    }

    /// Features tried at each split
    fn features_per_split(n_features: usize) -> usize {
        ((n_features as f64).sqrt().ceil() as usize).max(1)
    }

    /// Settings for the `k`-th member: one tree, its own seed
    fn tree_parameters(&self, k: usize, n_features: usize) -> RandomForestClassifierParameters {
        let params = RandomForestClassifierParameters::default()
            .with_n_trees(1)
            .with_m(Self::features_per_split(n_features))
            .with_seed(self.seed.wrapping_add(k as u64));
        match self.max_depth {
            Some(depth) => params.with_max_depth(depth),
            None => params,
        }
    }
}

/// SmartCore RandomForest Model Wrapper
pub struct SmartcoreRandomForest {
    pub metadata: ModelMetadata,
    trees: Vec<Tree>,
    n_features: usize,
    /// Training parameters for reproducibility
    pub n_trees: usize,
    pub max_depth: Option<u16>,
}

impl std::fmt::Debug for SmartcoreRandomForest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartcoreRandomForest")
            .field("metadata", &self.metadata)
            .field("n_trees", &self.n_trees)
            .field("max_depth", &self.max_depth)
            .field("n_features", &self.n_features)
            .finish()
    }
}

/// Row-major copy, as smartcore expects
fn dense(x: &Array2<f64>) -> DenseMatrix<f64> {
    DenseMatrix::new(x.nrows(), x.ncols(), x.iter().copied().collect(), false)
}

impl SmartcoreRandomForest {
    /// Train on a standardized matrix (rows = samples) and class ids
    pub fn train(
        x: &Array2<f64>,
        y: &[usize],
        params: &ForestParameters,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if x.nrows() == 0 || y.is_empty() {
            anyhow::bail!("Cannot train on empty dataset");
        }
        if x.nrows() != y.len() {
            anyhow::bail!(
                "Feature and target count mismatch: {} features, {} targets",
                x.nrows(),
                y.len()
            );
        }
        if params.n_trees == 0 {
            anyhow::bail!("Random forest needs at least one tree");
        }

        let classes: Vec<usize> = y.iter().copied().sorted().dedup().collect();
        if classes.len() < 2 {
            anyhow::bail!("Random forest needs at least 2 classes, got {}", classes.len());
        }

        let targets: Vec<i32> = y
            .iter()
            .map(|&c| i32::try_from(c))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| anyhow::anyhow!("Class id out of range: {}", e))?;

        let n = y.len();
        let x_matrix = dense(x);
        let trees = (0..params.n_trees)
            .map(|k| {
                Tree::fit(&x_matrix, &targets, params.tree_parameters(k, x.ncols()))
                    .map_err(|e| anyhow::anyhow!("Decision tree training failed: {:?}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut model = Self {
            metadata: ModelMetadata::new(
                ModelType::RandomForest,
                n,
                classes,
                ClassificationMetrics {
                    accuracy: 0.0,
                    samples: n,
                },
                feature_names,
            ),
            trees,
            n_features: x.ncols(),
            n_trees: params.n_trees,
            max_depth: params.max_depth,
        };

        let predictions = x
            .outer_iter()
            .map(|row| model.predict_row(row).map(|p| p.class))
            .collect::<Result<Vec<_>>>()?;
        model.metadata.validation_metrics = ClassificationMetrics::calculate(&predictions, y)?;

        debug!(
            trees = model.n_trees,
            classes = model.metadata.classes.len(),
            accuracy = model.metadata.validation_metrics.accuracy,
            "Random forest trained"
        );

        Ok(model)
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<ClassPrediction> {
        let x = DenseMatrix::new(1, row.len(), row.to_vec(), false);
        let classes = &self.metadata.classes;
        let mut votes = vec![0.0; classes.len()];

        for tree in &self.trees {
            let predictions = tree
                .predict(&x)
                .map_err(|e| anyhow::anyhow!("Prediction failed: {:?}", e))?;
            let vote = predictions
                .first()
                .copied()
                .ok_or_else(|| anyhow::anyhow!("Tree returned empty predictions"))?;
            let class = usize::try_from(vote)
                .map_err(|_| anyhow::anyhow!("Tree predicted invalid class {}", vote))?;
            if let Some(k) = classes.iter().position(|c| *c == class) {
                votes[k] += 1.0;
            }
        }

        let total = self.trees.len() as f64;
        let shares: Vec<f64> = votes.iter().map(|v| v / total).collect();
        ClassPrediction::from_probabilities(classes, &shares)
    }
}

impl MLClassifier for SmartcoreRandomForest {
    fn predict(&self, features: &FeatureVector) -> Result<ClassPrediction> {
        if features.len() != self.n_features {
            anyhow::bail!(
                "Feature count mismatch: expected {}, got {}",
                self.n_features,
                features.len()
            );
        }
        let row = ndarray::Array1::from(features.features.clone());
        self.predict_row(row.view())
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}
