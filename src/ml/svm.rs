//! RBF-kernel support vector machine.
//!
//! Multi-class problems are split one-vs-rest: one binary machine per class,
//! each fitted with a simplified sequential minimal optimization (SMO) over a
//! precomputed kernel matrix. Binary decision values are turned into
//! probabilities by Platt scaling, fitted with the Newton method of Lin, Lin
//! and Weng, then renormalized across classes.

use anyhow::Result;
use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::models::{ClassPrediction, MLClassifier};
use super::{ClassificationMetrics, FeatureVector, ModelMetadata, ModelType};
use crate::config::ClassifierConfig;

/// Alphas below this are not kept as support vectors
const SUPPORT_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmParameters {
    /// Soft-margin penalty
    pub c: f64,
    /// RBF width; `None` uses 1 / n_features
    pub gamma: Option<f64>,
    pub tolerance: f64,
    /// Consecutive sweeps without an update before SMO stops
    pub max_passes: usize,
    /// Hard cap on SMO sweeps
    pub max_sweeps: usize,
    pub seed: u64,
}

impl Default for SvmParameters {
    fn default() -> Self {
        Self {
            c: 10.0,
            gamma: None,
            tolerance: 1e-3,
            max_passes: 10,
            max_sweeps: 10_000,
            seed: 42,
        }
    }
}

impl SvmParameters {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            c: config.svm_c,
            gamma: config.svm_gamma,
            tolerance: config.svm_tolerance,
            max_passes: config.svm_max_passes,
            seed: config.seed,
            ..Self::default()
        }
    }
}

fn rbf(a: ArrayView1<f64>, b: ArrayView1<f64>, gamma: f64) -> f64 {
    let d2: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
    (-gamma * d2).exp()
}

fn kernel_matrix(x: &Array2<f64>, gamma: f64) -> Array2<f64> {
    let n = x.nrows();
    let mut k = Array2::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let v = rbf(x.row(i), x.row(j), gamma);
            k[[i, j]] = v;
            k[[j, i]] = v;
        }
    }
    k
}

struct SmoSolution {
    alphas: Vec<f64>,
    bias: f64,
}

/// Simplified SMO: the second multiplier is drawn at random.
///
/// `y` holds ±1 targets. Requires at least two samples.
fn smo(k: &Array2<f64>, y: &[f64], params: &SvmParameters, rng: &mut StdRng) -> SmoSolution {
    let n = y.len();
    let c = params.c;
    let tol = params.tolerance;

    let mut alphas = vec![0.0; n];
    let mut b = 0.0;

    let output = |alphas: &[f64], b: f64, i: usize| -> f64 {
        (0..n).map(|m| alphas[m] * y[m] * k[[m, i]]).sum::<f64>() + b
    };

    let mut passes = 0;
    let mut sweeps = 0;
    while passes < params.max_passes && sweeps < params.max_sweeps {
        sweeps += 1;
        let mut changed = 0;

        for i in 0..n {
            let e_i = output(&alphas, b, i) - y[i];
            let violates = (y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0);
            if !violates {
                continue;
            }

            let mut j = rng.gen_range(0..n - 1);
            if j >= i {
                j += 1;
            }
            let e_j = output(&alphas, b, j) - y[j];

            let (ai_old, aj_old) = (alphas[i], alphas[j]);
            let (lo, hi) = if y[i] != y[j] {
                ((aj_old - ai_old).max(0.0), (c + aj_old - ai_old).min(c))
            } else {
                ((ai_old + aj_old - c).max(0.0), (ai_old + aj_old).min(c))
            };
            if hi - lo < 1e-12 {
                continue;
            }

            let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
            if eta >= 0.0 {
                continue;
            }

            let aj = (aj_old - y[j] * (e_i - e_j) / eta).max(lo).min(hi);
            if (aj - aj_old).abs() < 1e-5 {
                continue;
            }
            let ai = ai_old + y[i] * y[j] * (aj_old - aj);
            alphas[i] = ai;
            alphas[j] = aj;

            let b1 = b - e_i - y[i] * (ai - ai_old) * k[[i, i]] - y[j] * (aj - aj_old) * k[[i, j]];
            let b2 = b - e_j - y[i] * (ai - ai_old) * k[[i, j]] - y[j] * (aj - aj_old) * k[[j, j]];
            b = if ai > 0.0 && ai < c {
                b1
            } else if aj > 0.0 && aj < c {
                b2
            } else {
                (b1 + b2) / 2.0
            };
            changed += 1;
        }

        if changed == 0 {
            passes += 1;
        } else {
            passes = 0;
        }
    }

    SmoSolution { alphas, bias: b }
}

/// Sigmoid fitted on decision values: `P(y = +1 | f) = 1 / (1 + exp(a·f + b))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattScaling {
    pub a: f64,
    pub b: f64,
}

impl PlattScaling {
    const MAX_ITERATIONS: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPSILON: f64 = 1e-5;

    /// Fit on decision values and ±1 labels
    pub fn fit(decision: &[f64], labels: &[f64]) -> Self {
        let prior1 = labels.iter().filter(|y| **y > 0.0).count() as f64;
        let prior0 = labels.len() as f64 - prior1;

        // Regularized targets keep the fit finite on separable data
        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let t: Vec<f64> = labels
            .iter()
            .map(|y| if *y > 0.0 { hi_target } else { lo_target })
            .collect();

        let objective = |a: f64, b: f64| -> f64 {
            decision
                .iter()
                .zip(&t)
                .map(|(f, ti)| {
                    let fapb = f * a + b;
                    if fapb >= 0.0 {
                        ti * fapb + (-fapb).exp().ln_1p()
                    } else {
                        (ti - 1.0) * fapb + fapb.exp().ln_1p()
                    }
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(a, b);

        for _ in 0..Self::MAX_ITERATIONS {
            let (mut h11, mut h22, mut h21) = (Self::SIGMA, Self::SIGMA, 0.0);
            let (mut g1, mut g2) = (0.0, 0.0);
            for (f, ti) in decision.iter().zip(&t) {
                let fapb = f * a + b;
                let (p, q) = if fapb >= 0.0 {
                    let e = (-fapb).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = fapb.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = ti - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < Self::EPSILON && g2.abs() < Self::EPSILON {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            let mut improved = false;
            while step >= Self::MIN_STEP {
                let (na, nb) = (a + step * da, b + step * db);
                let nf = objective(na, nb);
                if nf < fval + 1e-4 * step * gd {
                    a = na;
                    b = nb;
                    fval = nf;
                    improved = true;
                    break;
                }
                step /= 2.0;
            }
            if !improved {
                break;
            }
        }

        Self { a, b }
    }

    pub fn probability(&self, decision: f64) -> f64 {
        let fapb = decision * self.a + self.b;
        if fapb >= 0.0 {
            let e = (-fapb).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + fapb.exp())
        }
    }
}

/// One class against the rest
#[derive(Debug, Clone)]
struct BinaryMachine {
    support_vectors: Array2<f64>,
    /// alpha·y per support vector
    coefficients: Vec<f64>,
    bias: f64,
    platt: PlattScaling,
}

impl BinaryMachine {
    fn decision(&self, x: ArrayView1<f64>, gamma: f64) -> f64 {
        self.support_vectors
            .outer_iter()
            .zip(&self.coefficients)
            .map(|(sv, coef)| coef * rbf(sv, x, gamma))
            .sum::<f64>()
            + self.bias
    }
}

/// Multi-class RBF SVM with probability estimates
#[derive(Debug, Clone)]
pub struct RbfSvm {
    pub metadata: ModelMetadata,
    pub gamma: f64,
    n_features: usize,
    machines: Vec<BinaryMachine>,
}

impl RbfSvm {
    /// Train on a standardized matrix (rows = samples) and class ids
    pub fn train(
        x: &Array2<f64>,
        y: &[usize],
        params: &SvmParameters,
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
        if x.ncols() == 0 {
            anyhow::bail!("Cannot train on zero features");
        }
        if !(params.c > 0.0) {
            anyhow::bail!("SVM penalty C must be positive, got {}", params.c);
        }

        let classes: Vec<usize> = y.iter().copied().sorted().dedup().collect();
        if classes.len() < 2 {
            anyhow::bail!("SVM needs at least 2 classes, got {}", classes.len());
        }

        let gamma = params.gamma.unwrap_or(1.0 / x.ncols() as f64);
        if !(gamma > 0.0) || !gamma.is_finite() {
            anyhow::bail!("RBF gamma must be positive and finite, got {}", gamma);
        }

        let k = kernel_matrix(x, gamma);
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut machines = Vec::with_capacity(classes.len());
        for class in &classes {
            let targets: Vec<f64> = y
                .iter()
                .map(|label| if label == class { 1.0 } else { -1.0 })
                .collect();
            let solution = smo(&k, &targets, params, &mut rng);

            let decision: Vec<f64> = (0..y.len())
                .map(|i| {
                    (0..y.len())
                        .map(|m| solution.alphas[m] * targets[m] * k[[m, i]])
                        .sum::<f64>()
                        + solution.bias
                })
                .collect();
            let platt = PlattScaling::fit(&decision, &targets);

            let support: Vec<usize> = solution
                .alphas
                .iter()
                .positions(|a| *a > SUPPORT_EPSILON)
                .collect();
            machines.push(BinaryMachine {
                support_vectors: x.select(Axis(0), &support),
                coefficients: support
                    .iter()
                    .map(|&m| solution.alphas[m] * targets[m])
                    .collect(),
                bias: solution.bias,
                platt,
            });
        }

        let mut model = Self {
            metadata: ModelMetadata::new(
                ModelType::Svm,
                y.len(),
                classes,
                ClassificationMetrics {
                    accuracy: 0.0,
                    samples: y.len(),
                },
                feature_names,
            ),
            gamma,
            n_features: x.ncols(),
            machines,
        };

        let predictions = x
            .outer_iter()
            .map(|row| model.predict_row(row).map(|p| p.class))
            .collect::<Result<Vec<_>>>()?;
        model.metadata.validation_metrics = ClassificationMetrics::calculate(&predictions, y)?;

        debug!(
            classes = model.metadata.classes.len(),
            support_vectors = model.support_vector_count(),
            accuracy = model.metadata.validation_metrics.accuracy,
            "SVM trained"
        );

        Ok(model)
    }

    pub fn support_vector_count(&self) -> usize {
        self.machines.iter().map(|m| m.coefficients.len()).sum()
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<ClassPrediction> {
        let probabilities: Vec<f64> = self
            .machines
            .iter()
            .map(|m| m.platt.probability(m.decision(row, self.gamma)))
            .collect();
        ClassPrediction::from_probabilities(&self.metadata.classes, &probabilities)
    }
}

impl MLClassifier for RbfSvm {
    fn predict(&self, features: &FeatureVector) -> Result<ClassPrediction> {
        if features.len() != self.n_features {
            anyhow::bail!(
                "Feature count mismatch: expected {}, got {}",
                self.n_features,
                features.len()
            );
        }
        let row = Array1::from(features.features.clone());
        self.predict_row(row.view())
    }

    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}
