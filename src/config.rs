use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::domain::FaultLabel;
use crate::ml::ModelType;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: SolverConfig,
    pub simulator: SimulatorConfig,
    pub extractor: ExtractorConfig,
    pub classifier: ClassifierConfig,
    pub health: HealthConfig,
}

/// Diode-equation iteration limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 1e-6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Samples per simulated sweep
    pub points: usize,
    /// Sweep end as a multiple of the approximate open-circuit voltage
    pub sweep_factor: f64,
    pub faults: FaultInjection,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            points: 100,
            sweep_factor: 1.1,
            faults: FaultInjection::default(),
        }
    }
}

/// Parameter perturbations used to synthesize each fault mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaultInjection {
    pub shading_segments: usize,
    pub shaded_iph_factor: f64,
    pub soiling_iph_factor: f64,
    pub series_rs_factor: f64,
    pub shunt_rsh_factor: f64,
    pub degradation_iph_factor: f64,
    pub degradation_i0_factor: f64,
    /// Fraction of the sweep after which the bypass ramp starts
    pub bypass_start_fraction: f64,
    /// Current multiplier reached at the end of the bypass ramp
    pub bypass_ramp_floor: f64,
}

impl Default for FaultInjection {
    fn default() -> Self {
        Self {
            shading_segments: 3,
            shaded_iph_factor: 0.3,
            soiling_iph_factor: 0.8,
            series_rs_factor: 3.0,
            shunt_rsh_factor: 0.2,
            degradation_iph_factor: 0.85,
            degradation_i0_factor: 2.0,
            bypass_start_fraction: 1.0 / 3.0,
            bypass_ramp_floor: 0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub low_voltage_fraction: f64,
    pub high_voltage_fraction: f64,
    /// Minimum samples for a boundary slope fit
    pub min_fit_points: usize,
    pub smoothing_window: usize,
    pub smoothing_order: usize,
    /// Curvature threshold relative to the peak |d²I/dV²|
    pub curvature_threshold: f64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            low_voltage_fraction: 0.2,
            high_voltage_fraction: 0.8,
            min_fit_points: 3,
            smoothing_window: 5,
            smoothing_order: 2,
            curvature_threshold: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model_type: ModelType,
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub svm_c: f64,
    /// RBF width; `None` uses 1 / n_features
    pub svm_gamma: Option<f64>,
    pub svm_tolerance: f64,
    pub svm_max_passes: usize,
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::Svm,
            n_trees: 100,
            max_depth: None,
            svm_c: 10.0,
            svm_gamma: None,
            svm_tolerance: 1e-3,
            svm_max_passes: 10,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub fill_factor_weight: f64,
    pub ratio_weight: f64,
    pub penalties: HashMap<FaultLabel, f64>,
    /// Penalty for labels missing from `penalties`
    pub default_penalty: f64,
    /// Relative Voc change per °C used for the STC correction
    pub voc_temp_coefficient: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        let penalties = [
            (FaultLabel::Normal, 0.0),
            (FaultLabel::Soiling, -10.0),
            (FaultLabel::PartialShading, -15.0),
            (FaultLabel::ShuntResistance, -20.0),
            (FaultLabel::SeriesResistance, -25.0),
            (FaultLabel::Degradation, -30.0),
            (FaultLabel::BypassDiodeFailure, -40.0),
        ]
        .into_iter()
        .collect();

        Self {
            fill_factor_weight: 70.0,
            ratio_weight: 15.0,
            penalties,
            default_penalty: -30.0,
            voc_temp_coefficient: -0.0035,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config/default.toml")
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Self::figment()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("PVDIAG__").split("__"));
        Ok(figment.extract()?)
    }

    /// Defaults as the base layer, so nested tables and maps merge per key
    fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }
}
