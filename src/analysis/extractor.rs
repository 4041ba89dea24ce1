//! Electrical parameter extraction from an I-V curve.

use serde::{Deserialize, Serialize};

use super::numeric::{first_argmax, gradient, least_squares_slope, nearest_zero};
use super::savitzky_golay::SavitzkyGolay;
use crate::config::ExtractorConfig;
use crate::domain::Curve;
use crate::ml::FeatureVector;

/// Model input names, in the fixed order of [`CurveFeatures::to_array`]
pub const FEATURE_NAMES: [&str; 8] = [
    "i_sc",
    "v_oc",
    "fill_factor",
    "i_ratio",
    "v_ratio",
    "slope_low_v",
    "slope_high_v",
    "inflection_points",
];

/// The eight shape descriptors consumed by the fault classifiers
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveFeatures {
    pub i_sc: f64,
    pub v_oc: f64,
    pub fill_factor: f64,
    /// Impp / Isc
    pub i_ratio: f64,
    /// Vmpp / Voc
    pub v_ratio: f64,
    pub slope_low_v: f64,
    pub slope_high_v: f64,
    pub inflection_points: usize,
}

impl CurveFeatures {
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.i_sc,
            self.v_oc,
            self.fill_factor,
            self.i_ratio,
            self.v_ratio,
            self.slope_low_v,
            self.slope_high_v,
            self.inflection_points as f64,
        ]
    }

    pub fn to_feature_vector(&self) -> FeatureVector {
        FeatureVector::named(self.to_array().to_vec(), &FEATURE_NAMES)
    }

    /// All-zero features signal a curve that carried no usable information
    pub fn is_degenerate(&self) -> bool {
        self.to_array().iter().all(|v| *v == 0.0)
    }
}

/// Full set of figures of merit for one curve
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveParameters {
    pub i_sc: f64,
    pub v_oc: f64,
    pub p_max: f64,
    pub v_mpp: f64,
    pub i_mpp: f64,
    pub fill_factor: f64,
    pub i_ratio: f64,
    pub v_ratio: f64,
    pub slope_low_v: f64,
    pub slope_high_v: f64,
    pub inflection_points: usize,
}

impl CurveParameters {
    pub fn features(&self) -> CurveFeatures {
        CurveFeatures {
            i_sc: self.i_sc,
            v_oc: self.v_oc,
            fill_factor: self.fill_factor,
            i_ratio: self.i_ratio,
            v_ratio: self.v_ratio,
            slope_low_v: self.slope_low_v,
            slope_high_v: self.slope_high_v,
            inflection_points: self.inflection_points,
        }
    }
}

/// Computes [`CurveParameters`] from any validated curve.
///
/// Pure: the same curve always yields the same parameters. Degenerate curves
/// produce zeros instead of errors.
#[derive(Debug, Clone, Default)]
pub struct ParameterExtractor {
    config: ExtractorConfig,
}

impl ParameterExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(&self, curve: &Curve) -> CurveParameters {
        let voltage = curve.voltage();
        let current = curve.current();

        let i_sc = nearest_zero(voltage).map(|i| current[i]).unwrap_or(0.0);
        let v_oc = nearest_zero(current).map(|i| voltage[i]).unwrap_or(0.0);

        let power: Vec<f64> = curve.points().map(|(v, i)| v * i).collect();
        let (p_max, v_mpp, i_mpp) = first_argmax(&power)
            .map(|k| (power[k], voltage[k], current[k]))
            .unwrap_or((0.0, 0.0, 0.0));

        let fill_factor = if i_sc * v_oc > 0.0 {
            p_max / (i_sc * v_oc)
        } else {
            0.0
        };

        let slope_low_v =
            self.boundary_slope(curve, |v| v < self.config.low_voltage_fraction * v_oc);
        let slope_high_v =
            self.boundary_slope(curve, |v| v > self.config.high_voltage_fraction * v_oc);

        CurveParameters {
            i_sc,
            v_oc,
            p_max,
            v_mpp,
            i_mpp,
            fill_factor,
            i_ratio: if i_sc > 0.0 { i_mpp / i_sc } else { 0.0 },
            v_ratio: if v_oc > 0.0 { v_mpp / v_oc } else { 0.0 },
            slope_low_v,
            slope_high_v,
            inflection_points: self.inflection_points(curve),
        }
    }

    /// Least-squares slope over the samples whose voltage passes `select`
    fn boundary_slope(&self, curve: &Curve, select: impl Fn(f64) -> bool) -> f64 {
        let points: Vec<(f64, f64)> = curve.points().filter(|(v, _)| select(*v)).collect();
        if points.len() < self.config.min_fit_points {
            return 0.0;
        }
        least_squares_slope(&points).unwrap_or(0.0)
    }

    /// Count samples of high curvature: `|d²I/dV²|` above a fraction of its peak.
    fn inflection_points(&self, curve: &Curve) -> usize {
        let voltage = curve.voltage();
        let current = curve.current();

        let smoothed = if curve.len() > self.config.smoothing_window {
            SavitzkyGolay::for_length(
                curve.len(),
                self.config.smoothing_window,
                self.config.smoothing_order,
            )
            .map(|sg| sg.smooth(current))
            .unwrap_or_else(|| current.to_vec())
        } else {
            current.to_vec()
        };

        let second = gradient(&gradient(&smoothed, voltage), voltage);
        let peak = second
            .iter()
            .map(|d| d.abs())
            .filter(|d| d.is_finite())
            .fold(0.0_f64, f64::max);
        if peak == 0.0 {
            return 0;
        }

        let threshold = self.config.curvature_threshold * peak;
        second.iter().filter(|d| d.abs() > threshold).count()
    }
}
