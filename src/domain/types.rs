use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumCount, EnumIter, EnumString, FromRepr, IntoEnumIterator};
use validator::Validate;

use crate::error::{DiagnosisError, Result};

// ============================================================================
// Physical Constants
// ============================================================================

/// Elementary charge (C)
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Boltzmann constant (J/K)
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Offset between Celsius and Kelvin
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

/// Reference cell temperature for standard test conditions (°C)
pub const STC_TEMPERATURE_C: f64 = 25.0;

// ============================================================================
// Fault Labels
// ============================================================================

/// Fault categories recognised by the classifiers.
///
/// Declaration order is significant: the rule-based scorer breaks score ties
/// in favour of the label declared first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    FromRepr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FaultLabel {
    Normal,
    PartialShading,
    Soiling,
    Degradation,
    SeriesResistance,
    ShuntResistance,
    BypassDiodeFailure,
}

impl FaultLabel {
    /// Number of fault categories
    pub const COUNT: usize = <Self as EnumCount>::COUNT;

    /// All labels in declaration order
    pub fn all() -> Vec<FaultLabel> {
        FaultLabel::iter().collect()
    }

    /// Position in declaration order, used as the numeric class id for models
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Inverse of [`FaultLabel::index`]
    pub fn from_index(index: usize) -> Option<FaultLabel> {
        FaultLabel::from_repr(index)
    }

    /// Parse a snake_case label, mapping failures to a diagnosis error
    pub fn parse(label: &str) -> Result<FaultLabel> {
        FaultLabel::from_str(label.trim())
            .map_err(|_| DiagnosisError::UnknownFault(label.to_string()))
    }

    pub fn is_fault(&self) -> bool {
        *self != FaultLabel::Normal
    }
}

// ============================================================================
// I-V Curve
// ============================================================================

/// A single current-voltage sweep.
///
/// Only constructible through [`Curve::new`], so every instance satisfies
/// `voltage.len() == current.len() >= 2` with finite samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve {
    voltage: Vec<f64>,
    current: Vec<f64>,
}

impl Curve {
    /// Minimum number of samples in a curve
    pub const MIN_POINTS: usize = 2;

    pub fn new(voltage: Vec<f64>, current: Vec<f64>) -> Result<Self> {
        if voltage.is_empty() || current.is_empty() {
            return Err(DiagnosisError::Validation(
                "voltage and current must not be empty".to_string(),
            ));
        }
        if voltage.len() != current.len() {
            return Err(DiagnosisError::Validation(format!(
                "length mismatch: {} voltage samples, {} current samples",
                voltage.len(),
                current.len()
            )));
        }
        if voltage.len() < Self::MIN_POINTS {
            return Err(DiagnosisError::Validation(format!(
                "curve needs at least {} samples, got {}",
                Self::MIN_POINTS,
                voltage.len()
            )));
        }
        if let Some(idx) = voltage
            .iter()
            .zip(current.iter())
            .position(|(v, i)| !v.is_finite() || !i.is_finite())
        {
            return Err(DiagnosisError::Validation(format!(
                "non-finite sample at index {}",
                idx
            )));
        }

        Ok(Self { voltage, current })
    }

    pub fn voltage(&self) -> &[f64] {
        &self.voltage
    }

    pub fn current(&self) -> &[f64] {
        &self.current
    }

    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    /// Iterate `(voltage, current)` pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.voltage.iter().copied().zip(self.current.iter().copied())
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.voltage, self.current)
    }

    /// Replace the current samples, keeping the voltage axis.
    pub(crate) fn with_current(&self, current: Vec<f64>) -> Result<Self> {
        Curve::new(self.voltage.clone(), current)
    }
}

// ============================================================================
// Single-Diode Model Parameters
// ============================================================================

/// Physical inputs to the single-diode equation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ModelParameters {
    /// Photogenerated current (A)
    #[validate(range(exclusive_min = 0.0))]
    pub iph: f64,
    /// Diode saturation current (A)
    #[validate(range(exclusive_min = 0.0))]
    pub i0: f64,
    /// Series resistance (Ω)
    #[validate(range(min = 0.0))]
    pub rs: f64,
    /// Shunt resistance (Ω)
    #[validate(range(exclusive_min = 0.0))]
    pub rsh: f64,
    /// Diode ideality factor
    #[serde(default = "default_ideality")]
    #[validate(range(exclusive_min = 0.0))]
    pub n: f64,
    /// Cell temperature (°C)
    #[serde(default = "default_temperature_c")]
    #[validate(range(min = -273.15))]
    pub temperature_c: f64,
    /// Series-connected cells sharing the terminal voltage
    #[serde(default = "default_cells_in_series")]
    #[validate(range(min = 1))]
    pub cells_in_series: u32,
}

fn default_ideality() -> f64 {
    1.0
}

fn default_temperature_c() -> f64 {
    STC_TEMPERATURE_C
}

fn default_cells_in_series() -> u32 {
    60
}

impl ModelParameters {
    /// Parameters at 25 °C with ideality 1.0 and a 60-cell module
    pub fn new(iph: f64, i0: f64, rs: f64, rsh: f64) -> Self {
        Self {
            iph,
            i0,
            rs,
            rsh,
            n: default_ideality(),
            temperature_c: default_temperature_c(),
            cells_in_series: default_cells_in_series(),
        }
    }

    pub fn with_ideality(mut self, n: f64) -> Self {
        self.n = n;
        self
    }

    pub fn with_temperature_c(mut self, temperature_c: f64) -> Self {
        self.temperature_c = temperature_c;
        self
    }

    pub fn with_cells_in_series(mut self, cells: u32) -> Self {
        self.cells_in_series = cells;
        self
    }

    /// Absolute temperature (K)
    pub fn temperature_k(&self) -> f64 {
        self.temperature_c + CELSIUS_TO_KELVIN
    }

    /// Module thermal voltage `Ns·n·k·T/q` (V)
    pub fn thermal_voltage(&self) -> f64 {
        self.cells_in_series as f64 * self.n * BOLTZMANN * self.temperature_k()
            / ELEMENTARY_CHARGE
    }

    /// Check the physical invariants (`iph > 0`, `rs >= 0`, `rsh > 0`, ...)
    pub fn check(&self) -> Result<()> {
        let values = [self.iph, self.i0, self.rs, self.rsh, self.n, self.temperature_c];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DiagnosisError::Validation(
                "model parameters must be finite".to_string(),
            ));
        }
        self.validate()?;
        Ok(())
    }
}
