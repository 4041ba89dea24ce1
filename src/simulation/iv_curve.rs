//! # I-V Curve Simulation
//!
//! Generates full current-voltage sweeps from single-diode parameters, with
//! optional fault injection. Faults either perturb the physical parameters
//! before solving (soiling, resistance faults, degradation), combine several
//! independently solved substrings (partial shading), or post-process the raw
//! curve (bypass diode failure).
//!
//! The fault label is only used to generate the curve; it is not stored on the
//! result, so classifiers have to re-derive it from the shape.

use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use super::diode::DiodeSolver;
use crate::config::{FaultInjection, SimulatorConfig};
use crate::domain::{Curve, FaultLabel, ModelParameters};
use crate::error::{DiagnosisError, Result};

/// Synthesizes I-V sweeps with optional fault injection
#[derive(Debug, Clone)]
pub struct CurveSimulator {
    solver: DiodeSolver,
    config: SimulatorConfig,
}

impl Default for CurveSimulator {
    fn default() -> Self {
        Self::new(DiodeSolver::default(), SimulatorConfig::default())
    }
}

impl CurveSimulator {
    pub fn new(solver: DiodeSolver, config: SimulatorConfig) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Voltage axis: `points` samples spanning `[0, sweep_factor·v_oc_approx]`
    pub fn voltage_sweep(&self, v_oc_approx: f64) -> Vec<f64> {
        let points = self.config.points.max(Curve::MIN_POINTS);
        let v_max = self.config.sweep_factor * v_oc_approx;
        let step = v_max / (points - 1) as f64;
        (0..points).map(|i| i as f64 * step).collect()
    }

    /// Simulate a sweep, optionally with an injected fault.
    ///
    /// `None` and `Some(FaultLabel::Normal)` produce the same curve.
    pub fn simulate(
        &self,
        params: &ModelParameters,
        v_oc_approx: f64,
        fault: Option<FaultLabel>,
    ) -> Result<Curve> {
        params.check()?;
        if !(v_oc_approx.is_finite() && v_oc_approx > 0.0) {
            return Err(DiagnosisError::Validation(format!(
                "v_oc_approx must be positive, got {}",
                v_oc_approx
            )));
        }

        let voltage = self.voltage_sweep(v_oc_approx);
        let faults = &self.config.faults;
        let fault = fault.unwrap_or(FaultLabel::Normal);

        let current = match fault {
            FaultLabel::Normal => self.solver.solve(&voltage, params),
            FaultLabel::PartialShading => self.shaded_current(&voltage, params, faults),
            FaultLabel::Soiling => {
                let mut p = params.clone();
                p.iph *= faults.soiling_iph_factor;
                self.solver.solve(&voltage, &p)
            }
            FaultLabel::SeriesResistance => {
                let mut p = params.clone();
                p.rs *= faults.series_rs_factor;
                self.solver.solve(&voltage, &p)
            }
            FaultLabel::ShuntResistance => {
                let mut p = params.clone();
                p.rsh *= faults.shunt_rsh_factor;
                self.solver.solve(&voltage, &p)
            }
            FaultLabel::Degradation => {
                let mut p = params.clone();
                p.iph *= faults.degradation_iph_factor;
                p.i0 *= faults.degradation_i0_factor;
                self.solver.solve(&voltage, &p)
            }
            FaultLabel::BypassDiodeFailure => {
                let mut current = self.solver.solve(&voltage, params);
                apply_bypass_ramp(&mut current, faults);
                current
            }
        };

        debug!(%fault, points = voltage.len(), v_oc_approx, "simulated I-V curve");
        Curve::new(voltage, current)
    }

    /// Simulate with the fault given by name (`None` for a healthy module)
    pub fn simulate_named(
        &self,
        params: &ModelParameters,
        v_oc_approx: f64,
        fault: Option<&str>,
    ) -> Result<Curve> {
        let fault = fault.map(FaultLabel::parse).transpose()?;
        self.simulate(params, v_oc_approx, fault)
    }

    /// Series substrings each see `V/segments`; the last one is shaded. The
    /// string current is clamped to the weakest substring.
    fn shaded_current(
        &self,
        voltage: &[f64],
        params: &ModelParameters,
        faults: &FaultInjection,
    ) -> Vec<f64> {
        let segments = faults.shading_segments.max(1);
        let cells = (params.cells_in_series / segments as u32).max(1);

        let mut current = vec![f64::INFINITY; voltage.len()];
        for segment in 0..segments {
            let mut p = params.clone().with_cells_in_series(cells);
            if segment == segments - 1 {
                p.iph *= faults.shaded_iph_factor;
            }
            for (out, &v) in current.iter_mut().zip(voltage) {
                let i = self.solver.current_at(v / segments as f64, &p);
                *out = out.min(i);
            }
        }
        current
    }
}

/// Scale the tail of the sweep by a linear ramp from 1.0 down to the floor.
fn apply_bypass_ramp(current: &mut [f64], faults: &FaultInjection) {
    let n = current.len();
    let start = ((n as f64 * faults.bypass_start_fraction) as usize).min(n);
    let span = n - start;
    for (j, value) in current[start..].iter_mut().enumerate() {
        let ramp = if span > 1 {
            1.0 + (faults.bypass_ramp_floor - 1.0) * j as f64 / (span - 1) as f64
        } else {
            1.0
        };
        *value *= ramp;
    }
}

/// Add zero-mean Gaussian noise to the current samples of a curve.
///
/// Deterministic for a given seed.
pub fn with_noise(curve: &Curve, sigma: f64, seed: u64) -> Result<Curve> {
    if sigma == 0.0 {
        return Ok(curve.clone());
    }
    let normal = Normal::new(0.0, sigma)
        .map_err(|e| DiagnosisError::Validation(format!("invalid noise sigma {}: {}", sigma, e)))?;
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let current = curve
        .current()
        .iter()
        .map(|i| i + normal.sample(&mut rng))
        .collect();
    curve.with_current(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> ModelParameters {
        ModelParameters::new(10.0, 1e-10, 0.1, 100.0)
    }

    #[test]
    fn test_voltage_sweep() {
        let sim = CurveSimulator::default();
        let v = sim.voltage_sweep(40.0);
        assert_eq!(v.len(), 100);
        assert_eq!(v[0], 0.0);
        assert!((v[99] - 44.0).abs() < 1e-9);
        assert!(v.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_normal_curve_shape() {
        let sim = CurveSimulator::default();
        let curve = sim.simulate(&reference(), 40.0, None).unwrap();
        assert_eq!(curve.len(), 100);
        assert!(curve.current()[0] > 9.9);
        assert!(*curve.current().last().unwrap() < 0.0);

        let same = sim
            .simulate(&reference(), 40.0, Some(FaultLabel::Normal))
            .unwrap();
        assert_eq!(curve, same);
    }

    #[test]
    fn test_soiling_scales_short_circuit_current() {
        let sim = CurveSimulator::default();
        let normal = sim.simulate(&reference(), 40.0, None).unwrap();
        let soiled = sim
            .simulate(&reference(), 40.0, Some(FaultLabel::Soiling))
            .unwrap();
        let ratio = soiled.current()[0] / normal.current()[0];
        assert!((ratio - 0.8).abs() < 1e-3);
    }

    #[test]
    fn test_partial_shading_clamps_to_shaded_substring() {
        let sim = CurveSimulator::default();
        let shaded = sim
            .simulate(&reference(), 40.0, Some(FaultLabel::PartialShading))
            .unwrap();
        // Shaded third only generates 30 % of the photocurrent
        assert!(shaded.current()[0] < 3.01);
        assert!(shaded.current()[0] > 2.9);
        assert!(*shaded.current().last().unwrap() < 0.0);
    }

    #[test]
    fn test_bypass_ramp() {
        let mut current = vec![1.0; 100];
        apply_bypass_ramp(&mut current, &FaultInjection::default());
        assert_eq!(current[32], 1.0);
        assert_eq!(current[33], 1.0);
        assert!((current[99] - 0.3).abs() < 1e-12);
        assert!(current[33..].windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_bypass_ramp_short_tail() {
        let mut current = vec![2.0; 2];
        apply_bypass_ramp(&mut current, &FaultInjection::default());
        assert_eq!(current[0], 2.0);
        assert!((current[1] - 0.6).abs() < 1e-12);

        let mut single = vec![2.0];
        apply_bypass_ramp(&mut single, &FaultInjection::default());
        assert_eq!(single, vec![2.0]);
    }

    #[test]
    fn test_simulate_named() {
        let sim = CurveSimulator::default();
        let by_name = sim
            .simulate_named(&reference(), 40.0, Some("degradation"))
            .unwrap();
        let by_label = sim
            .simulate(&reference(), 40.0, Some(FaultLabel::Degradation))
            .unwrap();
        assert_eq!(by_name, by_label);
        assert!(matches!(
            sim.simulate_named(&reference(), 40.0, Some("hail")),
            Err(DiagnosisError::UnknownFault(_))
        ));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let sim = CurveSimulator::default();
        assert!(sim.simulate(&reference(), 0.0, None).is_err());
        assert!(sim.simulate(&reference(), f64::NAN, None).is_err());
        let bad = ModelParameters::new(10.0, 1e-10, 0.1, -5.0);
        assert!(sim.simulate(&bad, 40.0, None).is_err());
    }

    #[test]
    fn test_noise_is_seeded() {
        let sim = CurveSimulator::default();
        let curve = sim.simulate(&reference(), 40.0, None).unwrap();
        let a = with_noise(&curve, 0.05, 7).unwrap();
        let b = with_noise(&curve, 0.05, 7).unwrap();
        let c = with_noise(&curve, 0.05, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.voltage(), curve.voltage());
        assert_eq!(with_noise(&curve, 0.0, 1).unwrap(), curve);
        assert!(with_noise(&curve, -1.0, 1).is_err());
    }
}
