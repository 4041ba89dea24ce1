//! # Single-Diode Equation Solver
//!
//! Solves the implicit Shockley relation for the terminal current of a PV
//! module:
//!
//! ```text
//! I = Iph − I0·(exp((V + I·Rs)/Vt) − 1) − (V + I·Rs)/Rsh
//! ```
//!
//! with `Vt = Ns·n·k·T/q`. The iteration is seeded at `I = Iph` and runs a
//! bounded number of Newton updates on the residual. Plain substitution of the
//! right-hand side has a loop gain of `I0·exp(..)·Rs/Vt`, which exceeds one
//! beyond the knee, so it cannot be used for a full sweep.

use tracing::trace;

use crate::config::SolverConfig;
use crate::domain::ModelParameters;

/// Outcome of solving a single operating point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPoint {
    pub current: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Bounded iterative solver for the single-diode equation
#[derive(Debug, Clone)]
pub struct DiodeSolver {
    config: SolverConfig,
}

impl Default for DiodeSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl DiodeSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve for the current at one terminal voltage.
    ///
    /// Never fails: if the iteration cap is reached the last iterate is
    /// returned with `converged == false`, and a non-finite update stops the
    /// loop at the last finite value.
    pub fn solve_point(&self, voltage: f64, params: &ModelParameters) -> OperatingPoint {
        let vt = params.thermal_voltage();
        let mut current = params.iph;

        for iteration in 1..=self.config.max_iterations {
            let diode_voltage = voltage + current * params.rs;
            let diode_current = params.i0 * (diode_voltage / vt).exp();

            let residual = params.iph - (diode_current - params.i0)
                - diode_voltage / params.rsh
                - current;
            let slope = -diode_current * params.rs / vt - params.rs / params.rsh - 1.0;
            let next = current - residual / slope;

            if !next.is_finite() {
                trace!(voltage, iteration, "diode iteration left the finite range");
                return OperatingPoint {
                    current,
                    iterations: iteration,
                    converged: false,
                };
            }

            if (current - next).abs() < self.config.tolerance {
                return OperatingPoint {
                    current: next,
                    iterations: iteration,
                    converged: true,
                };
            }
            current = next;
        }

        trace!(voltage, current, "diode iteration cap reached");
        OperatingPoint {
            current,
            iterations: self.config.max_iterations,
            converged: false,
        }
    }

    /// Current at one voltage
    pub fn current_at(&self, voltage: f64, params: &ModelParameters) -> f64 {
        self.solve_point(voltage, params).current
    }

    /// Element-wise solve over a voltage sweep
    pub fn solve(&self, voltage: &[f64], params: &ModelParameters) -> Vec<f64> {
        voltage.iter().map(|&v| self.current_at(v, params)).collect()
    }
}
