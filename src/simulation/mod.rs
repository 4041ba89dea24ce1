//! # PV Simulation Module
//!
//! Forward physical model of a PV module.
//!
//! ## Components
//!
//! - **Diode**: bounded iterative solver for the single-diode equation
//! - **I-V curve**: full sweeps with optional fault injection and measurement noise
//!
//! ## Usage
//!
//! ```rust
//! use pv_diagnostics::domain::{FaultLabel, ModelParameters};
//! use pv_diagnostics::simulation::CurveSimulator;
//!
//! let params = ModelParameters::new(10.0, 1e-10, 0.1, 100.0);
//! let simulator = CurveSimulator::default();
//!
//! let healthy = simulator.simulate(&params, 40.0, None).unwrap();
//! let shaded = simulator
//!     .simulate(&params, 40.0, Some(FaultLabel::PartialShading))
//!     .unwrap();
//! assert_eq!(healthy.len(), shaded.len());
//! ```

pub mod diode;
pub mod iv_curve;

pub use diode::{DiodeSolver, OperatingPoint};
pub use iv_curve::{with_noise, CurveSimulator};
