//! PV module I-V curve diagnostics.
//!
//! Simulates current-voltage sweeps of a photovoltaic module with injected
//! faults, extracts shape features from measured sweeps, classifies the fault
//! with a rule table or a trained model and reports a health score with
//! maintenance recommendations.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod diagnosis;
pub mod domain;
pub mod error;
pub mod ml;
pub mod simulation;
pub mod telemetry;

pub use diagnosis::{DiagnosisEngine, DiagnosisResult};
pub use domain::{Curve, FaultLabel, ModelParameters};
pub use error::{DiagnosisError, Result};
pub use ml::training::TrainingSample;
pub use ml::ModelType;
