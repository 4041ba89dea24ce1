use anyhow::{Context, Result};
use pv_diagnostics::config::Config;
use pv_diagnostics::diagnosis::DiagnosisEngine;
use pv_diagnostics::domain::{FaultLabel, ModelParameters, STC_TEMPERATURE_C};
use pv_diagnostics::ml::training::SyntheticDatasetBuilder;
use pv_diagnostics::telemetry::init_tracing;
use serde::Deserialize;
use tracing::{info, warn};

/// Measured sweep read from a JSON file
#[derive(Debug, Deserialize)]
struct CurveInput {
    voltage: Vec<f64>,
    current: Vec<f64>,
    #[serde(default = "stc_temperature")]
    temperature_c: f64,
}

fn stc_temperature() -> f64 {
    STC_TEMPERATURE_C
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;
    let engine = DiagnosisEngine::new(cfg);

    match std::env::args().nth(1) {
        Some(path) => diagnose_file(&engine, &path),
        None => demo(&engine),
    }
}

fn diagnose_file(engine: &DiagnosisEngine, path: &str) -> Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
    let input: CurveInput =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;

    let result = engine.diagnose(input.voltage, input.current, input.temperature_c)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Train on synthetic curves, then diagnose one held-out curve per fault
fn demo(engine: &DiagnosisEngine) -> Result<()> {
    let base = ModelParameters::new(10.0, 1e-10, 0.1, 100.0);
    let seed = engine.config().classifier.seed;

    let samples = SyntheticDatasetBuilder::new(engine.simulator().clone(), base.clone(), 40.0)
        .with_iph_values(vec![8.0, 9.0, 10.0, 11.0])
        .with_noise(0.005, seed)
        .build()?;

    match engine.train(&samples) {
        Ok(report) => info!(
            model_type = %report.model_type,
            training_accuracy = report.training_accuracy,
            "demo classifier ready"
        ),
        Err(e) => warn!(error = %e, "training failed, diagnosing with rules"),
    }

    let held_out = ModelParameters { iph: 9.5, ..base };
    for fault in FaultLabel::all() {
        let curve = engine.simulate(&held_out, 40.0, Some(fault))?;
        let result = engine.diagnose_curve(&curve, STC_TEMPERATURE_C)?;
        info!(
            injected = %fault,
            diagnosed = %result.fault_type,
            confidence = result.confidence,
            health_score = result.health_score,
            "demo diagnosis"
        );
        println!("{}", serde_json::to_string(&result)?);
    }

    Ok(())
}
