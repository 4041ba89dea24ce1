//! Load Testing Suite
//!
//! Many threads diagnose curves through one shared engine while another
//! thread retrains it. Every diagnosis must succeed and must come from either
//! the rule table or a complete trained model.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pv_diagnostics::classifier::ClassifierKind;
use pv_diagnostics::diagnosis::DiagnosisEngine;
use pv_diagnostics::domain::{Curve, FaultLabel, ModelParameters};
use pv_diagnostics::ml::training::SyntheticDatasetBuilder;
use pv_diagnostics::ModelType;

fn base() -> ModelParameters {
    ModelParameters::new(10.0, 1e-10, 0.1, 100.0)
}

fn curves(engine: &DiagnosisEngine) -> Vec<Curve> {
    FaultLabel::all()
        .into_iter()
        .map(|fault| engine.simulate(&base(), 40.0, Some(fault)).unwrap())
        .collect()
}

fn run_concurrent(readers: usize, rounds: usize, retrains: usize) -> Vec<ClassifierKind> {
    let _ = pv_diagnostics::telemetry::try_init_tracing();

    let engine = Arc::new(DiagnosisEngine::default());
    let curves = Arc::new(curves(&engine));
    let samples = SyntheticDatasetBuilder::new(engine.simulator().clone(), base(), 40.0)
        .with_iph_values(vec![9.0, 10.0, 11.0])
        .build()
        .unwrap();

    let trainer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for k in 0..retrains {
                let model_type = if k % 2 == 0 || !cfg!(feature = "ml") {
                    ModelType::Svm
                } else {
                    ModelType::RandomForest
                };
                engine.train_with(&samples, model_type).unwrap();
            }
        })
    };

    let handles: Vec<_> = (0..readers)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let curves = Arc::clone(&curves);
            thread::spawn(move || {
                let mut kinds = Vec::with_capacity(rounds * curves.len());
                for _ in 0..rounds {
                    for curve in curves.iter() {
                        let result = engine.diagnose_curve(curve, 25.0).unwrap();
                        assert!((0.0..=100.0).contains(&result.health_score));
                        assert!((0.0..=1.0).contains(&result.confidence));
                        kinds.push(result.classifier);
                    }
                }
                kinds
            })
        })
        .collect();

    trainer.join().unwrap();
    let mut kinds: Vec<ClassifierKind> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    // Training has finished: every later call uses the model
    let after = engine.diagnose_curve(&curves[0], 25.0).unwrap();
    assert_eq!(after.classifier, ClassifierKind::Trained);
    kinds.push(after.classifier);
    kinds
}

#[test]
fn test_concurrent_diagnosis_during_training() {
    let kinds = run_concurrent(4, 5, 2);
    assert_eq!(kinds.len(), 4 * 5 * FaultLabel::COUNT + 1);
}

#[test]
#[ignore]
fn test_sustained_load() {
    let start = Instant::now();
    let kinds = run_concurrent(16, 200, 10);
    let elapsed = start.elapsed();

    println!(
        "{} diagnoses in {:?} ({:.0}/s)",
        kinds.len(),
        elapsed,
        kinds.len() as f64 / elapsed.as_secs_f64()
    );
    assert!(elapsed < Duration::from_secs(120));
}
