//! End-to-end diagnosis of simulated modules with the rule-based classifier.

use pv_diagnostics::analysis::ParameterExtractor;
use pv_diagnostics::classifier::ClassifierKind;
use pv_diagnostics::config::Config;
use pv_diagnostics::diagnosis::{DiagnosisEngine, HealthBand};
use pv_diagnostics::domain::{Curve, FaultLabel, ModelParameters};
use pv_diagnostics::DiagnosisError;
use rstest::rstest;

fn reference() -> ModelParameters {
    ModelParameters::new(10.0, 1e-10, 0.1, 100.0)
}

fn simulate(fault: Option<FaultLabel>) -> Curve {
    DiagnosisEngine::default()
        .simulate(&reference(), 40.0, fault)
        .unwrap()
}

#[test]
fn test_reference_module_is_healthy() {
    let engine = DiagnosisEngine::default();
    let (voltage, current) = simulate(None).into_parts();
    let result = engine.diagnose(voltage, current, 25.0).unwrap();

    assert_eq!(result.fault_type, FaultLabel::Normal);
    assert_eq!(result.classifier, ClassifierKind::RuleBased);
    assert!(result.parameters.curve.fill_factor > 0.75);
    assert!(result.health_score > 80.0);
    assert_eq!(result.health_band, HealthBand::Good);
    assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    assert!((result.parameters.curve.i_sc - 10.0 * 100.0 / 100.1).abs() < 0.05);
}

#[test]
fn test_fill_factor_definition_holds() {
    let params = ParameterExtractor::default().extract(&simulate(None));
    assert!(params.i_sc * params.v_oc > 0.0);
    let expected = params.p_max / (params.i_sc * params.v_oc);
    assert!((params.fill_factor - expected).abs() < 1e-12);
}

#[test]
fn test_reduced_shunt_resistance_lowers_fill_factor() {
    let extractor = ParameterExtractor::default();
    let normal = extractor.extract(&simulate(None));
    let shunted = extractor.extract(&simulate(Some(FaultLabel::ShuntResistance)));
    assert!(shunted.fill_factor < normal.fill_factor);
}

#[test]
fn test_tripled_series_resistance_flattens_high_voltage_slope() {
    // dI/dV near Voc is about -1/Rs for a module, so more series resistance
    // gives a shallower tail (see "Series-resistance slope" in DESIGN.md)
    let extractor = ParameterExtractor::default();
    let normal = extractor.extract(&simulate(None));
    let series = extractor.extract(&simulate(Some(FaultLabel::SeriesResistance)));

    assert!(normal.slope_high_v < 0.0);
    assert!(series.slope_high_v < 0.0);
    assert!(series.slope_high_v.abs() < normal.slope_high_v.abs());
    assert!(series.fill_factor < normal.fill_factor);
}

#[test]
fn test_partial_shading_produces_inflections() {
    let params = ParameterExtractor::default().extract(&simulate(Some(FaultLabel::PartialShading)));
    assert!(params.inflection_points >= 2);
    assert!(params.i_sc < 0.5 * reference().iph);
}

#[rstest]
#[case(FaultLabel::Normal)]
#[case(FaultLabel::PartialShading)]
#[case(FaultLabel::Soiling)]
#[case(FaultLabel::Degradation)]
#[case(FaultLabel::SeriesResistance)]
#[case(FaultLabel::ShuntResistance)]
#[case(FaultLabel::BypassDiodeFailure)]
fn test_every_fault_gets_an_answer(#[case] fault: FaultLabel) {
    let engine = DiagnosisEngine::default();
    let curve = engine.simulate(&reference(), 40.0, Some(fault)).unwrap();
    let result = engine.diagnose_curve(&curve, 25.0).unwrap();

    assert!((0.0..=100.0).contains(&result.health_score));
    assert!((0.0..=1.0).contains(&result.confidence));
    let extracted = ParameterExtractor::default().extract(&curve);
    assert_eq!(result.parameters.curve.inflection_points, extracted.inflection_points);
    assert_eq!(result.parameters.curve.fill_factor, extracted.fill_factor);
    assert!(result.recommendations.len() >= 2);
}

#[test]
fn test_named_simulation_matches_typed() {
    let engine = DiagnosisEngine::default();
    let typed = engine
        .simulate(&reference(), 40.0, Some(FaultLabel::Soiling))
        .unwrap();
    let named = engine
        .simulate_named(&reference(), 40.0, Some("soiling"))
        .unwrap();
    assert_eq!(typed, named);

    let err = engine
        .simulate_named(&reference(), 40.0, Some("snow"))
        .unwrap_err();
    assert!(matches!(err, DiagnosisError::UnknownFault(_)));
}

#[test]
fn test_invalid_curves_fail_fast() {
    let engine = DiagnosisEngine::default();

    let cases: Vec<(Vec<f64>, Vec<f64>)> = vec![
        (vec![], vec![]),
        (vec![0.0, 1.0, 2.0], vec![1.0, 0.5]),
        (vec![0.0], vec![1.0]),
        (vec![0.0, f64::NAN], vec![1.0, 0.0]),
        (vec![0.0, 1.0], vec![1.0, f64::INFINITY]),
    ];
    for (voltage, current) in cases {
        let err = engine.diagnose(voltage, current, 25.0).unwrap_err();
        assert!(err.is_validation(), "unexpected error {}", err);
    }
}

#[test]
fn test_flat_zero_curve_still_answers() {
    let engine = DiagnosisEngine::default();
    let result = engine
        .diagnose(vec![0.0, 1.0, 2.0, 3.0], vec![0.0; 4], 25.0)
        .unwrap();
    assert_eq!(result.parameters.curve.fill_factor, 0.0);
    assert!((0.0..=1.0).contains(&result.confidence));
    assert!((0.0..=100.0).contains(&result.health_score));
}

#[test]
fn test_result_serializes_with_snake_case_labels() {
    let engine = DiagnosisEngine::default();
    let curve = simulate(Some(FaultLabel::PartialShading));
    let result = engine.diagnose_curve(&curve, 25.0).unwrap();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["classifier"], "rule_based");
    assert_eq!(json["fault_type"], result.fault_type.to_string());
    assert!(json["parameters"]["v_oc_stc"].is_number());
}

#[test]
fn test_partial_penalty_file_leaves_healthy_score_alone() {
    let path = std::env::temp_dir().join(format!("pvdiag-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "[health.penalties]\nsoiling = -5.0\n").unwrap();
    let config = Config::load_from(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let curve = simulate(None);
    let tuned = DiagnosisEngine::new(config).diagnose_curve(&curve, 25.0).unwrap();
    let stock = DiagnosisEngine::default().diagnose_curve(&curve, 25.0).unwrap();

    assert_eq!(tuned.fault_type, FaultLabel::Normal);
    assert!((tuned.health_score - stock.health_score).abs() < 1e-9);
    assert!(tuned.health_score > 80.0);
}
