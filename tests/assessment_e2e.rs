use std::io::Write;

use cardiorisk::{
    assess, AssessmentConfig, CardioError, DecisionTreeModel, EngineConfig, ExecutionError,
    PatientRecord, RiskLevel, RuleThresholds, ValidationError,
};

const MODEL: &str = r#"{
    "features": ["age", "cholesterol", "blood_pressure", "smoking_yes", "exercise_none"],
    "nodes": [
        {"kind": "split", "feature": 1, "threshold": 245.0, "left": 1, "right": 4},
        {"kind": "split", "feature": 3, "threshold": 0.5, "left": 2, "right": 3},
        {"kind": "leaf", "counts": [80.0, 20.0]},
        {"kind": "leaf", "counts": [30.0, 30.0]},
        {"kind": "leaf", "counts": [10.0, 90.0]}
    ]
}"#;

fn record(json: serde_json::Value) -> PatientRecord {
    json.as_object().unwrap().clone()
}

fn full_patient() -> PatientRecord {
    record(serde_json::json!({
        "age": 70,
        "sex": 0,
        "cp": 3,
        "trestbps": 190,
        "chol": 350,
        "fbs": 1,
        "restecg": 1,
        "thalach": 70,
        "exang": 1,
        "oldpeak": 5.0,
        "slope": 2,
        "ca": 2,
        "thal": 3,
        "cholesterol": 350,
        "blood_pressure": 190,
        "chest_pain": "Yes",
        "stress_level": "High"
    }))
}

#[test]
fn full_assessment_combines_all_three_components() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MODEL.as_bytes()).unwrap();
    let model = DecisionTreeModel::from_path(file.path()).unwrap();

    let assessment = assess(&full_patient(), &AssessmentConfig::default(), Some(&model)).unwrap();

    assert_eq!(
        assessment.report.fired_rules(),
        vec!["high_cholesterol", "hypertension", "cardiac"]
    );
    let fuzzy = assessment.fuzzy.unwrap();
    assert_eq!(fuzzy.level, RiskLevel::High);
    assert!(fuzzy.score > 6.5);

    let c = assessment.classification.unwrap();
    assert_eq!(c.prediction.label, 1);
    assert!((c.prediction.probability - 0.9).abs() < 1e-12);
    // cholesterol 30 + blood pressure 25 + stress 20
    assert!((c.user_risk_score - 75.0).abs() < f64::EPSILON);
    assert!((c.combined_confidence - (63.0 + 22.5)).abs() < 1e-9);
}

#[test]
fn missing_clinical_field_is_reported() {
    let mut patient = full_patient();
    patient.remove("thal");
    let err = assess(&patient, &AssessmentConfig::default(), None).unwrap_err();
    assert!(matches!(
        err,
        CardioError::Validation(ValidationError::MissingField { ref field }) if field == "thal"
    ));
}

#[test]
fn quiet_fuzzy_inputs_surface_no_activation() {
    let patient = record(serde_json::json!({
        "age": 50, "sex": 0, "cp": 0, "trestbps": 145, "chol": 250, "fbs": 0,
        "restecg": 0, "thalach": 130.5, "exang": 0, "oldpeak": 1.0, "slope": 0,
        "ca": 0, "thal": 2
    }));
    // thalach is an integer attribute for the rule engine.
    let err = assess(&patient, &AssessmentConfig::default(), None).unwrap_err();
    assert!(err.is_validation());

    let mut patient = patient;
    patient.insert("thalach".to_string(), serde_json::json!(130));
    let err = assess(&patient, &AssessmentConfig::default(), None);
    assert!(
        matches!(err, Err(CardioError::Execution(ExecutionError::NoFuzzyActivation))),
        "got {err:?}"
    );
}

#[test]
fn cycle_limit_from_config_applies() {
    let config = AssessmentConfig {
        engine: EngineConfig { max_cycles: Some(1) },
        thresholds: RuleThresholds::default(),
    };
    let patient = record(serde_json::json!({"cholesterol": 300, "blood_pressure": 160}));
    let err = assess(&patient, &config, None).unwrap_err();
    assert!(matches!(
        err,
        CardioError::Execution(ExecutionError::CycleLimitExceeded { limit: 1 })
    ));
}

#[test]
fn assessment_serializes_to_json() {
    let patient = record(serde_json::json!({"smoking": "Yes", "exercise": "None"}));
    let assessment = assess(&patient, &AssessmentConfig::default(), None).unwrap();
    let json = serde_json::to_value(&assessment).unwrap();
    assert_eq!(json["report"]["conclusions"].as_array().map(Vec::len), Some(4));
    assert!(json["fuzzy"].is_null());
}
