//! One-shot patient assessment.
//!
//! Runs the rule catalog over a patient document on a fresh engine, then the
//! fuzzy calculator when clinical measurements are present, then the
//! classifier when a model is supplied. Input problems are reported before
//! any inference runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{heart_disease_rules, RuleThresholds};
use crate::classifier::{Classification, DecisionTreeModel};
use crate::engine::{ConclusionSink, EngineConfig, InferenceEngine, RunReport};
use crate::error::{CardioResult, ValidationError};
use crate::fact::PatientRecord;
use crate::fuzzy::{FuzzyOutcome, FuzzyRiskSystem};
use crate::validation::{validate_clinical, ClinicalInputs};

/// Configuration for [`assess`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    /// Inference engine settings.
    pub engine: EngineConfig,
    /// Rule catalog cut-offs.
    pub thresholds: RuleThresholds,
}

impl AssessmentConfig {
    /// Parses a configuration document. Missing sections keep defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidThresholds {
                reason: e.to_string(),
            })?;
        config.thresholds.validate()?;
        Ok(config)
    }

    /// Reads a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> CardioResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&json)?)
    }
}

/// Everything the assessor concluded about one patient.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    /// Rule engine run.
    pub report: RunReport,
    /// Fuzzy risk, when clinical measurements were supplied.
    pub fuzzy: Option<FuzzyOutcome>,
    /// Classifier output, when a model was supplied.
    pub classification: Option<Classification>,
}

impl Assessment {
    /// Rule conclusions in firing order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.report.messages()
    }
}

/// Assesses one patient document.
pub fn assess(
    record: &PatientRecord,
    config: &AssessmentConfig,
    model: Option<&DecisionTreeModel>,
) -> CardioResult<Assessment> {
    assess_with_sink(record, config, model, None)
}

/// Like [`assess`], streaming rule conclusions to `sink` as they fire.
pub fn assess_with_sink(
    record: &PatientRecord,
    config: &AssessmentConfig,
    model: Option<&DecisionTreeModel>,
    sink: Option<Box<dyn ConclusionSink>>,
) -> CardioResult<Assessment> {
    let clinical = ClinicalInputs::from_record(record)?;
    if let Some(inputs) = &clinical {
        validate_clinical(inputs)?;
    }

    let rules = heart_disease_rules(&config.thresholds)?;
    let mut engine = InferenceEngine::with_config(rules, config.engine.clone());
    if let Some(sink) = sink {
        engine = engine.with_sink(sink);
    }
    engine.declare_record(record)?;
    let report = engine.run()?;

    let fuzzy = clinical
        .map(|inputs| FuzzyRiskSystem::heart_disease().evaluate(&inputs))
        .transpose()?;
    let classification = model.map(|m| m.classify(record));

    info!(
        run_id = %report.run_id,
        conclusions = report.conclusions.len(),
        fuzzy = fuzzy.as_ref().map_or("-", |f| f.level.as_str()),
        predicted = classification.map_or(-1, |c| i32::from(c.prediction.label)),
        "assessment complete"
    );

    Ok(Assessment {
        report,
        fuzzy,
        classification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fuzzy::RiskLevel;

    fn record(json: serde_json::Value) -> PatientRecord {
        json.as_object().unwrap().clone()
    }

    #[test]
    fn lifestyle_only_record_skips_fuzzy() {
        let r = record(serde_json::json!({"cholesterol": 250, "blood_pressure": 150}));
        let a = assess(&r, &AssessmentConfig::default(), None).unwrap();
        assert_eq!(a.messages().len(), 2);
        assert!(a.fuzzy.is_none());
        assert!(a.classification.is_none());
    }

    #[test]
    fn clinical_record_gets_fuzzy_risk() {
        let r = record(serde_json::json!({
            "age": 25, "sex": 0, "cp": 0, "trestbps": 120, "chol": 200, "fbs": 0,
            "restecg": 0, "thalach": 180, "exang": 0, "oldpeak": 0.0, "slope": 0,
            "ca": 0, "thal": 2
        }));
        let a = assess(&r, &AssessmentConfig::default(), None).unwrap();
        assert_eq!(a.fuzzy.map(|f| f.level), Some(RiskLevel::Low));
        assert!(a.messages().is_empty());
    }

    #[test]
    fn out_of_range_clinical_value_stops_before_inference() {
        let r = record(serde_json::json!({
            "age": 25, "sex": 0, "cp": 0, "trestbps": 120, "chol": 900, "fbs": 0,
            "restecg": 0, "thalach": 180, "exang": 0, "oldpeak": 0.0, "slope": 0,
            "ca": 0, "thal": 2, "cholesterol": 300
        }));
        let err = assess(&r, &AssessmentConfig::default(), None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn config_parses_nested_sections() {
        let cfg = AssessmentConfig::from_json_str(
            r#"{"engine": {"max_cycles": 50}, "thresholds": {"cholesterol": 200}}"#,
        )
        .unwrap();
        assert_eq!(cfg.engine.max_cycles, Some(50));
        assert!((cfg.thresholds.cholesterol - 200.0).abs() < f64::EPSILON);
        assert!((cfg.thresholds.blood_pressure - 140.0).abs() < f64::EPSILON);
    }
}
