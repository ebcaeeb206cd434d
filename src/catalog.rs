//! The heart-disease rule catalog.
//!
//! Single-attribute screening rules come first, in a fixed order, each
//! concluding and asserting a `risk_factor`. Chained rules that consume
//! those derived facts follow. Declaration order is also firing order.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::fact::{Attribute, FactSpec};
use crate::rule::{Condition, Predicate, Rule};
use crate::value::Value;

/// Numeric cut-offs used by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    /// Total cholesterol (mg/dL) at or above which risk is flagged.
    pub cholesterol: f64,
    /// Systolic blood pressure (mmHg) at or above which risk is flagged.
    pub blood_pressure: f64,
    /// BMI at or above which obesity is flagged.
    pub bmi: f64,
    /// Age strictly above which chest pain is treated as cardiac.
    pub cardiac_age: f64,
    /// Fasting glucose (mg/dL) at or above which diabetes risk is flagged.
    pub glucose: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            cholesterol: 240.0,
            blood_pressure: 140.0,
            bmi: 30.0,
            cardiac_age: 50.0,
            glucose: 126.0,
        }
    }
}

impl RuleThresholds {
    /// Parses thresholds from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let thresholds: Self =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidThresholds {
                reason: e.to_string(),
            })?;
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Rejects non-finite or negative cut-offs.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("cholesterol", self.cholesterol),
            ("blood_pressure", self.blood_pressure),
            ("bmi", self.bmi),
            ("cardiac_age", self.cardiac_age),
            ("glucose", self.glucose),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidThresholds {
                    reason: format!("{name} must be a non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }
}

fn is(attribute: Attribute, value: &str) -> Predicate {
    // Catalog literals are canonical choice spellings.
    debug_assert!(attribute.normalize(Value::from(value)).is_ok());
    Predicate::Equals(Value::from(value))
}

fn risk_factor(name: &str) -> Result<FactSpec, ValidationError> {
    FactSpec::single(Attribute::RiskFactor, name)
}

/// Builds the catalog in declaration order.
pub fn heart_disease_rules(t: &RuleThresholds) -> Result<Vec<Rule>, ValidationError> {
    t.validate()?;
    Ok(vec![
        Rule::new(
            "high_cholesterol",
            Condition::when(Attribute::Cholesterol, Predicate::AtLeast(t.cholesterol)),
        )
        .conclude("High cholesterol detected: elevated cardiovascular risk.")
        .asserting(risk_factor("HighCholesterol")?),
        Rule::new(
            "hypertension",
            Condition::when(Attribute::BloodPressure, Predicate::AtLeast(t.blood_pressure)),
        )
        .conclude("High blood pressure detected: hypertension risk.")
        .asserting(risk_factor("Hypertension")?),
        Rule::new("obesity", Condition::when(Attribute::Bmi, Predicate::AtLeast(t.bmi)))
            .conclude("BMI in the obese range: obesity increases heart disease risk.")
            .asserting(risk_factor("Obesity")?),
        Rule::new("smoking", Condition::when(Attribute::Smoking, is(Attribute::Smoking, "Yes")))
            .conclude("Smoking detected: significant heart disease risk factor.")
            .asserting(risk_factor("Smoking")?),
        Rule::new(
            "sedentary",
            Condition::when(Attribute::Exercise, is(Attribute::Exercise, "None")),
        )
        .conclude("No regular exercise: sedentary lifestyle risk.")
        .asserting(risk_factor("Sedentary")?),
        Rule::new(
            "cardiac",
            Condition::when(Attribute::ChestPain, is(Attribute::ChestPain, "Yes"))
                .and(Attribute::Age, Predicate::GreaterThan(t.cardiac_age)),
        )
        .conclude("Chest pain at an older age: possible cardiac risk, seek medical evaluation.")
        .asserting(risk_factor("Cardiac")?),
        Rule::new(
            "unhealthy_diet",
            Condition::when(Attribute::Diet, is(Attribute::Diet, "Unhealthy")),
        )
        .conclude("Unhealthy diet: dietary risk for heart disease.")
        .asserting(risk_factor("Diet")?),
        Rule::new("high_glucose", Condition::when(Attribute::Glucose, Predicate::AtLeast(t.glucose)))
            .conclude("High glucose level: diabetes increases heart disease risk.")
            .asserting(risk_factor("Diabetes")?),
        Rule::new(
            "compounded_lifestyle",
            Condition::when(Attribute::RiskFactor, is(Attribute::RiskFactor, "Smoking"))
                .and(Attribute::RiskFactor, is(Attribute::RiskFactor, "Sedentary")),
        )
        .conclude("Smoking combined with a sedentary lifestyle compounds the risk.")
        .asserting(FactSpec::single(Attribute::RiskLevel, "High")?),
        Rule::new(
            "overall_high_risk",
            Condition::when(Attribute::RiskLevel, is(Attribute::RiskLevel, "High")),
        )
        .conclude("Overall risk is high: consult a cardiologist."),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_is_stable() {
        let names: Vec<String> = heart_disease_rules(&RuleThresholds::default())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "high_cholesterol",
                "hypertension",
                "obesity",
                "smoking",
                "sedentary",
                "cardiac",
                "unhealthy_diet",
                "high_glucose",
                "compounded_lifestyle",
                "overall_high_risk",
            ]
        );
    }

    #[test]
    fn thresholds_from_partial_json_keep_defaults() {
        let t = RuleThresholds::from_json_str(r#"{"cardiac_age": 55}"#).unwrap();
        assert!((t.cardiac_age - 55.0).abs() < f64::EPSILON);
        assert!((t.cholesterol - 240.0).abs() < f64::EPSILON);
    }

    #[test]
    fn thresholds_reject_negative_and_garbage() {
        assert!(matches!(
            RuleThresholds::from_json_str(r#"{"bmi": -1}"#),
            Err(ValidationError::InvalidThresholds { .. })
        ));
        assert!(matches!(
            RuleThresholds::from_json_str("not json"),
            Err(ValidationError::InvalidThresholds { .. })
        ));
    }
}
