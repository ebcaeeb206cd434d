//! Clinical input validation.
//!
//! Range checks run at the boundary: a value outside its declared medical
//! range stops the assessment before any inference happens.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Clinical measurements used by the fuzzy calculator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClinicalInputs {
    /// Age in years.
    pub age: f64,
    /// 0 = female, 1 = male.
    pub sex: f64,
    /// Chest pain type (0-3).
    pub cp: f64,
    /// Resting blood pressure (mmHg).
    pub trestbps: f64,
    /// Serum cholesterol (mg/dL).
    pub chol: f64,
    /// Fasting blood sugar > 120 mg/dL (0/1).
    pub fbs: f64,
    /// Resting ECG result (0-2).
    pub restecg: f64,
    /// Maximum heart rate achieved.
    pub thalach: f64,
    /// Exercise-induced angina (0/1).
    pub exang: f64,
    /// ST depression induced by exercise.
    pub oldpeak: f64,
    /// Slope of the peak exercise ST segment (0-2).
    pub slope: f64,
    /// Number of major vessels (0-3).
    pub ca: f64,
    /// Thalassemia type (0-3).
    pub thal: f64,
}

/// Inclusive `(field, min, max)` ranges.
pub const CLINICAL_RANGES: &[(&str, f64, f64)] = &[
    ("age", 0.0, 100.0),
    ("sex", 0.0, 1.0),
    ("cp", 0.0, 3.0),
    ("trestbps", 90.0, 200.0),
    ("chol", 100.0, 600.0),
    ("fbs", 0.0, 1.0),
    ("restecg", 0.0, 2.0),
    ("thalach", 60.0, 200.0),
    ("exang", 0.0, 1.0),
    ("oldpeak", 0.0, 6.9),
    ("slope", 0.0, 2.0),
    ("ca", 0.0, 3.0),
    ("thal", 0.0, 3.0),
];

impl ClinicalInputs {
    /// Field values in the order of [`CLINICAL_RANGES`].
    #[must_use]
    pub fn values(&self) -> [f64; 13] {
        [
            self.age,
            self.sex,
            self.cp,
            self.trestbps,
            self.chol,
            self.fbs,
            self.restecg,
            self.thalach,
            self.exang,
            self.oldpeak,
            self.slope,
            self.ca,
            self.thal,
        ]
    }

    /// Extracts the clinical fields from a patient document.
    ///
    /// Returns `Ok(None)` when no clinical field besides `age` is present,
    /// and an error when only some of them are or one is not a number.
    pub fn from_record(
        record: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<Self>, ValidationError> {
        // `age` is shared with the rule engine's attributes, so it alone
        // does not signal that clinical inputs were supplied.
        let present = CLINICAL_RANGES
            .iter()
            .filter(|(name, _, _)| *name != "age" && record.contains_key(*name))
            .count();
        if present == 0 {
            return Ok(None);
        }

        let mut values = [0.0f64; 13];
        for (slot, (name, _, _)) in values.iter_mut().zip(CLINICAL_RANGES) {
            let raw = record.get(*name).ok_or_else(|| ValidationError::MissingField {
                field: (*name).to_string(),
            })?;
            *slot = raw.as_f64().ok_or_else(|| ValidationError::TypeMismatch {
                attribute: (*name).to_string(),
                expected: "a number".to_string(),
                actual: crate::fact::json_kind(raw).to_string(),
            })?;
        }
        let [age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang, oldpeak, slope, ca, thal] =
            values;
        Ok(Some(Self {
            age,
            sex,
            cp,
            trestbps,
            chol,
            fbs,
            restecg,
            thalach,
            exang,
            oldpeak,
            slope,
            ca,
            thal,
        }))
    }
}

/// Checks a single value against an inclusive range.
fn validate_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value.is_nan() || value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
    Ok(())
}

/// Validates every clinical field against [`CLINICAL_RANGES`].
pub fn validate_clinical(inputs: &ClinicalInputs) -> Result<(), ValidationError> {
    for ((field, min, max), value) in CLINICAL_RANGES.iter().zip(inputs.values()) {
        validate_range(field, value, *min, *max)?;
    }
    Ok(())
}
