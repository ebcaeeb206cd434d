//! Facts and the attribute schema.
//!
//! A fact is an immutable set of `attribute -> value` slots living in working
//! memory. Attributes form a closed set and each declares the kind of value
//! it accepts, so mistyped or misspelled input is rejected at declaration
//! instead of silently never matching a rule.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value::Value;

/// A patient document: attribute name to raw JSON value.
pub type PatientRecord = serde_json::Map<String, serde_json::Value>;

/// Identity of a fact: its insertion index in the store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactId(u64);

impl FactId {
    /// Wraps a raw insertion index.
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Returns the raw insertion index.
    #[must_use]
    pub const fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f-{}", self.0)
    }
}

impl fmt::Debug for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f-{}", self.0)
    }
}

/// The kind of value an attribute accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Whole numbers. Reals without a fractional part are accepted.
    Integer,
    /// Any finite real number.
    Number,
    /// One of a fixed set of names, matched case-insensitively on input.
    Choice(&'static [&'static str]),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "an integer"),
            Self::Number => write!(f, "a number"),
            Self::Choice(options) => write!(f, "one of {options:?}"),
        }
    }
}

/// 2^63: the first float past `i64::MAX`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

const YES_NO: &[&str] = &["Yes", "No"];
const EXERCISE: &[&str] = &["None", "Irregular", "Regular"];
const DIET: &[&str] = &["Healthy", "Unhealthy"];
const LOW_MODERATE_HIGH: &[&str] = &["Low", "Moderate", "High"];
const LOW_MEDIUM_HIGH: &[&str] = &["Low", "Medium", "High"];
const RISK_LEVELS: &[&str] = &["Elevated", "High"];

/// Risk factor names asserted by the rule catalog.
pub const RISK_FACTORS: &[&str] = &[
    "HighCholesterol",
    "Hypertension",
    "Obesity",
    "Smoking",
    "Sedentary",
    "Cardiac",
    "Diet",
    "Diabetes",
];

macro_rules! attributes {
    ($($variant:ident => $name:literal : $kind:expr,)*) => {
        /// Every attribute the engine knows about.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum Attribute {
            $(#[allow(missing_docs)] $variant,)*
        }

        impl Attribute {
            /// All attributes in declaration order.
            pub const ALL: &'static [Attribute] = &[$(Attribute::$variant,)*];

            /// The snake_case name used in patient documents.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// The kind of value this attribute accepts.
            #[must_use]
            pub const fn kind(self) -> ValueKind {
                match self {
                    $(Self::$variant => $kind,)*
                }
            }
        }

        impl FromStr for Attribute {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($name => Ok(Self::$variant),)*
                    other => Err(ValidationError::UnknownAttribute {
                        name: other.to_string(),
                    }),
                }
            }
        }
    };
}

attributes! {
    Age => "age": ValueKind::Integer,
    Sex => "sex": ValueKind::Integer,
    Cholesterol => "cholesterol": ValueKind::Integer,
    BloodPressure => "blood_pressure": ValueKind::Integer,
    HeartRate => "heart_rate": ValueKind::Integer,
    Glucose => "glucose": ValueKind::Integer,
    SleepHours => "sleep_hours": ValueKind::Integer,
    Bmi => "bmi": ValueKind::Number,
    Oldpeak => "oldpeak": ValueKind::Number,
    Cp => "cp": ValueKind::Integer,
    Fbs => "fbs": ValueKind::Integer,
    Restecg => "restecg": ValueKind::Integer,
    Exang => "exang": ValueKind::Integer,
    Slope => "slope": ValueKind::Integer,
    Ca => "ca": ValueKind::Integer,
    Thal => "thal": ValueKind::Integer,
    Trestbps => "trestbps": ValueKind::Integer,
    Chol => "chol": ValueKind::Integer,
    Thalach => "thalach": ValueKind::Integer,
    Smoking => "smoking": ValueKind::Choice(YES_NO),
    ChestPain => "chest_pain": ValueKind::Choice(YES_NO),
    FamilyHistory => "family_history": ValueKind::Choice(YES_NO),
    Alcohol => "alcohol": ValueKind::Choice(YES_NO),
    Exercise => "exercise": ValueKind::Choice(EXERCISE),
    Diet => "diet": ValueKind::Choice(DIET),
    PhysicalActivity => "physical_activity": ValueKind::Choice(LOW_MODERATE_HIGH),
    StressLevel => "stress_level": ValueKind::Choice(LOW_MEDIUM_HIGH),
    RiskFactor => "risk_factor": ValueKind::Choice(RISK_FACTORS),
    RiskLevel => "risk_level": ValueKind::Choice(RISK_LEVELS),
}

impl Attribute {
    /// Checks `value` against this attribute's kind and returns its canonical form.
    ///
    /// Choice values are matched case-insensitively and rewritten to their
    /// canonical spelling; integral reals are narrowed to integers.
    pub fn normalize(self, value: Value) -> Result<Value, ValidationError> {
        let mismatch = |value: &Value| ValidationError::TypeMismatch {
            attribute: self.name().to_string(),
            expected: self.kind().to_string(),
            actual: value.type_name().to_string(),
        };

        match (self.kind(), value) {
            (ValueKind::Integer, Value::Int(v)) => Ok(Value::Int(v)),
            (ValueKind::Integer, Value::Float(v))
                if v.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&v) =>
            {
                #[allow(clippy::cast_possible_truncation)]
                Ok(Value::Int(v as i64))
            }
            (ValueKind::Number, Value::Int(v)) => Ok(Value::Int(v)),
            (ValueKind::Number, Value::Float(v)) if v.is_finite() => Ok(Value::Float(v)),
            (ValueKind::Choice(options), Value::String(s)) => {
                let trimmed = s.trim();
                options
                    .iter()
                    .find(|o| o.eq_ignore_ascii_case(trimmed))
                    .map(|o| Value::String((*o).to_string()))
                    .ok_or_else(|| ValidationError::InvalidChoice {
                        attribute: self.name().to_string(),
                        value: s,
                    })
            }
            (_, other) => Err(mismatch(&other)),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated, normalized slots of a fact that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FactSpec {
    slots: BTreeMap<Attribute, Value>,
}

impl FactSpec {
    /// A single-slot fact, the usual shape for patient input.
    pub fn single(attribute: Attribute, value: impl Into<Value>) -> Result<Self, ValidationError> {
        Self::from_slots([(attribute, value.into())])
    }

    /// Builds a fact from several slots. At least one slot is required.
    pub fn from_slots(
        slots: impl IntoIterator<Item = (Attribute, Value)>,
    ) -> Result<Self, ValidationError> {
        let mut out = BTreeMap::new();
        for (attribute, value) in slots {
            let value = attribute.normalize(value)?;
            if out.insert(attribute, value).is_some() {
                return Err(ValidationError::invalid_fact(format!(
                    "attribute '{attribute}' given twice"
                )));
            }
        }
        if out.is_empty() {
            return Err(ValidationError::invalid_fact("a fact needs at least one attribute"));
        }
        Ok(Self { slots: out })
    }

    /// Builds a fact from a JSON object of `name -> scalar`.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, ValidationError> {
        let serde_json::Value::Object(map) = json else {
            return Err(ValidationError::invalid_fact(format!(
                "expected a mapping of attribute to value, got {}",
                json_kind(json)
            )));
        };
        let mut slots = Vec::with_capacity(map.len());
        for (name, raw) in map {
            let attribute: Attribute = name.parse()?;
            let value = Value::from_json(raw).ok_or_else(|| ValidationError::TypeMismatch {
                attribute: attribute.name().to_string(),
                expected: attribute.kind().to_string(),
                actual: json_kind(raw).to_string(),
            })?;
            slots.push((attribute, value));
        }
        Self::from_slots(slots)
    }

    /// The normalized slots.
    #[must_use]
    pub fn slots(&self) -> &BTreeMap<Attribute, Value> {
        &self.slots
    }
}

pub(crate) fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// An immutable fact in working memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    /// Insertion index.
    pub id: FactId,
    /// Attribute slots.
    pub slots: BTreeMap<Attribute, Value>,
    /// When the fact entered working memory.
    pub asserted_at: DateTime<Utc>,
}

impl Fact {
    pub(crate) fn new(id: FactId, spec: FactSpec) -> Self {
        Self {
            id,
            slots: spec.slots,
            asserted_at: Utc::now(),
        }
    }

    /// Returns the value stored under `attribute`, if any.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> Option<&Value> {
        self.slots.get(&attribute)
    }

    /// Returns true if the fact carries exactly these slots.
    #[must_use]
    pub fn same_slots(&self, spec: &FactSpec) -> bool {
        self.slots == spec.slots
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.id)?;
        for (i, (attribute, value)) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{attribute}: {value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_round_trips_through_name() {
        for attribute in Attribute::ALL {
            assert_eq!(attribute.name().parse::<Attribute>().unwrap(), *attribute);
        }
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let err = "cholesterole".parse::<Attribute>().unwrap_err();
        assert!(matches!(err, ValidationError::UnknownAttribute { name } if name == "cholesterole"));
    }

    #[test]
    fn test_choice_normalized_case_insensitively() {
        let v = Attribute::Smoking.normalize(Value::from(" yes ")).unwrap();
        assert_eq!(v, Value::String("Yes".to_string()));
        let v = Attribute::Exercise.normalize(Value::from("none")).unwrap();
        assert_eq!(v, Value::String("None".to_string()));
    }

    #[test]
    fn test_invalid_choice_rejected() {
        let err = Attribute::Diet.normalize(Value::from("keto")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidChoice { .. }));
    }

    #[test]
    fn test_integer_attribute_accepts_integral_float() {
        assert_eq!(
            Attribute::Cholesterol.normalize(Value::Float(240.0)).unwrap(),
            Value::Int(240)
        );
        let err = Attribute::Cholesterol.normalize(Value::Float(240.5)).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_integer_attribute_rejects_values_beyond_i64() {
        let err = Attribute::Cholesterol.normalize(Value::Float(1e300)).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));

        let huge = FactSpec::from_json(&serde_json::json!({"glucose": u64::MAX}));
        assert!(matches!(huge, Err(ValidationError::TypeMismatch { .. })));

        assert_eq!(
            Attribute::Age.normalize(Value::Float(-9.0e18)).unwrap(),
            Value::Int(-9_000_000_000_000_000_000)
        );
    }

    #[test]
    fn test_number_attribute_rejects_string() {
        let err = Attribute::Bmi.normalize(Value::from("thirty")).unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { attribute, .. } if attribute == "bmi"));
    }

    #[test]
    fn test_fact_spec_from_json_requires_mapping() {
        let err = FactSpec::from_json(&serde_json::json!([1, 2])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFact { .. }));
        let err = FactSpec::from_json(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFact { .. }));
    }

    #[test]
    fn test_fact_spec_from_json_multi_slot() {
        let spec = FactSpec::from_json(&serde_json::json!({"age": 61, "chest_pain": "YES"})).unwrap();
        assert_eq!(spec.slots().len(), 2);
        assert_eq!(spec.slots()[&Attribute::ChestPain], Value::String("Yes".to_string()));
    }

    #[test]
    fn test_fact_display() {
        let fact = Fact::new(FactId::new(2), FactSpec::single(Attribute::Cholesterol, 250).unwrap());
        assert_eq!(format!("{fact}"), "f-2{cholesterol: 250}");
    }
}
