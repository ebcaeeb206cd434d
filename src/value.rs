//! Values that facts can hold.
//!
//! Patient attributes are either numeric (integer or real) or one of a
//! small set of named choices, which are carried as normalized strings.

use serde::{Deserialize, Serialize};

/// Possible values a fact slot can hold.
///
/// # Examples
///
/// ```
/// use cardiorisk::Value;
///
/// let int_val = Value::Int(240);
/// let float_val = Value::Float(31.5);
/// let string_val = Value::String("Yes".to_string());
///
/// assert!(int_val.is_numeric());
/// assert_eq!(float_val.as_float(), Some(31.5));
/// assert_eq!(string_val.as_string(), Some("Yes"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Returns true for both integer and real values.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::String(_) => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    /// Converts a JSON scalar into a value. Returns `None` for anything else.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_int() {
        let val = Value::Int(42);
        assert!(val.is_int());
        assert!(val.is_numeric());
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.as_float(), Some(42.0)); // Int can be read as float
        assert_eq!(val.type_name(), "int");
    }

    #[test]
    fn test_value_float() {
        let val = Value::Float(22.5);
        assert!(val.is_float());
        assert!((val.as_float().unwrap() - 22.5).abs() < f64::EPSILON);
        assert!(val.as_int().is_none());
    }

    #[test]
    fn test_value_string() {
        let val = Value::String("Yes".to_string());
        assert!(val.is_string());
        assert!(!val.is_numeric());
        assert_eq!(val.as_string(), Some("Yes"));
        assert!(val.as_float().is_none());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Int(240)), "240");
        assert_eq!(format!("{}", Value::String("No".into())), "\"No\"");
    }

    #[test]
    fn test_value_from_json() {
        assert_eq!(Value::from_json(&serde_json::json!(250)), Some(Value::Int(250)));
        assert_eq!(Value::from_json(&serde_json::json!(22.5)), Some(Value::Float(22.5)));
        assert_eq!(
            Value::from_json(&serde_json::json!("yes")),
            Some(Value::String("yes".to_string()))
        );
        assert!(Value::from_json(&serde_json::json!(true)).is_none());
        assert!(Value::from_json(&serde_json::json!(null)).is_none());
        assert!(Value::from_json(&serde_json::json!([1, 2])).is_none());
    }

    #[test]
    fn test_value_untagged_serialization() {
        let json = serde_json::to_string(&Value::Int(5)).unwrap();
        assert_eq!(json, "5");
        let back: Value = serde_json::from_str("\"Regular\"").unwrap();
        assert_eq!(back, Value::String("Regular".to_string()));
    }
}
