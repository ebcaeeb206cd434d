//! Error types for cardiorisk.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! the specific condition: bad input never reaches the engine, and a rule
//! failure names the rule and binding that caused it.

use thiserror::Error;

use crate::fact::FactId;

/// Validation errors raised before any inference takes place.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid fact: {reason}")]
    InvalidFact {
        reason: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute {
        name: String,
    },

    #[error("Attribute '{attribute}' expects {expected}, got {actual}")]
    TypeMismatch {
        attribute: String,
        expected: String,
        actual: String,
    },

    #[error("Attribute '{attribute}' does not accept value {value:?}")]
    InvalidChoice {
        attribute: String,
        value: String,
    },

    #[error("Field '{field}' value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid model: {reason}")]
    InvalidModel {
        reason: String,
    },

    #[error("Invalid thresholds: {reason}")]
    InvalidThresholds {
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidFact`].
    #[must_use]
    pub fn invalid_fact(reason: impl Into<String>) -> Self {
        Self::InvalidFact {
            reason: reason.into(),
        }
    }
}

/// Execution errors that abort an inference run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Rule '{rule}' failed on binding {binding:?}: {reason}")]
    RuleExecution {
        rule: String,
        binding: Vec<FactId>,
        reason: String,
    },

    #[error("Inference exceeded the cycle limit of {limit}")]
    CycleLimitExceeded {
        limit: usize,
    },

    #[error("No fuzzy rule was activated; crisp risk cannot be computed")]
    NoFuzzyActivation,
}

/// Top-level error type for cardiorisk.
#[derive(Debug, Error)]
pub enum CardioError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl CardioError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if a rule action failed during a run.
    #[must_use]
    pub const fn is_rule_execution(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::RuleExecution { .. }))
    }
}

/// Result type alias for cardiorisk operations.
pub type CardioResult<T> = Result<T, CardioError>;
