//! # cardiorisk - Heart Disease Risk Assessment
//!
//! cardiorisk screens a patient document for heart-disease risk with three
//! cooperating components: a forward-chaining rule engine over a typed fact
//! store, a Mamdani fuzzy calculator over clinical measurements, and a
//! decision-tree classifier loaded from a JSON model artifact.
//!
//! ## Core Concepts
//!
//! - **Fact**: An immutable set of `attribute -> value` slots in working memory
//! - **Rule**: A named condition over facts plus ordered effects
//! - **Agenda**: Matching activations, ordered by rule declaration then fact ids
//! - **Refraction**: A rule fires at most once per binding until reset
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cardiorisk::{heart_disease_rules, Attribute, InferenceEngine, RuleThresholds};
//!
//! let rules = heart_disease_rules(&RuleThresholds::default())?;
//! let mut engine = InferenceEngine::new(rules);
//! engine.declare_value(Attribute::Cholesterol, 250)?;
//! engine.declare_value(Attribute::BloodPressure, 150)?;
//! let report = engine.run()?;
//! assert_eq!(report.messages().len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod error;
pub mod fact;
pub mod rule;
pub mod store;
pub mod value;

// Inference
pub mod catalog;
pub mod engine;

// Collaborators
pub mod assessment;
pub mod classifier;
pub mod fuzzy;
pub mod validation;

// Re-export primary types at crate root for convenience
pub use error::{CardioError, CardioResult, ExecutionError, ValidationError};
pub use fact::{Attribute, Fact, FactId, FactSpec, PatientRecord, ValueKind, RISK_FACTORS};
pub use rule::{Condition, CustomEffect, Effect, FiringContext, Pattern, Predicate, Rule, Test};
pub use store::FactStore;
pub use value::Value;

pub use catalog::{heart_disease_rules, RuleThresholds};
pub use engine::{
    Activation, Binding, Conclusion, ConclusionSink, EngineConfig, EngineState, FiredRule,
    InferenceEngine, RunId, RunReport, StdoutSink,
};

pub use assessment::{assess, assess_with_sink, Assessment, AssessmentConfig};
pub use classifier::{Classification, DecisionTreeModel, Prediction};
pub use fuzzy::{compute_risk, defuzzify, FuzzyOutcome, FuzzyRiskSystem, RiskLevel};
pub use validation::{validate_clinical, ClinicalInputs};
