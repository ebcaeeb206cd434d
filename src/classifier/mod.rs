//! Decision-tree classifier over patient documents.
//!
//! The model is a binary classification tree exported to JSON: the ordered
//! list of feature columns it was trained on and a flat node array rooted at
//! index 0. A sample goes left when `x[feature] <= threshold`.
//!
//! Patient documents are encoded the way the training pipeline one-hot
//! encoded them: numbers keep their column name, strings become a
//! `name_value` indicator column, and any trained column the document does
//! not produce is zero.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CardioResult, ValidationError};
use crate::fact::PatientRecord;

/// A tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Internal split.
    Split {
        /// Index into the model's feature list.
        feature: usize,
        /// Samples with `x <= threshold` go left.
        threshold: f64,
        /// Left child index.
        left: usize,
        /// Right child index.
        right: usize,
    },
    /// Terminal node with per-class training sample counts.
    Leaf {
        /// `[negative, positive]` counts (or weights).
        counts: [f64; 2],
    },
}

/// A trained decision tree.
///
/// Deserializing validates the tree, so every model in hand is safe to walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDecisionTree")]
pub struct DecisionTreeModel {
    features: Vec<String>,
    nodes: Vec<Node>,
}

#[derive(Deserialize)]
struct RawDecisionTree {
    features: Vec<String>,
    nodes: Vec<Node>,
}

impl TryFrom<RawDecisionTree> for DecisionTreeModel {
    type Error = ValidationError;

    fn try_from(raw: RawDecisionTree) -> Result<Self, Self::Error> {
        Self::new(raw.features, raw.nodes)
    }
}

/// Raw model output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 if heart disease is predicted, else 0.
    pub label: u8,
    /// Probability of the positive class, in `[0, 1]`.
    pub probability: f64,
}

/// Model prediction blended with the additive lifestyle score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Raw model output.
    pub prediction: Prediction,
    /// See [`user_risk_score`].
    pub user_risk_score: f64,
    /// See [`combined_confidence`].
    pub combined_confidence: f64,
}

fn invalid(reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidModel {
        reason: reason.into(),
    }
}

impl DecisionTreeModel {
    /// Builds and validates a model.
    pub fn new(features: Vec<String>, nodes: Vec<Node>) -> Result<Self, ValidationError> {
        let model = Self { features, nodes };
        model.validate()?;
        Ok(model)
    }

    /// Parses a model from its JSON export.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json).map_err(|e| invalid(e.to_string()))
    }

    /// Loads a model artifact from disk.
    pub fn from_path(path: impl AsRef<Path>) -> CardioResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let model = Self::from_json_str(&json)?;
        debug!(
            path = %path.display(),
            features = model.features.len(),
            nodes = model.nodes.len(),
            "decision tree loaded"
        );
        Ok(model)
    }

    /// Feature columns in training order.
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Checks that the tree is well formed.
    ///
    /// Children must point strictly forward, which rules out cycles and
    /// guarantees every traversal ends at a leaf.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.features.is_empty() {
            return Err(invalid("model has no feature columns"));
        }
        if self.nodes.is_empty() {
            return Err(invalid("model has no nodes"));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= self.features.len() {
                        return Err(invalid(format!(
                            "node {index} splits on feature {feature}, model has {}",
                            self.features.len()
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {index} has a non-finite threshold")));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= self.nodes.len() {
                            return Err(invalid(format!(
                                "node {index} has invalid child {child}"
                            )));
                        }
                    }
                }
                Node::Leaf { counts } => {
                    if counts.iter().any(|c| !c.is_finite() || *c < 0.0)
                        || counts[0] + counts[1] <= 0.0
                    {
                        return Err(invalid(format!("leaf {index} has invalid counts")));
                    }
                }
            }
        }
        Ok(())
    }

    /// Encodes `record` into this model's feature columns.
    #[must_use]
    pub fn encode(&self, record: &PatientRecord) -> Vec<f64> {
        encode_features(record, &self.features)
    }

    /// Classifies one patient.
    #[must_use]
    pub fn predict(&self, record: &PatientRecord) -> Prediction {
        let x = self.encode(record);
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { counts } => {
                    let probability = counts[1] / (counts[0] + counts[1]);
                    let label = u8::from(counts[1] > counts[0]);
                    debug!(leaf = index, label, probability, "decision tree prediction");
                    return Prediction { label, probability };
                }
            }
        }
    }

    /// Predicts and blends with the lifestyle score.
    #[must_use]
    pub fn classify(&self, record: &PatientRecord) -> Classification {
        let prediction = self.predict(record);
        let score = user_risk_score(record);
        Classification {
            prediction,
            user_risk_score: score,
            combined_confidence: combined_confidence(prediction.probability, score),
        }
    }
}

/// One-hot encodes `record` and projects it onto `columns`.
///
/// Numbers and booleans keep their name; a string `v` under `name` sets the
/// column `name_v` to 1. Columns the record does not produce are zero and
/// produced columns the model does not know are dropped.
#[must_use]
pub fn encode_features(record: &PatientRecord, columns: &[String]) -> Vec<f64> {
    let mut encoded: HashMap<String, f64> = HashMap::with_capacity(record.len());
    for (name, value) in record {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(x) = n.as_f64() {
                    encoded.insert(name.clone(), x);
                }
            }
            serde_json::Value::Bool(b) => {
                encoded.insert(name.clone(), f64::from(u8::from(*b)));
            }
            serde_json::Value::String(s) => {
                encoded.insert(format!("{name}_{s}"), 1.0);
            }
            _ => {}
        }
    }
    columns
        .iter()
        .map(|column| encoded.get(column).copied().unwrap_or(0.0))
        .collect()
}

fn number(record: &PatientRecord, field: &str) -> Option<f64> {
    record.get(field).and_then(serde_json::Value::as_f64)
}

/// Additive lifestyle risk score, capped at 100.
///
/// | condition | points |
/// |---|---|
/// | cholesterol >= 250 | 30 |
/// | blood_pressure >= 140 | 25 |
/// | bmi >= 30 | 20 |
/// | glucose >= 126 | 15 |
/// | sleep_hours < 6 | 10 |
/// | stress_level high | 20 |
///
/// Absent fields contribute nothing.
#[must_use]
pub fn user_risk_score(record: &PatientRecord) -> f64 {
    const AT_LEAST: &[(&str, f64, f64)] = &[
        ("cholesterol", 250.0, 30.0),
        ("blood_pressure", 140.0, 25.0),
        ("bmi", 30.0, 20.0),
        ("glucose", 126.0, 15.0),
    ];

    let mut score: f64 = AT_LEAST
        .iter()
        .filter(|(field, cutoff, _)| number(record, field).is_some_and(|v| v >= *cutoff))
        .map(|(_, _, points)| points)
        .sum();
    if number(record, "sleep_hours").is_some_and(|v| v < 6.0) {
        score += 10.0;
    }
    let stressed = record
        .get("stress_level")
        .and_then(serde_json::Value::as_str)
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("high"));
    if stressed {
        score += 20.0;
    }
    score.min(100.0)
}

/// `probability * 100 * 0.7 + score * 0.3`.
#[must_use]
pub fn combined_confidence(probability: f64, user_risk_score: f64) -> f64 {
    probability * 100.0 * 0.7 + user_risk_score * 0.3
}
