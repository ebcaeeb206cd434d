//! Mamdani fuzzy risk calculator.
//!
//! Eight clinical inputs are fuzzified, six rules combine them with `min`,
//! rule outputs are aggregated with `max` over the risk universe `[0, 10]`
//! and the crisp score is the centroid of the aggregate.

pub mod membership;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CardioResult, ExecutionError};
use crate::validation::{validate_clinical, ClinicalInputs};

pub use membership::{auto_partition, Membership, Variable};

/// Categorical risk output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Crisp score at most 3.5.
    Low,
    /// Crisp score in `(3.5, 6.5]`.
    Medium,
    /// Crisp score above 6.5.
    High,
}

impl RiskLevel {
    /// Term name on the risk variable.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a crisp score to a risk category.
#[must_use]
pub fn defuzzify(score: f64) -> RiskLevel {
    if score <= 3.5 {
        RiskLevel::Low
    } else if score <= 6.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// One rule: a conjunction of `(variable, term)` tests implying a risk level.
#[derive(Debug, Clone)]
pub struct FuzzyRule {
    antecedents: Vec<(&'static str, &'static str)>,
    consequent: RiskLevel,
}

impl FuzzyRule {
    /// Creates a rule.
    #[must_use]
    pub fn new(antecedents: Vec<(&'static str, &'static str)>, consequent: RiskLevel) -> Self {
        Self {
            antecedents,
            consequent,
        }
    }

    /// The risk level this rule implies.
    #[must_use]
    pub const fn consequent(&self) -> RiskLevel {
        self.consequent
    }
}

const RISK_MIN: f64 = 0.0;
const RISK_MAX: f64 = 10.0;
const CENTROID_SAMPLES: usize = 1001;

/// Result of one evaluation: crisp score plus the per-level activation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyOutcome {
    /// Centroid of the aggregated output.
    pub score: f64,
    /// Category of `score`.
    pub level: RiskLevel,
    /// Strongest activation of a `Low` rule.
    pub low: f64,
    /// Strongest activation of a `Medium` rule.
    pub medium: f64,
    /// Strongest activation of a `High` rule.
    pub high: f64,
}

/// The fuzzy system: input variables, the risk variable and the rule base.
#[derive(Debug, Clone)]
pub struct FuzzyRiskSystem {
    inputs: Vec<Variable>,
    risk: Variable,
    rules: Vec<FuzzyRule>,
}

impl Default for FuzzyRiskSystem {
    fn default() -> Self {
        Self::heart_disease()
    }
}

impl FuzzyRiskSystem {
    /// The heart-disease variables and rule base.
    #[must_use]
    pub fn heart_disease() -> Self {
        let tri = |a, b, c| Membership::Triangle { a, b, c };
        let gauss = |mean, sigma| Membership::Gaussian { mean, sigma };

        let inputs = vec![
            Variable::auto("age", 0.0, 100.0, &["Young", "Middle", "Old"]),
            Variable::new(
                "sex",
                0.0,
                1.0,
                vec![("Female", tri(0.0, 0.0, 1.0)), ("Male", tri(0.0, 1.0, 1.0))],
            ),
            Variable::auto(
                "cp",
                0.0,
                3.0,
                &["Typical", "Atypical", "Non-anginal", "Asymptomatic"],
            ),
            Variable::auto("trestbps", 90.0, 200.0, &["Low", "Normal", "High"]),
            Variable::new(
                "chol",
                100.0,
                600.0,
                vec![
                    ("Low", gauss(150.0, 30.0)),
                    ("Medium", gauss(250.0, 30.0)),
                    ("High", gauss(350.0, 30.0)),
                ],
            ),
            Variable::auto("thalach", 60.0, 201.0, &["Low", "Medium", "High"]),
            Variable::new(
                "oldpeak",
                0.0,
                6.9,
                vec![
                    ("Low", tri(0.0, 0.0, 2.0)),
                    ("Medium", tri(1.0, 2.0, 3.0)),
                    ("High", tri(2.0, 4.0, 6.0)),
                ],
            ),
            Variable::new(
                "slope",
                0.0,
                2.0,
                vec![
                    ("Up", tri(0.0, 0.0, 1.0)),
                    ("Flat", tri(0.0, 1.0, 2.0)),
                    ("Down", tri(1.0, 2.0, 2.0)),
                ],
            ),
        ];

        let rules = vec![
            FuzzyRule::new(vec![("chol", "High"), ("trestbps", "High")], RiskLevel::High),
            FuzzyRule::new(vec![("cp", "Asymptomatic"), ("thalach", "Low")], RiskLevel::High),
            FuzzyRule::new(vec![("age", "Young"), ("thalach", "High")], RiskLevel::Low),
            FuzzyRule::new(vec![("oldpeak", "High"), ("slope", "Down")], RiskLevel::High),
            FuzzyRule::new(vec![("sex", "Male"), ("age", "Old")], RiskLevel::Medium),
            FuzzyRule::new(vec![("chol", "Low"), ("trestbps", "Low")], RiskLevel::Low),
        ];

        Self {
            inputs,
            risk: Variable::auto("risk", RISK_MIN, RISK_MAX, &["Low", "Medium", "High"]),
            rules,
        }
    }

    /// The rule base in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[FuzzyRule] {
        &self.rules
    }

    fn input_value(inputs: &ClinicalInputs, name: &str) -> f64 {
        match name {
            "age" => inputs.age,
            "sex" => inputs.sex,
            "cp" => inputs.cp,
            "trestbps" => inputs.trestbps,
            "chol" => inputs.chol,
            "thalach" => inputs.thalach,
            "oldpeak" => inputs.oldpeak,
            "slope" => inputs.slope,
            _ => f64::NAN,
        }
    }

    fn firing_strength(&self, rule: &FuzzyRule, inputs: &ClinicalInputs) -> f64 {
        rule.antecedents
            .iter()
            .map(|(var, term)| {
                self.inputs
                    .iter()
                    .find(|v| v.name == *var)
                    .map(|v| v.degree(term, Self::input_value(inputs, var)))
                    .filter(|d| d.is_finite())
                    .unwrap_or(0.0)
            })
            .fold(1.0, f64::min)
    }

    /// Evaluates the rule base and defuzzifies by centroid.
    ///
    /// Inputs are not range-checked here; see [`compute_risk`].
    pub fn evaluate(&self, inputs: &ClinicalInputs) -> CardioResult<FuzzyOutcome> {
        let (mut low, mut medium, mut high) = (0.0f64, 0.0f64, 0.0f64);
        for rule in &self.rules {
            let strength = self.firing_strength(rule, inputs);
            let slot = match rule.consequent {
                RiskLevel::Low => &mut low,
                RiskLevel::Medium => &mut medium,
                RiskLevel::High => &mut high,
            };
            *slot = slot.max(strength);
        }

        let aggregate = |x: f64| {
            [
                (RiskLevel::Low, low),
                (RiskLevel::Medium, medium),
                (RiskLevel::High, high),
            ]
            .iter()
            .map(|(level, cut)| cut.min(self.risk.degree(level.as_str(), x)))
            .fold(0.0, f64::max)
        };

        #[allow(clippy::cast_precision_loss)]
        let step = (RISK_MAX - RISK_MIN) / (CENTROID_SAMPLES - 1) as f64;
        let (mut area, mut moment) = (0.0f64, 0.0f64);
        let mut x0 = RISK_MIN;
        let mut y0 = aggregate(x0);
        for i in 1..CENTROID_SAMPLES {
            #[allow(clippy::cast_precision_loss)]
            let x1 = RISK_MIN + step * i as f64;
            let y1 = aggregate(x1);
            // Exact area and first moment of the linear segment.
            area += (y0 + y1) * (x1 - x0) / 2.0;
            moment += (x1 - x0) * (y0 * (2.0 * x0 + x1) + y1 * (x0 + 2.0 * x1)) / 6.0;
            x0 = x1;
            y0 = y1;
        }

        if area <= 0.0 {
            return Err(ExecutionError::NoFuzzyActivation.into());
        }
        let score = moment / area;
        let level = defuzzify(score);
        debug!(score, %level, low, medium, high, "fuzzy risk evaluated");
        Ok(FuzzyOutcome {
            score,
            level,
            low,
            medium,
            high,
        })
    }
}

/// Validates `inputs` and returns the fuzzy risk category.
pub fn compute_risk(inputs: &ClinicalInputs) -> CardioResult<RiskLevel> {
    validate_clinical(inputs)?;
    Ok(FuzzyRiskSystem::heart_disease().evaluate(inputs)?.level)
}
