//! Rule definitions.
//!
//! A rule is a named `(condition, effects)` pair. The condition is a
//! conjunction of patterns, each pattern a conjunction of tests over one
//! fact; the effects run in order when the rule fires.

use std::fmt;
use std::sync::Arc;

use crate::fact::{Attribute, Fact, FactId, FactSpec};
use crate::value::Value;

/// A predicate over a single attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// The attribute is present, whatever its value.
    Present,
    /// Exact equality. Strings compare case-sensitively.
    Equals(Value),
    /// `value >= threshold`.
    AtLeast(f64),
    /// `value > threshold`.
    GreaterThan(f64),
    /// `value <= threshold`.
    AtMost(f64),
    /// `value < threshold`.
    LessThan(f64),
    /// `min <= value <= max`.
    Between {
        /// Lower bound (inclusive).
        min: f64,
        /// Upper bound (inclusive).
        max: f64,
    },
    /// String value is one of the given names.
    OneOf(Vec<String>),
}

impl Predicate {
    /// Evaluates the predicate. Numeric predicates never hold for strings.
    #[must_use]
    pub fn holds(&self, value: &Value) -> bool {
        match self {
            Self::Present => true,
            Self::Equals(expected) => match (expected.as_float(), value.as_float()) {
                (Some(a), Some(b)) => a == b,
                _ => expected == value,
            },
            Self::AtLeast(t) => value.as_float().is_some_and(|v| v >= *t),
            Self::GreaterThan(t) => value.as_float().is_some_and(|v| v > *t),
            Self::AtMost(t) => value.as_float().is_some_and(|v| v <= *t),
            Self::LessThan(t) => value.as_float().is_some_and(|v| v < *t),
            Self::Between { min, max } => value.as_float().is_some_and(|v| *min <= v && v <= *max),
            Self::OneOf(options) => value
                .as_string()
                .is_some_and(|s| options.iter().any(|o| o == s)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Equals(v) => write!(f, "== {v}"),
            Self::AtLeast(t) => write!(f, ">= {t}"),
            Self::GreaterThan(t) => write!(f, "> {t}"),
            Self::AtMost(t) => write!(f, "<= {t}"),
            Self::LessThan(t) => write!(f, "< {t}"),
            Self::Between { min, max } => write!(f, "in [{min}, {max}]"),
            Self::OneOf(options) => write!(f, "in {options:?}"),
        }
    }
}

/// One attribute test.
#[derive(Debug, Clone, PartialEq)]
pub struct Test {
    /// Attribute under test.
    pub attribute: Attribute,
    /// Predicate applied to its value.
    pub predicate: Predicate,
}

impl Test {
    /// Returns true if `fact` carries the attribute and the predicate holds.
    #[must_use]
    pub fn holds(&self, fact: &Fact) -> bool {
        fact.get(self.attribute)
            .is_some_and(|v| self.predicate.holds(v))
    }
}

/// Tests that must all hold on one and the same fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    tests: Vec<Test>,
}

impl Pattern {
    /// A pattern with a single test.
    #[must_use]
    pub fn new(attribute: Attribute, predicate: Predicate) -> Self {
        Self {
            tests: vec![Test {
                attribute,
                predicate,
            }],
        }
    }

    /// Adds another test on the same fact.
    #[must_use]
    pub fn and(mut self, attribute: Attribute, predicate: Predicate) -> Self {
        self.tests.push(Test {
            attribute,
            predicate,
        });
        self
    }

    /// The attribute whose index drives candidate lookup.
    #[must_use]
    pub fn primary_attribute(&self) -> Attribute {
        self.tests[0].attribute
    }

    /// All tests of this pattern.
    #[must_use]
    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    /// Returns true if every test holds on `fact`.
    #[must_use]
    pub fn matches(&self, fact: &Fact) -> bool {
        self.tests.iter().all(|t| t.holds(fact))
    }
}

/// Conjunction of patterns, each bound to its own fact.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Condition {
    patterns: Vec<Pattern>,
}

impl Condition {
    /// A condition over a single fact.
    #[must_use]
    pub fn when(attribute: Attribute, predicate: Predicate) -> Self {
        Self {
            patterns: vec![Pattern::new(attribute, predicate)],
        }
    }

    /// A condition from explicit patterns.
    #[must_use]
    pub fn all(patterns: Vec<Pattern>) -> Self {
        Self { patterns }
    }

    /// Adds a pattern bound to a further fact.
    #[must_use]
    pub fn and(mut self, attribute: Attribute, predicate: Predicate) -> Self {
        self.patterns.push(Pattern::new(attribute, predicate));
        self
    }

    /// The patterns, in binding order.
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pattern) in self.patterns.iter().enumerate() {
            if i > 0 {
                write!(f, " AND ")?;
            }
            for (j, test) in pattern.tests.iter().enumerate() {
                if j > 0 {
                    write!(f, " & ")?;
                }
                write!(f, "{} {}", test.attribute, test.predicate)?;
            }
        }
        Ok(())
    }
}

/// What a firing rule may do, exposed to custom effects.
pub trait FiringContext {
    /// The facts bound to the rule's patterns, in pattern order.
    fn binding(&self) -> &[FactId];

    /// Looks up a fact in working memory.
    fn fact(&self, id: FactId) -> Option<&Fact>;

    /// Emits a human-readable conclusion.
    fn conclude(&mut self, message: String);

    /// Asserts a derived fact, ignoring it if an identical fact exists.
    fn assert_fact(&mut self, spec: FactSpec) -> FactId;

    /// Stops the run once this rule's effects are done.
    fn halt(&mut self);
}

/// Signature of a custom effect. An `Err` aborts the run.
pub type CustomEffect = Arc<dyn Fn(&mut dyn FiringContext) -> Result<(), String> + Send + Sync>;

/// A single effect of a rule.
#[derive(Clone)]
pub enum Effect {
    /// Emit a conclusion line.
    Conclude(String),
    /// Assert a derived fact (de-duplicated).
    Assert(FactSpec),
    /// Stop the run after this rule.
    Halt,
    /// Arbitrary procedure over the firing context.
    Custom(CustomEffect),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conclude(msg) => f.debug_tuple("Conclude").field(msg).finish(),
            Self::Assert(spec) => f.debug_tuple("Assert").field(spec).finish(),
            Self::Halt => write!(f, "Halt"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A named production rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Stable rule name, reported in conclusions and errors.
    pub name: String,
    /// When the rule applies.
    pub condition: Condition,
    /// What the rule does, in order.
    pub effects: Vec<Effect>,
}

impl Rule {
    /// Creates a rule with no effects.
    #[must_use]
    pub fn new(name: impl Into<String>, condition: Condition) -> Self {
        Self {
            name: name.into(),
            condition,
            effects: Vec::new(),
        }
    }

    /// Appends a conclusion effect.
    #[must_use]
    pub fn conclude(mut self, message: impl Into<String>) -> Self {
        self.effects.push(Effect::Conclude(message.into()));
        self
    }

    /// Appends an assertion effect.
    #[must_use]
    pub fn asserting(mut self, spec: FactSpec) -> Self {
        self.effects.push(Effect::Assert(spec));
        self
    }

    /// Appends a halt effect.
    #[must_use]
    pub fn halting(mut self) -> Self {
        self.effects.push(Effect::Halt);
        self
    }

    /// Appends a custom effect.
    #[must_use]
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut dyn FiringContext) -> Result<(), String> + Send + Sync + 'static,
    {
        self.effects.push(Effect::Custom(Arc::new(action)));
        self
    }
}
