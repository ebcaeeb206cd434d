//! Agenda construction and conflict resolution.
//!
//! Ordering is explicit and total: rule declaration order first, then the
//! binding's fact ids ascending. Activations that already fired are
//! filtered out (refraction), which is what guarantees termination.

use std::collections::HashSet;

use crate::rule::Rule;
use crate::store::FactStore;

use super::matcher::{match_condition, Binding};

/// A satisfied rule paired with the facts that satisfy it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Activation {
    /// Index of the rule in declaration order.
    pub rule: usize,
    /// Facts bound to the rule's patterns.
    pub binding: Binding,
}

/// Record of activations that fired since the last reset.
#[derive(Debug, Default)]
pub struct Refraction {
    fired: HashSet<Activation>,
}

impl Refraction {
    /// Returns true if `activation` has fired already.
    #[must_use]
    pub fn has_fired(&self, activation: &Activation) -> bool {
        self.fired.contains(activation)
    }

    /// Marks `activation` as fired. Returns false if it was already recorded.
    pub fn record(&mut self, activation: Activation) -> bool {
        self.fired.insert(activation)
    }

    /// Number of recorded activations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fired.len()
    }

    /// Returns true if nothing fired yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty()
    }

    /// Forgets every fired activation.
    pub fn clear(&mut self) {
        self.fired.clear();
    }
}

/// Builds the ordered agenda of activations not yet fired.
#[must_use]
pub fn build_agenda(store: &FactStore, rules: &[Rule], refraction: &Refraction) -> Vec<Activation> {
    let mut agenda = Vec::new();
    for (index, rule) in rules.iter().enumerate() {
        for binding in match_condition(store, &rule.condition) {
            let activation = Activation {
                rule: index,
                binding,
            };
            if !refraction.has_fired(&activation) {
                agenda.push(activation);
            }
        }
    }
    // Matching already yields this order; sorting pins it regardless.
    agenda.sort();
    agenda
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{Attribute, FactId, FactSpec};
    use crate::rule::{Condition, Predicate};

    fn rules() -> Vec<Rule> {
        vec![
            Rule::new("chol", Condition::when(Attribute::Cholesterol, Predicate::AtLeast(240.0))),
            Rule::new("bp", Condition::when(Attribute::BloodPressure, Predicate::AtLeast(140.0))),
        ]
    }

    #[test]
    fn agenda_orders_by_rule_then_binding() {
        let mut store = FactStore::new();
        let bp = store.declare(FactSpec::single(Attribute::BloodPressure, 150).unwrap());
        let chol2 = store.declare(FactSpec::single(Attribute::Cholesterol, 260).unwrap());
        let chol1 = store.declare(FactSpec::single(Attribute::Cholesterol, 250).unwrap());

        let agenda = build_agenda(&store, &rules(), &Refraction::default());
        assert_eq!(
            agenda,
            vec![
                Activation { rule: 0, binding: vec![chol2] },
                Activation { rule: 0, binding: vec![chol1] },
                Activation { rule: 1, binding: vec![bp] },
            ]
        );
        assert!(chol2 < chol1);
    }

    #[test]
    fn refraction_excludes_fired_activations() {
        let mut store = FactStore::new();
        let chol = store.declare(FactSpec::single(Attribute::Cholesterol, 250).unwrap());
        let mut refraction = Refraction::default();
        assert!(refraction.record(Activation { rule: 0, binding: vec![chol] }));
        assert!(!refraction.record(Activation { rule: 0, binding: vec![chol] }));

        assert!(build_agenda(&store, &rules(), &refraction).is_empty());

        refraction.clear();
        assert_eq!(build_agenda(&store, &rules(), &refraction).len(), 1);
    }

    #[test]
    fn activation_ordering_is_lexicographic() {
        let a = Activation { rule: 1, binding: vec![FactId::new(0)] };
        let b = Activation { rule: 0, binding: vec![FactId::new(9)] };
        let c = Activation { rule: 0, binding: vec![FactId::new(2), FactId::new(5)] };
        let mut v = vec![a.clone(), b.clone(), c.clone()];
        v.sort();
        assert_eq!(v, vec![c, b, a]);
    }
}
