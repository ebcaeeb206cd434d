//! Condition matching against working memory.
//!
//! Each pattern is resolved to its candidate facts through the attribute
//! index, then the candidates are combined as a cross product. Candidate
//! lists are in insertion order, so bindings come out lexicographically
//! ascending.

use crate::fact::FactId;
use crate::rule::{Condition, Pattern};
use crate::store::FactStore;

/// The facts bound to a rule's patterns, one per pattern.
pub type Binding = Vec<FactId>;

/// Facts in `store` satisfying every test of `pattern`, ascending.
#[must_use]
pub fn candidates(store: &FactStore, pattern: &Pattern) -> Vec<FactId> {
    store
        .ids_with(pattern.primary_attribute())
        .iter()
        .copied()
        .filter(|id| store.get(*id).is_some_and(|fact| pattern.matches(fact)))
        .collect()
}

/// All distinct bindings that satisfy `condition`.
///
/// A condition without patterns never matches.
#[must_use]
pub fn match_condition(store: &FactStore, condition: &Condition) -> Vec<Binding> {
    let patterns = condition.patterns();
    if patterns.is_empty() {
        return Vec::new();
    }

    let mut bindings: Vec<Binding> = vec![Vec::with_capacity(patterns.len())];
    for pattern in patterns {
        let ids = candidates(store, pattern);
        if ids.is_empty() {
            return Vec::new();
        }
        let mut next = Vec::with_capacity(bindings.len() * ids.len());
        for partial in &bindings {
            for id in &ids {
                let mut binding = partial.clone();
                binding.push(*id);
                next.push(binding);
            }
        }
        bindings = next;
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{Attribute, FactSpec};
    use crate::rule::Predicate;
    use crate::value::Value;

    fn declare(store: &mut FactStore, attribute: Attribute, value: impl Into<Value>) -> FactId {
        store.declare(FactSpec::single(attribute, value).unwrap())
    }

    #[test]
    fn single_pattern_binds_each_matching_fact() {
        let mut store = FactStore::new();
        let a = declare(&mut store, Attribute::Cholesterol, 250);
        declare(&mut store, Attribute::Cholesterol, 200);
        let c = declare(&mut store, Attribute::Cholesterol, 300);

        let cond = Condition::when(Attribute::Cholesterol, Predicate::AtLeast(240.0));
        assert_eq!(match_condition(&store, &cond), vec![vec![a], vec![c]]);
    }

    #[test]
    fn conjunction_takes_cross_product() {
        let mut store = FactStore::new();
        let pain = declare(&mut store, Attribute::ChestPain, "Yes");
        declare(&mut store, Attribute::Age, 45);
        let old1 = declare(&mut store, Attribute::Age, 61);
        let old2 = declare(&mut store, Attribute::Age, 70);

        let cond = Condition::when(Attribute::ChestPain, Predicate::Equals(Value::from("Yes")))
            .and(Attribute::Age, Predicate::GreaterThan(50.0));
        assert_eq!(
            match_condition(&store, &cond),
            vec![vec![pain, old1], vec![pain, old2]]
        );
    }

    #[test]
    fn conjunction_fails_when_any_pattern_is_unmatched() {
        let mut store = FactStore::new();
        declare(&mut store, Attribute::ChestPain, "Yes");
        declare(&mut store, Attribute::Age, 30);

        let cond = Condition::when(Attribute::ChestPain, Predicate::Equals(Value::from("Yes")))
            .and(Attribute::Age, Predicate::GreaterThan(50.0));
        assert!(match_condition(&store, &cond).is_empty());
    }

    #[test]
    fn empty_condition_never_matches() {
        let mut store = FactStore::new();
        declare(&mut store, Attribute::Age, 30);
        assert!(match_condition(&store, &Condition::default()).is_empty());
    }

    #[test]
    fn missing_attribute_is_no_match() {
        let store = FactStore::new();
        let cond = Condition::when(Attribute::Bmi, Predicate::AtLeast(30.0));
        assert!(match_condition(&store, &cond).is_empty());
    }
}
