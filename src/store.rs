//! Working memory.
//!
//! An append-only, attribute-indexed fact store. Ids are insertion indices,
//! so iterating `facts` or an index bucket always yields ascending ids.

use std::collections::HashMap;

use crate::error::ValidationError;
use crate::fact::{Attribute, Fact, FactId, FactSpec};

/// Append-only collection of facts with an attribute index.
#[derive(Debug, Default)]
pub struct FactStore {
    facts: Vec<Fact>,
    by_attribute: HashMap<Attribute, Vec<FactId>>,
}

impl FactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> FactId {
        FactId::new(self.facts.len() as u64)
    }

    /// Adds a fact and returns its identity. Duplicates are kept.
    pub fn declare(&mut self, spec: FactSpec) -> FactId {
        let id = self.next_id();
        for attribute in spec.slots().keys() {
            self.by_attribute.entry(*attribute).or_default().push(id);
        }
        self.facts.push(Fact::new(id, spec));
        id
    }

    /// Adds a fact given as a JSON object. Nothing is stored on error.
    pub fn declare_json(&mut self, json: &serde_json::Value) -> Result<FactId, ValidationError> {
        let spec = FactSpec::from_json(json)?;
        Ok(self.declare(spec))
    }

    /// Declares one single-slot fact per entry of a patient document, in
    /// document order.
    ///
    /// Every entry is validated before any fact is added, so a bad record
    /// leaves the store untouched.
    pub fn declare_record(
        &mut self,
        record: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Vec<FactId>, ValidationError> {
        let mut specs = Vec::with_capacity(record.len());
        for (name, raw) in record {
            let mut single = serde_json::Map::with_capacity(1);
            single.insert(name.clone(), raw.clone());
            specs.push(FactSpec::from_json(&serde_json::Value::Object(single))?);
        }
        Ok(specs.into_iter().map(|spec| self.declare(spec)).collect())
    }

    /// Adds a fact unless an identical one is already present.
    ///
    /// Returns the id of the stored fact and whether it was newly added.
    pub fn assert_unique(&mut self, spec: FactSpec) -> (FactId, bool) {
        let probe = spec.slots().keys().next().copied();
        let existing = probe.and_then(|attribute| {
            self.ids_with(attribute)
                .iter()
                .copied()
                .find(|id| self.get(*id).is_some_and(|f| f.same_slots(&spec)))
        });
        match existing {
            Some(id) => (id, false),
            None => (self.declare(spec), true),
        }
    }

    /// Looks up a fact by id.
    #[must_use]
    pub fn get(&self, id: FactId) -> Option<&Fact> {
        usize::try_from(id.index())
            .ok()
            .and_then(|idx| self.facts.get(idx))
    }

    /// Ids of facts carrying `attribute`, in insertion order.
    #[must_use]
    pub fn ids_with(&self, attribute: Attribute) -> &[FactId] {
        self.by_attribute.get(&attribute).map_or(&[], Vec::as_slice)
    }

    /// Lazy, restartable view over all facts in insertion order.
    pub fn facts(&self) -> std::slice::Iter<'_, Fact> {
        self.facts.iter()
    }

    /// Number of stored facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if no fact has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Drops every fact and restarts ids at zero.
    pub fn reset(&mut self) {
        self.facts.clear();
        self.by_attribute.clear();
    }
}
