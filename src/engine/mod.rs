//! The forward-chaining inference engine.
//!
//! `run` repeatedly builds the agenda, fires its first activation and
//! rebuilds, until the agenda is empty or a rule halts. Fired activations
//! are remembered until `reset`, so a rule never fires twice on the same
//! binding.
//!
//! An engine owns its working memory and is driven through `&mut self`;
//! concurrent assessments each need their own engine.

pub mod agenda;
pub mod matcher;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CardioResult, ExecutionError};
use crate::fact::{Attribute, Fact, FactId, FactSpec};
use crate::rule::{Effect, FiringContext, Rule};
use crate::store::FactStore;
use crate::value::Value;

pub use agenda::{build_agenda, Activation, Refraction};
pub use matcher::{match_condition, Binding};

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on fired activations per run. `None` means unbounded.
    pub max_cycles: Option<usize>,
}

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// Accepting facts; nothing fired yet.
    Idle,
    /// Inside `run`.
    Running,
    /// The last run ended (agenda exhausted, halt, or failure).
    Halted,
    /// Just reset; behaves as `Idle`.
    Reset,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Halted => write!(f, "halted"),
            Self::Reset => write!(f, "reset"),
        }
    }
}

/// Identifier of one `run` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A line emitted by a fired rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conclusion {
    /// Name of the rule that produced it.
    pub rule: String,
    /// Human-readable text.
    pub message: String,
    /// Facts the rule fired on.
    pub binding: Binding,
}

/// Receives conclusions as soon as they are produced.
pub trait ConclusionSink: Send {
    /// Called once per conclusion, in firing order.
    fn emit(&mut self, conclusion: &Conclusion);
}

/// Writes each conclusion message as a line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ConclusionSink for StdoutSink {
    fn emit(&mut self, conclusion: &Conclusion) {
        println!("{}", conclusion.message);
    }
}

/// An activation that fired during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredRule {
    /// Rule name.
    pub rule: String,
    /// Facts it fired on.
    pub binding: Binding,
}

/// Outcome of a successful `run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Activations fired, in order.
    pub fired: Vec<FiredRule>,
    /// Conclusions emitted by this run, in order.
    pub conclusions: Vec<Conclusion>,
    /// Rule whose halt effect ended the run, if any.
    pub halted_by: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Conclusion messages only.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.conclusions.iter().map(|c| c.message.as_str()).collect()
    }

    /// Number of fire cycles the run completed.
    #[must_use]
    pub fn cycles(&self) -> usize {
        self.fired.len()
    }

    /// Names of fired rules in firing order.
    #[must_use]
    pub fn fired_rules(&self) -> Vec<&str> {
        self.fired.iter().map(|f| f.rule.as_str()).collect()
    }

    /// Stable hash of the fired sequence and conclusions.
    ///
    /// Excludes the run id and timestamps, so two runs over the same facts
    /// and rules produce the same fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for fired in &self.fired {
            hasher.update(fired.rule.as_bytes());
            for id in &fired.binding {
                hasher.update(&id.index().to_le_bytes());
            }
            hasher.update(&[0]);
        }
        for conclusion in &self.conclusions {
            hasher.update(conclusion.message.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Forward-chaining production system over a [`FactStore`].
pub struct InferenceEngine {
    rules: Vec<Rule>,
    config: EngineConfig,
    store: FactStore,
    refraction: Refraction,
    conclusions: Vec<Conclusion>,
    state: EngineState,
    sink: Option<Box<dyn ConclusionSink>>,
}

impl fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("rules", &self.rules.len())
            .field("facts", &self.store.len())
            .field("fired", &self.refraction.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl InferenceEngine {
    /// Creates an engine over `rules`, which keep their declaration order.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self::with_config(rules, EngineConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    #[must_use]
    pub fn with_config(rules: Vec<Rule>, config: EngineConfig) -> Self {
        Self {
            rules,
            config,
            store: FactStore::new(),
            refraction: Refraction::default(),
            conclusions: Vec::new(),
            state: EngineState::Idle,
            sink: None,
        }
    }

    /// Streams conclusions to `sink` as they are produced.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn ConclusionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// The rules, in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Working memory.
    #[must_use]
    pub fn store(&self) -> &FactStore {
        &self.store
    }

    /// All facts in insertion order.
    pub fn facts(&self) -> std::slice::Iter<'_, Fact> {
        self.store.facts()
    }

    /// Every conclusion emitted since the last reset, including those of a
    /// run that failed part way.
    #[must_use]
    pub fn conclusions(&self) -> &[Conclusion] {
        &self.conclusions
    }

    /// The agenda as it would be built now.
    #[must_use]
    pub fn agenda(&self) -> Vec<Activation> {
        build_agenda(&self.store, &self.rules, &self.refraction)
    }

    fn touch(&mut self) {
        if self.state != EngineState::Running {
            self.state = EngineState::Idle;
        }
    }

    /// Declares a validated fact.
    pub fn declare(&mut self, spec: FactSpec) -> FactId {
        self.touch();
        self.store.declare(spec)
    }

    /// Declares a single `attribute: value` fact.
    pub fn declare_value(
        &mut self,
        attribute: Attribute,
        value: impl Into<Value>,
    ) -> CardioResult<FactId> {
        let spec = FactSpec::single(attribute, value)?;
        Ok(self.declare(spec))
    }

    /// Declares a fact given as a JSON mapping.
    pub fn declare_json(&mut self, json: &serde_json::Value) -> CardioResult<FactId> {
        let id = self.store.declare_json(json)?;
        self.touch();
        Ok(id)
    }

    /// Declares one fact per entry of a patient document.
    pub fn declare_record(
        &mut self,
        record: &serde_json::Map<String, serde_json::Value>,
    ) -> CardioResult<Vec<FactId>> {
        let ids = self.store.declare_record(record)?;
        self.touch();
        Ok(ids)
    }

    /// Clears facts, fired history and conclusions.
    pub fn reset(&mut self) {
        self.store.reset();
        self.refraction.clear();
        self.conclusions.clear();
        self.state = EngineState::Reset;
        debug!("engine reset");
    }

    /// Runs the fire/evaluate loop until the agenda is empty or a rule halts.
    ///
    /// # Errors
    /// - `RuleExecution` if a custom effect fails. Facts and conclusions
    ///   produced before the failure are kept.
    /// - `CycleLimitExceeded` if `max_cycles` is configured and reached.
    pub fn run(&mut self) -> CardioResult<RunReport> {
        let run_id = RunId::new();
        let started_at = Utc::now();
        let first_conclusion = self.conclusions.len();
        let mut fired = Vec::new();
        let mut halted_by = None;

        self.state = EngineState::Running;
        info!(%run_id, facts = self.store.len(), rules = self.rules.len(), "inference run started");

        loop {
            let agenda = build_agenda(&self.store, &self.rules, &self.refraction);
            debug!(%run_id, agenda = agenda.len(), "agenda built");
            let Some(activation) = agenda.into_iter().next() else {
                break;
            };

            if let Some(limit) = self.config.max_cycles {
                if fired.len() >= limit {
                    self.state = EngineState::Halted;
                    warn!(%run_id, limit, "cycle limit reached");
                    return Err(ExecutionError::CycleLimitExceeded { limit }.into());
                }
            }

            self.refraction.record(activation.clone());
            let rule = &self.rules[activation.rule];
            debug!(%run_id, rule = %rule.name, binding = ?activation.binding, "firing");

            let mut firing = Firing {
                store: &mut self.store,
                rule: &rule.name,
                binding: &activation.binding,
                conclusions: &mut self.conclusions,
                sink: self.sink.as_mut(),
                halt: false,
            };
            if let Err(reason) = apply_effects(&rule.effects, &mut firing) {
                self.state = EngineState::Halted;
                warn!(%run_id, rule = %rule.name, binding = ?activation.binding, %reason, "rule failed");
                return Err(ExecutionError::RuleExecution {
                    rule: rule.name.clone(),
                    binding: activation.binding,
                    reason,
                }
                .into());
            }
            let halt = firing.halt;

            fired.push(FiredRule {
                rule: rule.name.clone(),
                binding: activation.binding,
            });
            if halt {
                halted_by = Some(rule.name.clone());
                break;
            }
        }

        self.state = EngineState::Halted;
        let report = RunReport {
            run_id,
            fired,
            conclusions: self.conclusions[first_conclusion..].to_vec(),
            halted_by,
            started_at,
            finished_at: Utc::now(),
        };
        info!(
            %run_id,
            fired = report.fired.len(),
            conclusions = report.conclusions.len(),
            halted_by = report.halted_by.as_deref().unwrap_or("-"),
            "inference run finished"
        );
        Ok(report)
    }
}

fn apply_effects(effects: &[Effect], firing: &mut Firing<'_>) -> Result<(), String> {
    for effect in effects {
        match effect {
            Effect::Conclude(message) => firing.conclude(message.clone()),
            Effect::Assert(spec) => {
                firing.assert_fact(spec.clone());
            }
            Effect::Halt => firing.halt(),
            Effect::Custom(action) => action(&mut *firing)?,
        }
    }
    Ok(())
}

struct Firing<'a> {
    store: &'a mut FactStore,
    rule: &'a str,
    binding: &'a [FactId],
    conclusions: &'a mut Vec<Conclusion>,
    sink: Option<&'a mut Box<dyn ConclusionSink>>,
    halt: bool,
}

impl FiringContext for Firing<'_> {
    fn binding(&self) -> &[FactId] {
        self.binding
    }

    fn fact(&self, id: FactId) -> Option<&Fact> {
        self.store.get(id)
    }

    fn conclude(&mut self, message: String) {
        let conclusion = Conclusion {
            rule: self.rule.to_string(),
            message,
            binding: self.binding.to_vec(),
        };
        if let Some(sink) = self.sink.as_mut() {
            sink.emit(&conclusion);
        }
        self.conclusions.push(conclusion);
    }

    fn assert_fact(&mut self, spec: FactSpec) -> FactId {
        let (id, added) = self.store.assert_unique(spec);
        if added {
            debug!(rule = self.rule, fact = %id, "derived fact asserted");
        }
        id
    }

    fn halt(&mut self) {
        self.halt = true;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::rule::{Condition, Predicate};

    fn chol_rule() -> Rule {
        Rule::new("chol", Condition::when(Attribute::Cholesterol, Predicate::AtLeast(240.0)))
            .conclude("high cholesterol")
    }

    #[derive(Clone, Default)]
    struct Collect(Arc<Mutex<Vec<String>>>);

    impl ConclusionSink for Collect {
        fn emit(&mut self, conclusion: &Conclusion) {
            self.0.lock().unwrap().push(conclusion.message.clone());
        }
    }

    #[test]
    fn state_machine_transitions() {
        let mut engine = InferenceEngine::new(vec![chol_rule()]);
        assert_eq!(engine.state(), EngineState::Idle);
        engine.declare_value(Attribute::Cholesterol, 250).unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        engine.run().unwrap();
        assert_eq!(engine.state(), EngineState::Halted);
        engine.reset();
        assert_eq!(engine.state(), EngineState::Reset);
        engine.declare_value(Attribute::Cholesterol, 250).unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn sink_receives_conclusions_in_order() {
        let collect = Collect::default();
        let rules = vec![
            chol_rule(),
            Rule::new("bp", Condition::when(Attribute::BloodPressure, Predicate::AtLeast(140.0)))
                .conclude("hypertension"),
        ];
        let mut engine = InferenceEngine::new(rules).with_sink(Box::new(collect.clone()));
        engine.declare_value(Attribute::BloodPressure, 150).unwrap();
        engine.declare_value(Attribute::Cholesterol, 250).unwrap();
        engine.run().unwrap();
        assert_eq!(*collect.0.lock().unwrap(), vec!["high cholesterol", "hypertension"]);
    }

    #[test]
    fn second_run_fires_only_new_bindings() {
        let mut engine = InferenceEngine::new(vec![chol_rule()]);
        engine.declare_value(Attribute::Cholesterol, 250).unwrap();
        assert_eq!(engine.run().unwrap().fired.len(), 1);
        assert!(engine.run().unwrap().fired.is_empty());

        engine.declare_value(Attribute::Cholesterol, 260).unwrap();
        let report = engine.run().unwrap();
        assert_eq!(report.fired.len(), 1);
        assert_eq!(report.fired[0].binding, vec![FactId::new(1)]);
        assert_eq!(engine.conclusions().len(), 2);
    }

    #[test]
    fn cycle_limit_aborts_run() {
        let counter = Rule::new("count", Condition::when(Attribute::Age, Predicate::Present))
            .with_action(|ctx| {
                let id = ctx.binding()[0];
                let age = ctx
                    .fact(id)
                    .and_then(|f| f.get(Attribute::Age))
                    .and_then(Value::as_int)
                    .ok_or_else(|| "age missing".to_string())?;
                let spec = FactSpec::single(Attribute::Age, age + 1).map_err(|e| e.to_string())?;
                ctx.assert_fact(spec);
                Ok(())
            });
        let mut engine =
            InferenceEngine::with_config(vec![counter], EngineConfig { max_cycles: Some(5) });
        engine.declare_value(Attribute::Age, 1).unwrap();
        let err = engine.run().unwrap_err();
        assert!(matches!(
            err,
            crate::CardioError::Execution(ExecutionError::CycleLimitExceeded { limit: 5 })
        ));
        assert_eq!(engine.state(), EngineState::Halted);
        assert_eq!(engine.store().len(), 6);
    }

    #[test]
    fn engine_config_deserializes_with_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
        let cfg: EngineConfig = serde_json::from_str(r#"{"max_cycles": 100}"#).unwrap();
        assert_eq!(cfg.max_cycles, Some(100));
    }
}
