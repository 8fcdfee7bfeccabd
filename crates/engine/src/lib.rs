//! Availability engine.
//!
//! Answers one question: is a subject available at a moment? The answer is
//! folded from the subject's enabled rules, visited in priority-ascending
//! order with stable ties; every matching rule replaces the running effect,
//! so the last match wins. Callers layer broad allow/deny bands at low
//! priority and narrow overrides at high priority.
//!
//! Determinism and failure posture:
//! - Rules whose type is unregistered (or whose definition resolves to no
//!   predicate) are skipped, never raised.
//! - Predicates are total over malformed config; a broken rule cannot flip
//!   the effect.
//! - The only fallible path is the inventory gate's host-owned resolver;
//!   its failures surface as [`EvalError`] instead of being converted into
//!   "unavailable".
//!
//! Observability: every successful evaluation emits a low-cardinality
//! counter keyed by `{subject_type, outcome}` and, when installed via
//! [`set_observer`], a [`DecisionObserver`] callback.

#![deny(unsafe_code)]

mod registry;
pub mod settings;

pub use registry::{
    BuiltinCatalog, Definition, PredicateCatalog, PredicateFactory, Registry, BUILTIN_KINDS,
};
pub use settings::{ConfigError, InventorySettings, Settings};

use avail_core::effect::Effect;
use avail_core::moment::{localize, parse_zone};
use avail_core::predicate::PredicateError;
use avail_core::rule::RuleSet;
use avail_core::subject::Subject;
use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use predicates::{InventoryGateEvaluator, InventoryResolvers, ResolverCatalog, ResolverDef};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Failure surfaced from an evaluation.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A predicate failed; today this is always a host resolver failure
    /// inside the inventory gate.
    #[error(transparent)]
    Predicate(#[from] PredicateError),
}

/// Summary of one evaluation, handed to observers.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Final verdict.
    pub allowed: bool,
    /// Type of the last rule that matched, if any.
    pub matched_kind: Option<String>,
    /// Number of enabled rules visited.
    pub rules_evaluated: usize,
}

/// Observer invoked after each successful evaluation.
///
/// Implementations must be cheap and non-blocking; avoid I/O on hot paths.
/// Intended for tests and in-process metrics.
pub trait DecisionObserver: Send + Sync {
    /// Called with the subject's class and the evaluation summary.
    fn on_decision(&self, subject_type: &str, decision: &Decision);
}

static OBSERVER: OnceLock<RwLock<Option<Arc<dyn DecisionObserver>>>> = OnceLock::new();

/// Install or clear the process-global decision observer.
///
/// Example
/// ```
/// struct Nop;
/// impl engine::DecisionObserver for Nop {
///     fn on_decision(&self, _: &str, _: &engine::Decision) {}
/// }
/// engine::set_observer(Some(Box::new(Nop)));
/// engine::set_observer(None);
/// ```
pub fn set_observer(observer: Option<Box<dyn DecisionObserver>>) {
    let cell = OBSERVER.get_or_init(|| RwLock::new(None));
    let mut slot = cell.write().expect("observer lock poisoned");
    *slot = observer.map(Arc::from);
}

/// In-process decision counters keyed by `{subject_type, outcome}`.
///
/// Low-cardinality by construction; not persisted across restarts.
#[derive(Default)]
pub struct EngineMetrics {
    inner: Arc<Mutex<HashMap<String, u64>>>,
}

impl EngineMetrics {
    /// Current count for a `{subject_type, outcome}` pair, where outcome
    /// is `"allow"` or `"deny"`.
    pub fn decision_counter(&self, subject_type: &str, outcome: &str) -> u64 {
        let key = format!("{subject_type}:{outcome}");
        self.inner.lock().expect("metrics lock poisoned").get(&key).copied().unwrap_or(0)
    }

    fn inc(&self, subject_type: &str, outcome: &str) {
        let mut counters = self.inner.lock().expect("metrics lock poisoned");
        *counters.entry(format!("{subject_type}:{outcome}")).or_insert(0) += 1;
    }
}

static METRICS: OnceLock<EngineMetrics> = OnceLock::new();

/// Access the global decision metrics.
///
/// Example
/// ```
/// let metrics = engine::engine_metrics();
/// let denied = metrics.decision_counter("venue", "deny");
/// let _ = denied; // inspect or compare as needed
/// ```
pub fn engine_metrics() -> &'static EngineMetrics {
    METRICS.get_or_init(EngineMetrics::default)
}

fn notify(subject_type: &str, decision: &Decision) {
    let outcome = if decision.allowed { "allow" } else { "deny" };
    engine_metrics().inc(subject_type, outcome);
    if let Some(lock) = OBSERVER.get() {
        if let Ok(slot) = lock.read() {
            if let Some(observer) = slot.as_ref() {
                observer.on_decision(subject_type, decision);
            }
        }
    }
}

/// Deterministic point-in-time availability engine.
///
/// Example
/// ```
/// use avail_core::effect::Effect;
/// use avail_core::rule::Rule;
/// use avail_core::subject::Subject;
/// use chrono::TimeZone;
/// use serde_json::json;
///
/// struct Shop;
/// impl Subject for Shop {
///     fn subject_type(&self) -> &str { "shop" }
///     fn availability_rules(&self) -> Vec<Rule> {
///         vec![Rule::new("time_of_day", Effect::Allow)
///             .with_config(json!({"from": "09:00", "to": "17:00"}))]
///     }
///     fn default_effect(&self) -> Option<Effect> { Some(Effect::Deny) }
///     fn timezone(&self) -> Option<String> { Some("Europe/Berlin".into()) }
/// }
///
/// let engine = engine::Engine::default();
/// // 11:00 UTC is 13:00 in Berlin in June.
/// let noon = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 11, 0, 0).unwrap();
/// assert!(engine.is_available(&Shop, &noon).unwrap());
/// ```
pub struct Engine {
    registry: Registry,
    default_effect: Effect,
    default_zone: Tz,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}

impl Engine {
    /// Engine over `registry` with fail-closed defaults (`Deny`, UTC).
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self { registry, default_effect: Effect::Deny, default_zone: chrono_tz::UTC }
    }

    /// Set the effect used when a subject declares no default.
    #[must_use]
    pub fn with_default_effect(mut self, effect: Effect) -> Self {
        self.default_effect = effect;
        self
    }

    /// Set the zone used when a subject declares no timezone.
    #[must_use]
    pub fn with_default_zone(mut self, zone: Tz) -> Self {
        self.default_zone = zone;
        self
    }

    /// Wire an engine from host settings: built-in rule types, the
    /// `rule_types` extras as named definitions, and an inventory gate
    /// configured from the `inventory_gate` block.
    pub fn from_settings(
        settings: &Settings,
        catalog: Arc<dyn PredicateCatalog>,
        resolver_catalog: Option<Arc<dyn ResolverCatalog>>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let zone = settings.zone()?;

        let mut registry = Registry::new(catalog);
        for kind in BUILTIN_KINDS {
            registry.register(kind, Definition::Named(kind.to_string()));
        }
        for (kind, id) in &settings.rule_types {
            registry.register(kind.clone(), Definition::Named(id.clone()));
        }

        if !settings.inventory_gate.is_empty() {
            let mut defs = InventoryResolvers::default();
            if let Some(name) = &settings.inventory_gate.resolver {
                defs = defs.with_default(ResolverDef::Named(name.clone()));
            }
            for (class, name) in &settings.inventory_gate.resolvers {
                defs = defs.with_class(class.clone(), ResolverDef::Named(name.clone()));
            }
            let gate = match resolver_catalog {
                Some(resolvers) => InventoryGateEvaluator::with_catalog(defs, resolvers),
                None => InventoryGateEvaluator::new(defs),
            };
            registry.register("inventory_gate", Definition::Instance(Arc::new(gate)));
        }

        Ok(Self::new(registry).with_default_effect(settings.default_effect).with_default_zone(zone))
    }

    /// The registry backing this engine.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Decide whether `subject` is available at `moment`.
    ///
    /// The caller's moment is never mutated; predicates see a copy
    /// re-displayed in the subject's zone with the instant preserved.
    pub fn is_available<Z: TimeZone>(
        &self,
        subject: &dyn Subject,
        moment: &DateTime<Z>,
    ) -> Result<bool, EvalError> {
        let zone = match subject.timezone() {
            None => self.default_zone,
            Some(name) => parse_zone(&name).unwrap_or_else(|| {
                warn!(zone = %name, "unknown subject timezone, falling back to engine default");
                self.default_zone
            }),
        };
        let local = localize(moment, zone);
        let rules = RuleSet::snapshot(subject.availability_rules());

        let mut state = subject.default_effect().unwrap_or(self.default_effect).allows();
        let mut matched_kind = None;
        for rule in rules.iter() {
            let Some(predicate) = self.registry.get(&rule.kind) else {
                debug!(kind = %rule.kind, "skipping rule with unregistered type");
                continue;
            };
            let config = rule.config_map();
            if predicate.matches(&config, &local, subject)? {
                trace!(kind = %rule.kind, effect = %rule.effect, "rule matched");
                state = rule.effect.allows();
                matched_kind = Some(rule.kind.clone());
            }
        }

        let decision = Decision { allowed: state, matched_kind, rules_evaluated: rules.len() };
        notify(subject.subject_type(), &decision);
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avail_core::rule::Rule;
    use chrono::Utc;
    use serde_json::json;

    struct Fixed {
        rules: Vec<Rule>,
    }

    impl Subject for Fixed {
        fn subject_type(&self) -> &str {
            "fixed"
        }

        fn availability_rules(&self) -> Vec<Rule> {
            self.rules.clone()
        }
    }

    #[test]
    fn engine_default_effect_applies_without_rules() {
        let subject = Fixed { rules: Vec::new() };
        let moment = Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();
        let deny = Engine::default();
        assert!(!deny.is_available(&subject, &moment).unwrap());
        let allow = Engine::default().with_default_effect(Effect::Allow);
        assert!(allow.is_available(&subject, &moment).unwrap());
    }

    #[test]
    fn unregistered_rule_types_are_skipped() {
        let subject = Fixed {
            rules: vec![
                Rule::new("no_such_type", Effect::Allow),
                Rule::new("weekdays", Effect::Allow)
                    .with_config(json!({"days": [1, 2, 3, 4, 5, 6, 7]}))
                    .with_priority(10),
            ],
        };
        let moment = Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();
        assert!(Engine::default().is_available(&subject, &moment).unwrap());
    }

    #[test]
    fn non_object_config_is_normalized_to_empty() {
        // An empty weekday set never matches, so the default effect holds.
        let subject = Fixed {
            rules: vec![Rule::new("weekdays", Effect::Allow).with_config(json!("mon,tue"))],
        };
        let moment = Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();
        assert!(!Engine::default().is_available(&subject, &moment).unwrap());
    }
}
