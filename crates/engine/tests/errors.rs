//! Error surfacing: resolver failures must reach the caller instead of
//! silently reading as "unavailable".

use avail_core::effect::Effect;
use avail_core::rule::Rule;
use avail_core::subject::Subject;
use chrono::TimeZone;
use engine::{engine_metrics, Definition, Engine, EvalError, Registry};
use predicates::{InventoryGateEvaluator, InventoryResolvers, ResolverDef, ResolverFn};
use serde_json::json;
use std::sync::Arc;

struct Venue {
    kind: &'static str,
    rules: Vec<Rule>,
}

impl Subject for Venue {
    fn subject_type(&self) -> &str {
        self.kind
    }

    fn availability_rules(&self) -> Vec<Rule> {
        self.rules.clone()
    }

    fn default_effect(&self) -> Option<Effect> {
        Some(Effect::Allow)
    }
}

fn engine_with_failing_resolver() -> Engine {
    let failing: ResolverFn = Arc::new(|_, _, _| Err("inventory backend unreachable".into()));
    let defs = InventoryResolvers::default().with_default(ResolverDef::Callable(failing));
    let mut registry = Registry::with_builtins();
    registry.register(
        "inventory_gate",
        Definition::Instance(Arc::new(InventoryGateEvaluator::new(defs))),
    );
    Engine::new(registry)
}

#[test]
fn resolver_failure_surfaces_as_eval_error() {
    let engine = engine_with_failing_resolver();
    let venue = Venue {
        kind: "erroring",
        rules: vec![Rule::new("inventory_gate", Effect::Allow).with_config(json!({"min": 1}))],
    };
    let moment = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();

    let err = engine.is_available(&venue, &moment).unwrap_err();
    let EvalError::Predicate(inner) = err;
    assert!(inner.to_string().contains("inventory backend unreachable"));
    assert!(inner.to_string().contains("erroring"));
}

#[test]
fn failed_evaluations_do_not_count_as_decisions() {
    let engine = engine_with_failing_resolver();
    let venue = Venue {
        kind: "erroring_uncounted",
        rules: vec![Rule::new("inventory_gate", Effect::Allow).with_config(json!({"min": 1}))],
    };
    let moment = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();

    let allow_before = engine_metrics().decision_counter("erroring_uncounted", "allow");
    let deny_before = engine_metrics().decision_counter("erroring_uncounted", "deny");
    assert!(engine.is_available(&venue, &moment).is_err());
    assert_eq!(engine_metrics().decision_counter("erroring_uncounted", "allow"), allow_before);
    assert_eq!(engine_metrics().decision_counter("erroring_uncounted", "deny"), deny_before);
}

#[test]
fn later_rules_are_not_reached_after_a_resolver_failure() {
    // The gate sits before an always-matching allow rule; the error stops
    // the pipeline rather than letting the later rule answer.
    let engine = engine_with_failing_resolver();
    let venue = Venue {
        kind: "erroring_short_circuit",
        rules: vec![
            Rule::new("inventory_gate", Effect::Deny)
                .with_config(json!({"min": 1}))
                .with_priority(10),
            Rule::new("rrule", Effect::Allow)
                .with_config(json!({"rrule": "FREQ=DAILY"}))
                .with_priority(20),
        ],
    };
    let moment = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();
    assert!(engine.is_available(&venue, &moment).is_err());
}

#[test]
fn malformed_min_is_a_non_match_not_an_error() {
    let engine = engine_with_failing_resolver();
    // Unusable threshold: the rule is skipped as a non-match and the
    // resolver is never consulted, so the default effect answers.
    let venue = Venue {
        kind: "erroring_bad_min",
        rules: vec![Rule::new("inventory_gate", Effect::Deny).with_config(json!({"min": "lots"}))],
    };
    let moment = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();
    assert!(engine.is_available(&venue, &moment).unwrap());
}
