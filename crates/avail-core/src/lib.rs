//! Availability core contracts and shared types.

#![deny(unsafe_code)]

/// Version of the availability core library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod effect {
    //! The binary verdict a matching rule contributes.

    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::str::FromStr;
    use thiserror::Error;

    /// Verdict contributed by a rule when its predicate matches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Effect {
        /// The subject is available at the queried moment.
        Allow,
        /// The subject is unavailable at the queried moment.
        Deny,
    }

    impl Effect {
        /// True iff this effect is `Allow`.
        #[must_use]
        pub fn allows(self) -> bool {
            matches!(self, Self::Allow)
        }
    }

    impl fmt::Display for Effect {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Allow => f.write_str("allow"),
                Self::Deny => f.write_str("deny"),
            }
        }
    }

    /// Error returned when parsing a persisted effect string fails.
    #[derive(Debug, Error, PartialEq, Eq)]
    #[error("unknown effect '{0}'; valid: allow|deny")]
    pub struct ParseEffectError(pub String);

    impl FromStr for Effect {
        type Err = ParseEffectError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "allow" => Ok(Self::Allow),
                "deny" => Ok(Self::Deny),
                other => Err(ParseEffectError(other.to_string())),
            }
        }
    }

}

pub mod rule {
    //! Persisted policy clauses and the evaluation snapshot over them.

    use super::effect::Effect;
    use serde::{Deserialize, Serialize};
    use serde_json::{Map, Value};

    /// One policy clause: binds a predicate type to its parameters, an
    /// effect, a priority, and an enabled flag.
    ///
    /// Rules belong to a subject through the `subject_type`/`subject_id`
    /// back-reference surfaced by the persistence layer; evaluation treats
    /// that pair as opaque.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Rule {
        /// Registry key naming the predicate that evaluates this rule.
        #[serde(rename = "type")]
        pub kind: String,
        /// Predicate-specific parameters; `null` is equivalent to `{}`.
        #[serde(default)]
        pub config: Option<Value>,
        /// Effect applied when the predicate matches.
        pub effect: Effect,
        /// Lower evaluates first; ties keep insertion order.
        #[serde(default)]
        pub priority: i64,
        /// Disabled rules are excluded from evaluation entirely.
        #[serde(default = "default_enabled")]
        pub enabled: bool,
        /// Owning subject class, as persisted (opaque to evaluation).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub subject_type: Option<String>,
        /// Owning subject identifier, as persisted (opaque to evaluation).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub subject_id: Option<Value>,
    }

    fn default_enabled() -> bool {
        true
    }

    impl Rule {
        /// Construct an enabled rule with priority 0 and no config.
        #[must_use]
        pub fn new(kind: impl Into<String>, effect: Effect) -> Self {
            Self {
                kind: kind.into(),
                config: None,
                effect,
                priority: 0,
                enabled: true,
                subject_type: None,
                subject_id: None,
            }
        }

        /// Attach predicate parameters.
        #[must_use]
        pub fn with_config(mut self, config: Value) -> Self {
            self.config = Some(config);
            self
        }

        /// Set the evaluation priority (lower first).
        #[must_use]
        pub fn with_priority(mut self, priority: i64) -> Self {
            self.priority = priority;
            self
        }

        /// Mark the rule disabled.
        #[must_use]
        pub fn disabled(mut self) -> Self {
            self.enabled = false;
            self
        }

        /// Normalized predicate parameters: a stored JSON object is returned
        /// as-is; `null`, absent, or any non-object value becomes `{}`.
        #[must_use]
        pub fn config_map(&self) -> Map<String, Value> {
            match &self.config {
                Some(Value::Object(map)) => map.clone(),
                _ => Map::new(),
            }
        }
    }

    /// Consistent evaluation snapshot over a subject's rules: enabled only,
    /// priority ascending, stable with respect to insertion order.
    #[derive(Debug, Clone, Default)]
    pub struct RuleSet {
        rules: Vec<Rule>,
    }

    impl RuleSet {
        /// Filter disabled rules and stably order the rest by priority.
        #[must_use]
        pub fn snapshot(rules: Vec<Rule>) -> Self {
            let mut rules: Vec<Rule> = rules.into_iter().filter(|r| r.enabled).collect();
            rules.sort_by_key(|r| r.priority);
            Self { rules }
        }

        /// Iterate rules in evaluation order.
        pub fn iter(&self) -> impl Iterator<Item = &Rule> {
            self.rules.iter()
        }

        /// Number of rules in the snapshot.
        #[must_use]
        pub fn len(&self) -> usize {
            self.rules.len()
        }

        /// True when no rule survived the snapshot filter.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.rules.is_empty()
        }
    }

}

pub mod subject {
    //! The minimal contract evaluation requires from an entity.

    use super::effect::Effect;
    use super::rule::Rule;

    /// Anything availability can be decided for.
    ///
    /// `subject_type` is the class identity used to key per-class state such
    /// as the inventory resolver cache; it must be stable for the life of
    /// the process.
    pub trait Subject {
        /// Stable class identity (e.g. the persisted `subject_type`).
        fn subject_type(&self) -> &str;

        /// Rules attached to this subject. Evaluation snapshots the returned
        /// sequence (enabled filter, stable priority ordering), so
        /// implementations may return rules in any order.
        fn availability_rules(&self) -> Vec<Rule>;

        /// Effect when no rule matches; `None` defers to the engine default.
        fn default_effect(&self) -> Option<Effect> {
            None
        }

        /// IANA zone name for localizing moments; `None` defers to the
        /// engine default zone.
        fn timezone(&self) -> Option<String> {
            None
        }
    }

}

pub mod moment {
    //! Timezone localization for evaluation moments.

    use chrono::{DateTime, TimeZone};
    use chrono_tz::Tz;

    /// A caller-supplied instant displayed in the subject's zone.
    pub type LocalMoment = DateTime<Tz>;

    /// Re-display `moment` in `zone`. The instant is preserved and the
    /// caller's value is left untouched.
    pub fn localize<Z: TimeZone>(moment: &DateTime<Z>, zone: Tz) -> LocalMoment {
        moment.with_timezone(&zone)
    }

    /// Parse an IANA zone name, e.g. `America/New_York`.
    #[must_use]
    pub fn parse_zone(name: &str) -> Option<Tz> {
        name.parse().ok()
    }

}

pub mod predicate {
    //! The single capability every rule-type evaluator satisfies.

    use super::moment::LocalMoment;
    use super::subject::Subject;
    use serde_json::{Map, Value};
    use thiserror::Error;

    /// Boxed error produced by host-owned resolver code.
    pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

    /// Failure surfaced from a predicate.
    ///
    /// Pure predicates are total: malformed config yields `Ok(false)`, never
    /// an error. The only variant here belongs to the inventory gate, whose
    /// resolver is host-owned side-effectful code and whose failures must
    /// reach the evaluation caller.
    #[derive(Debug, Error)]
    pub enum PredicateError {
        /// An inventory resolver failed while being consulted.
        #[error("inventory resolver for subject type '{subject_type}' failed: {source}")]
        Resolver {
            /// Class of the subject whose resolver was invoked.
            subject_type: String,
            /// Underlying host error.
            #[source]
            source: BoxError,
        },
    }

    /// A rule-type evaluator: decides whether a rule applies at a moment.
    ///
    /// `moment` is already displayed in the subject's zone. Implementations
    /// must not mutate `moment` or `subject`, and must return `Ok(false)`
    /// on any malformed `config` rather than fail.
    pub trait Predicate: Send + Sync {
        /// True iff the rule carrying `config` applies at `moment`.
        fn matches(
            &self,
            config: &Map<String, Value>,
            moment: &LocalMoment,
            subject: &dyn Subject,
        ) -> Result<bool, PredicateError>;
    }
}
