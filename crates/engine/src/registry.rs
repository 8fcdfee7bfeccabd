//! Evaluator registry: maps rule-type names to predicate instances.

use avail_core::predicate::Predicate;
use predicates::{
    BlackoutDateEvaluator, DateRangeEvaluator, InventoryGateEvaluator, InventoryResolvers,
    MonthsOfYearEvaluator, RRuleEvaluator, TimeOfDayEvaluator, WeekdaysEvaluator,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Lazy predicate constructor; `None` leaves the type unavailable.
pub type PredicateFactory = Arc<dyn Fn() -> Option<Arc<dyn Predicate>> + Send + Sync>;

/// How a rule type's predicate is obtained.
///
/// The three shapes let a host register eagerly (`Instance`), declaratively
/// (`Named`, instantiated by the registry's catalog), or lazily with its
/// own construction logic (`Factory`).
#[derive(Clone)]
pub enum Definition {
    /// An already-constructed predicate.
    Instance(Arc<dyn Predicate>),
    /// An identifier the catalog instantiates on first use.
    Named(String),
    /// A constructor invoked on first use; panics inside it propagate to
    /// the `get`/`all` caller as host wiring errors.
    Factory(PredicateFactory),
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(_) => f.write_str("Instance(..)"),
            Self::Named(id) => write!(f, "Named({id})"),
            Self::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Instantiates predicates for [`Definition::Named`] entries.
pub trait PredicateCatalog: Send + Sync {
    /// Build the predicate registered under `id`; `None` when unknown.
    fn build(&self, id: &str) -> Option<Arc<dyn Predicate>>;
}

/// The built-in rule-type identifiers, in registration order.
pub const BUILTIN_KINDS: [&str; 7] = [
    "weekdays",
    "months_of_year",
    "blackout_dates",
    "time_of_day",
    "date_range",
    "rrule",
    "inventory_gate",
];

/// Catalog knowing the seven built-in rule types.
///
/// The inventory gate built here carries no resolver wiring; hosts that
/// gate on inventory register a configured instance instead (see
/// `Engine::from_settings`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl PredicateCatalog for BuiltinCatalog {
    fn build(&self, id: &str) -> Option<Arc<dyn Predicate>> {
        match id {
            "weekdays" => Some(Arc::new(WeekdaysEvaluator)),
            "months_of_year" => Some(Arc::new(MonthsOfYearEvaluator)),
            "blackout_dates" => Some(Arc::new(BlackoutDateEvaluator)),
            "time_of_day" => Some(Arc::new(TimeOfDayEvaluator)),
            "date_range" => Some(Arc::new(DateRangeEvaluator)),
            "rrule" => Some(Arc::new(RRuleEvaluator)),
            "inventory_gate" => {
                Some(Arc::new(InventoryGateEvaluator::new(InventoryResolvers::default())))
            }
            _ => None,
        }
    }
}

/// Registry of rule-type definitions with a lazily populated instance
/// cache.
///
/// Predicates are constructed at most once per registered definition and
/// shared across evaluations, so per-instance state (such as the inventory
/// gate's resolver cache) survives between calls. Definitions are expected
/// to be installed at startup; `register` during concurrent evaluation is
/// not supported.
///
/// Example
/// ```
/// use engine::{Definition, Registry};
///
/// let mut registry = Registry::with_builtins();
/// assert!(registry.get("weekdays").is_some());
/// registry.register("workdays", Definition::Named("weekdays".into()));
/// assert!(registry.get("workdays").is_some());
/// assert!(registry.get("bespoke").is_none());
/// ```
pub struct Registry {
    catalog: Arc<dyn PredicateCatalog>,
    definitions: HashMap<String, Definition>,
    resolved: RwLock<HashMap<String, Arc<dyn Predicate>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("definitions", &self.definitions).finish_non_exhaustive()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Registry {
    /// Empty registry resolving named definitions through `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn PredicateCatalog>) -> Self {
        Self { catalog, definitions: HashMap::new(), resolved: RwLock::new(HashMap::new()) }
    }

    /// Registry pre-populated with the seven built-in rule types.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new(Arc::new(BuiltinCatalog));
        for kind in BUILTIN_KINDS {
            registry.register(kind, Definition::Named(kind.to_string()));
        }
        registry
    }

    /// Install (or overwrite) the definition for `kind`. Only that kind's
    /// cached instance is invalidated; other entries keep their state.
    pub fn register(&mut self, kind: impl Into<String>, definition: Definition) {
        let kind = kind.into();
        self.resolved.write().expect("registry cache poisoned").remove(&kind);
        self.definitions.insert(kind, definition);
    }

    /// Resolve `kind` to its predicate, constructing and caching on first
    /// use. `None` when the kind is unregistered, the catalog does not
    /// know the named id, or a factory declines to produce an instance.
    #[must_use]
    pub fn get(&self, kind: &str) -> Option<Arc<dyn Predicate>> {
        if let Some(hit) = self.resolved.read().expect("registry cache poisoned").get(kind) {
            return Some(hit.clone());
        }
        let definition = self.definitions.get(kind)?;
        let predicate = match definition {
            Definition::Instance(p) => Some(p.clone()),
            Definition::Named(id) => self.catalog.build(id),
            Definition::Factory(build) => build(),
        };
        match predicate {
            Some(p) => {
                self.resolved
                    .write()
                    .expect("registry cache poisoned")
                    .insert(kind.to_string(), p.clone());
                Some(p)
            }
            None => {
                debug!(kind, "definition resolved to no predicate");
                None
            }
        }
    }

    /// Resolve every registered definition, skipping the ones that produce
    /// no predicate.
    #[must_use]
    pub fn all(&self) -> HashMap<String, Arc<dyn Predicate>> {
        let mut out = HashMap::new();
        for kind in self.definitions.keys() {
            if let Some(p) = self.get(kind) {
                out.insert(kind.clone(), p);
            }
        }
        out
    }
}
