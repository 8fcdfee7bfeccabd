//! Inventory-gate predicate and its resolver adapter.
//!
//! The gate is the single predicate permitted to consult external state. A
//! host supplies resolver definitions per subject class (with a `"*"`
//! wildcard and a global fallback); the adapter normalizes each definition
//! into a uniform callable once per class and memoizes the result,
//! negative outcomes included. Flushing the cache means recreating the
//! predicate instance.

use crate::convert::as_f64;
use avail_core::moment::LocalMoment;
use avail_core::predicate::{BoxError, Predicate, PredicateError};
use avail_core::subject::Subject;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Uniform resolver callable: reports stock (or a direct verdict) for a
/// subject at a moment, given the rule's config.
pub type ResolverFn = Arc<
    dyn Fn(&dyn Subject, &LocalMoment, &Map<String, Value>) -> Result<Value, BoxError>
        + Send
        + Sync,
>;

/// How a resolver is specified in host configuration.
#[derive(Clone)]
pub enum ResolverDef {
    /// Ready-made callable; used as-is.
    Callable(ResolverFn),
    /// Name resolved through the injected [`ResolverCatalog`].
    /// `"provider@method"` selects a named method of a provider.
    Named(String),
}

impl fmt::Debug for ResolverDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callable(_) => f.write_str("Callable(..)"),
            Self::Named(name) => write!(f, "Named({name})"),
        }
    }
}

/// Builds resolver callables from names found in configuration.
///
/// Returning `None` for an unknown name (or method) makes the affected
/// rules evaluate to non-match; it is not an error.
pub trait ResolverCatalog: Send + Sync {
    /// Build the resolver registered under `name`, optionally bound to one
    /// of its methods.
    fn build(&self, name: &str, method: Option<&str>) -> Option<ResolverFn>;
}

/// The `inventory_gate` configuration block: a global fallback definition
/// plus per-subject-class overrides (`"*"` is the wildcard class).
#[derive(Debug, Clone, Default)]
pub struct InventoryResolvers {
    /// Global fallback definition.
    pub resolver: Option<ResolverDef>,
    /// Per-subject-class definitions.
    pub resolvers: HashMap<String, ResolverDef>,
}

impl InventoryResolvers {
    /// Set the global fallback definition.
    #[must_use]
    pub fn with_default(mut self, def: ResolverDef) -> Self {
        self.resolver = Some(def);
        self
    }

    /// Register a definition for one subject class (or `"*"`).
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>, def: ResolverDef) -> Self {
        self.resolvers.insert(class.into(), def);
        self
    }
}

/// Matches when the subject's resolver reports availability at or above
/// `config.min`.
///
/// `min` coerces from numbers and numeric strings; negatives clamp to 0;
/// anything else makes the rule a non-match. A boolean resolver result is
/// used directly, a numeric one is compared against `min`, and any other
/// shape is a non-match. Resolver failures propagate to the evaluation
/// caller.
pub struct InventoryGateEvaluator {
    defs: InventoryResolvers,
    catalog: Option<Arc<dyn ResolverCatalog>>,
    cache: RwLock<HashMap<String, Option<ResolverFn>>>,
}

impl fmt::Debug for InventoryGateEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryGateEvaluator").field("defs", &self.defs).finish_non_exhaustive()
    }
}

impl InventoryGateEvaluator {
    /// Build a gate over callable-only definitions.
    #[must_use]
    pub fn new(defs: InventoryResolvers) -> Self {
        Self { defs, catalog: None, cache: RwLock::new(HashMap::new()) }
    }

    /// Build a gate that can additionally resolve named definitions
    /// through `catalog`.
    #[must_use]
    pub fn with_catalog(defs: InventoryResolvers, catalog: Arc<dyn ResolverCatalog>) -> Self {
        Self { defs, catalog: Some(catalog), cache: RwLock::new(HashMap::new()) }
    }

    /// Definition lookup order: exact class, wildcard, global fallback.
    fn definition_for(&self, subject_type: &str) -> Option<&ResolverDef> {
        self.defs
            .resolvers
            .get(subject_type)
            .or_else(|| self.defs.resolvers.get("*"))
            .or(self.defs.resolver.as_ref())
    }

    fn normalize(&self, def: &ResolverDef) -> Option<ResolverFn> {
        match def {
            ResolverDef::Callable(f) => Some(f.clone()),
            ResolverDef::Named(target) => {
                let (name, method) = match target.split_once('@') {
                    Some((name, method)) => (name, Some(method)),
                    None => (target.as_str(), None),
                };
                let catalog = self.catalog.as_ref()?;
                catalog.build(name, method)
            }
        }
    }

    /// Memoized `subject class -> callable` lookup.
    fn resolver_for(&self, subject_type: &str) -> Option<ResolverFn> {
        if let Some(cached) = self.cache.read().expect("resolver cache poisoned").get(subject_type)
        {
            return cached.clone();
        }
        let resolved = self.definition_for(subject_type).and_then(|def| self.normalize(def));
        if resolved.is_none() {
            debug!(subject_type, "no inventory resolver for subject class");
        }
        self.cache
            .write()
            .expect("resolver cache poisoned")
            .insert(subject_type.to_string(), resolved.clone());
        resolved
    }
}

impl Predicate for InventoryGateEvaluator {
    fn matches(
        &self,
        config: &Map<String, Value>,
        moment: &LocalMoment,
        subject: &dyn Subject,
    ) -> Result<bool, PredicateError> {
        let Some(min) = config.get("min").and_then(as_f64) else {
            return Ok(false);
        };
        let min = min.max(0.0);
        let Some(resolver) = self.resolver_for(subject.subject_type()) else {
            return Ok(false);
        };
        let value = resolver(subject, moment, config).map_err(|source| {
            PredicateError::Resolver { subject_type: subject.subject_type().to_string(), source }
        })?;
        Ok(match value {
            Value::Bool(direct) => direct,
            Value::Number(n) => n.as_f64().is_some_and(|stock| stock >= min),
            _ => false,
        })
    }
}
