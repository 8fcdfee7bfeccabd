//! Host settings for wiring an engine at startup.
//!
//! Everything the evaluation core reads from configuration is carried in
//! one explicit [`Settings`] value passed at construction time; there is
//! no process-wide configuration state.

use avail_core::effect::Effect;
use avail_core::moment::parse_zone;
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Errors from loading or validating host settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be opened.
    #[error("failed to open settings file {path}: {source}")]
    Open {
        /// Path as given by the host.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid YAML for the expected shape.
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// `default_timezone` is not a known IANA zone name.
    #[error("unknown default timezone '{0}'")]
    UnknownTimezone(String),
    /// A `rule_types` entry maps to an empty catalog id.
    #[error("rule_types entry '{kind}' has an empty catalog id")]
    EmptyCatalogId {
        /// Offending type name.
        kind: String,
    },
    /// A `rule_types` key is empty.
    #[error("rule_types contains an empty type name")]
    EmptyTypeName,
}

/// The `inventory_gate` settings block: named resolver definitions per
/// subject class (wildcard `"*"` supported) plus a global fallback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventorySettings {
    /// Global fallback resolver name (`"provider"` or `"provider@method"`).
    #[serde(default)]
    pub resolver: Option<String>,
    /// Per-subject-class resolver names.
    #[serde(default)]
    pub resolvers: HashMap<String, String>,
}

impl InventorySettings {
    /// True when no resolver definition is configured at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolver.is_none() && self.resolvers.is_empty()
    }
}

/// Recognized host configuration options.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Name of the storage location for rules; surfaced for the host's
    /// persistence layer, unused by evaluation.
    #[serde(default)]
    pub table: Option<String>,
    /// Fallback effect when a subject has no explicit default.
    #[serde(default = "default_effect")]
    pub default_effect: Effect,
    /// Fallback IANA zone when a subject has none.
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Extra rule types: type name to catalog id, installed at startup.
    #[serde(default)]
    pub rule_types: HashMap<String, String>,
    /// Inventory resolver wiring.
    #[serde(default)]
    pub inventory_gate: InventorySettings,
}

fn default_effect() -> Effect {
    Effect::Deny
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table: None,
            default_effect: default_effect(),
            default_timezone: default_timezone(),
            rule_types: HashMap::new(),
            inventory_gate: InventorySettings::default(),
        }
    }
}

impl Settings {
    /// Load and validate settings from a YAML file.
    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(&path).map_err(|source| ConfigError::Open {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        let settings: Self = serde_yaml::from_reader(BufReader::new(file))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the parts serde cannot: the zone name and rule-type entries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zone()?;
        for (kind, id) in &self.rule_types {
            if kind.trim().is_empty() {
                return Err(ConfigError::EmptyTypeName);
            }
            if id.trim().is_empty() {
                return Err(ConfigError::EmptyCatalogId { kind: kind.clone() });
            }
        }
        Ok(())
    }

    /// The configured default zone, parsed.
    pub fn zone(&self) -> Result<Tz, ConfigError> {
        parse_zone(&self.default_timezone)
            .ok_or_else(|| ConfigError::UnknownTimezone(self.default_timezone.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_fail_closed_utc() {
        let s = Settings::default();
        assert_eq!(s.default_effect, Effect::Deny);
        assert_eq!(s.zone().unwrap(), chrono_tz::UTC);
        assert!(s.rule_types.is_empty());
        assert!(s.inventory_gate.is_empty());
    }

    #[test]
    fn parses_full_block() {
        let yaml = r#"
table: availability_rules
default_effect: allow
default_timezone: America/New_York
rule_types:
  workdays: weekdays
inventory_gate:
  resolver: warehouse@on_hand
  resolvers:
    "*": warehouse
"#;
        let s: Settings = serde_yaml::from_str(yaml).unwrap();
        s.validate().unwrap();
        assert_eq!(s.table.as_deref(), Some("availability_rules"));
        assert_eq!(s.default_effect, Effect::Allow);
        assert_eq!(s.zone().unwrap(), chrono_tz::America::New_York);
        assert_eq!(s.rule_types.get("workdays").map(String::as_str), Some("weekdays"));
        assert_eq!(s.inventory_gate.resolver.as_deref(), Some("warehouse@on_hand"));
        assert_eq!(s.inventory_gate.resolvers.get("*").map(String::as_str), Some("warehouse"));
    }

    #[test]
    fn rejects_unknown_zone() {
        let yaml = "default_timezone: Mars/Olympus\n";
        let s: Settings = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(s.validate(), Err(ConfigError::UnknownTimezone(_))));
    }

    #[test]
    fn rejects_unknown_effect() {
        let yaml = "default_effect: maybe\n";
        assert!(serde_yaml::from_str::<Settings>(yaml).is_err());
    }

    #[test]
    fn rejects_empty_rule_type_entries() {
        let s: Settings = serde_yaml::from_str("rule_types:\n  workdays: \"\"\n").unwrap();
        assert!(matches!(s.validate(), Err(ConfigError::EmptyCatalogId { .. })));
        let s: Settings = serde_yaml::from_str("rule_types:\n  \"\": weekdays\n").unwrap();
        assert!(matches!(s.validate(), Err(ConfigError::EmptyTypeName)));
    }
}
