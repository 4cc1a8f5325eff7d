// src/config.rs
//! Process and per-context configuration.

use crate::value::Value;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// Environment variable naming the management domain for generated identities.
pub const DOMAIN_ENV: &str = "NAMING_CONTEXT_DOMAIN";

/// Key property used for generated identities.
pub const DEFAULT_TYPE_KEY: &str = "NamingContext";

/// Domain configured for this process, if any. Resolved once.
pub static CONFIGURED_DOMAIN: Lazy<Option<String>> =
    Lazy::new(|| env_then_default(DOMAIN_ENV, None, &[]).filter(|d| !d.is_empty()));

/// Look `name` up in the process environment, then in each of `overrides`
/// in order, falling back to `default`.
pub fn env_then_default(name: &str, default: Option<&str>, overrides: &[&HashMap<String, String>]) -> Option<String> {
    std::env::var(name)
        .ok()
        .or_else(|| overrides.iter().find_map(|m| m.get(name).cloned()))
        .or_else(|| default.map(str::to_string))
}

/// Settings for a new binding context.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextConfig {
    /// Initial environment properties.
    pub environment: BTreeMap<String, Value>,
    /// Full name of the context within its namespace; empty for a root.
    pub name_in_namespace: String,
    /// `type` key property used when an identity has to be generated.
    pub type_key: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            environment: BTreeMap::new(),
            name_in_namespace: String::new(),
            type_key: DEFAULT_TYPE_KEY.to_string(),
        }
    }
}

impl ContextConfig {
    pub fn with_environment(mut self, environment: BTreeMap<String, Value>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_name_in_namespace(mut self, name: impl Into<String>) -> Self {
        self.name_in_namespace = name.into();
        self
    }

    pub fn with_type_key(mut self, key: impl Into<String>) -> Self {
        self.type_key = key.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_searched_in_order() {
        let mut first = HashMap::new();
        first.insert("naming.test.key".to_string(), "first".to_string());
        let mut second = HashMap::new();
        second.insert("naming.test.key".to_string(), "second".to_string());
        second.insert("naming.test.other".to_string(), "other".to_string());

        let got = env_then_default("naming.test.key", Some("d"), &[&first, &second]);
        assert_eq!(got.as_deref(), Some("first"));
        let got = env_then_default("naming.test.other", Some("d"), &[&first, &second]);
        assert_eq!(got.as_deref(), Some("other"));
        let got = env_then_default("naming.test.missing", Some("d"), &[&first]);
        assert_eq!(got.as_deref(), Some("d"));
        assert_eq!(env_then_default("naming.test.missing", None, &[]), None);
    }

    #[test]
    fn configured_domain_follows_environment() {
        let expected = env_then_default(DOMAIN_ENV, None, &[]).filter(|d| !d.is_empty());
        assert_eq!(*CONFIGURED_DOMAIN, expected);
    }

    #[test]
    fn builder_overrides_defaults() {
        let cfg = ContextConfig::default()
            .with_name_in_namespace("app/env")
            .with_type_key("Ctx");
        assert_eq!(cfg.name_in_namespace, "app/env");
        assert_eq!(cfg.type_key, "Ctx");
        assert!(cfg.environment.is_empty());
    }
}
