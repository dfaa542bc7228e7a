//! Service registry resolution
//!
//! Combines the built-in catalog with the user's `services` configuration
//! into the registry a tool instance works against. Resolution happens in two
//! passes: every custom definition is validated first, then the catalog is
//! narrowed and the surviving custom definitions folded in.

use crate::config::{ServiceSetting, ToolConfig};
use crate::services::{CustomService, ServiceCatalog, ServiceDefinition};
use indexmap::IndexMap;
use regex::Regex;

/// Service key to URL pattern, declared to the host for paste interception
pub type PatternMap = IndexMap<String, Regex>;

/// The effective set of services for one tool configuration
///
/// Iteration order is catalog order for built-ins followed by newly
/// introduced custom keys in configuration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    services: IndexMap<String, ServiceDefinition>,
}

impl Registry {
    /// Look up a service by key
    pub fn get(&self, key: &str) -> Option<&ServiceDefinition> {
        self.services.get(key)
    }

    /// Whether a key is registered
    pub fn contains(&self, key: &str) -> bool {
        self.services.contains_key(key)
    }

    /// Iterate services in registry order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServiceDefinition)> {
        self.services.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Service keys in registry order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Number of services
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether the registry has no services
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Project each service's pattern
    pub fn patterns(&self) -> PatternMap {
        self.services
            .iter()
            .map(|(key, service)| (key.clone(), service.regex.clone()))
            .collect()
    }
}

/// Resolve the registry and paste patterns for a configuration
pub fn resolve(builtins: &ServiceCatalog, config: &ToolConfig) -> (Registry, PatternMap) {
    let (enabled, custom) = partition(config);

    let mut services: IndexMap<String, ServiceDefinition> = if enabled.is_empty() {
        builtins.clone()
    } else {
        builtins
            .iter()
            .filter(|(key, _)| enabled.contains(&key.as_str()))
            .map(|(key, service)| (key.clone(), service.clone()))
            .collect()
    };

    for (key, service) in custom {
        match services.get_mut(&key) {
            Some(existing) => existing.overlay(service),
            None => {
                services.insert(key, service.into());
            }
        }
    }

    let registry = Registry { services };
    tracing::debug!(
        "Resolved embed registry with {} services ({} enabled flags)",
        registry.len(),
        enabled.len()
    );

    let patterns = registry.patterns();
    (registry, patterns)
}

/// Split settings into enable flags and validated custom definitions
///
/// Invalid custom definitions are dropped here so that one bad entry never
/// disables the tool.
fn partition(config: &ToolConfig) -> (Vec<&str>, Vec<(String, CustomService)>) {
    let mut enabled = Vec::new();
    let mut custom = Vec::new();

    for (key, setting) in &config.services {
        match setting {
            ServiceSetting::Flag(true) => enabled.push(key.as_str()),
            ServiceSetting::Flag(false) | ServiceSetting::Ignored(_) => {}
            ServiceSetting::Custom(candidate) => match ServiceDefinition::validate(candidate) {
                Ok(service) => custom.push((key.clone(), service)),
                Err(e) => {
                    tracing::debug!("Dropping custom service {}: {}", key, e);
                }
            },
        }
    }

    (enabled, custom)
}
