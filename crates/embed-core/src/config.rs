//! Tool configuration
//!
//! The host editor hands the tool a JSON object when it is registered:
//!
//! ```json
//! {
//!   "services": {
//!     "youtube": true,
//!     "gist": {
//!       "regex": "https://gist\\.github\\.com/([^/?&]*)/([^/?&]*)",
//!       "embedUrl": "https://gist.github.com/<%= remote_id %>.pibb",
//!       "html": "<iframe width=\"100%\" height=\"350\"></iframe>"
//!     }
//!   },
//!   "readyDelay": 450
//! }
//! ```

use crate::services::IdExtractor;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default quiet period before an embed is considered ready (milliseconds)
pub const DEFAULT_READY_DELAY_MS: u64 = 450;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config is not valid JSON or has the wrong shape
    #[error("Invalid tool configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Embed tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    /// Service enable flags and custom definitions, in document order
    #[serde(default)]
    pub services: IndexMap<String, ServiceSetting>,

    /// Quiet period before an embed counts as loaded (milliseconds)
    #[serde(default = "default_ready_delay")]
    pub ready_delay: u64,
}

fn default_ready_delay() -> u64 {
    DEFAULT_READY_DELAY_MS
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            services: IndexMap::new(),
            ready_delay: DEFAULT_READY_DELAY_MS,
        }
    }
}

impl ToolConfig {
    /// Parse configuration from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse configuration from an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Enable a built-in service by key
    pub fn enable(mut self, key: impl Into<String>) -> Self {
        self.services.insert(key.into(), ServiceSetting::Flag(true));
        self
    }

    /// Add or override a service
    pub fn with_service(mut self, key: impl Into<String>, service: ServiceConfig) -> Self {
        self.services.insert(key.into(), ServiceSetting::Custom(service));
        self
    }

    /// Quiet period as a duration
    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay)
    }
}

/// One entry under `services`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceSetting {
    /// Enable (`true`) or no-op (`false`) for a built-in key
    Flag(bool),
    /// Custom definition or override
    Custom(ServiceConfig),
    /// Anything else; ignored
    Ignored(Value),
}

/// Unvalidated service definition as written by the user
///
/// Every field is optional here; [`ServiceDefinition::validate`] decides
/// whether the entry is usable.
///
/// [`ServiceDefinition::validate`]: crate::services::ServiceDefinition::validate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// URL pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Embed URL template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    /// Frame template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Height (number or CSS length)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<Value>,
    /// Width (number or CSS length)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<Value>,
    /// Id strategy; only settable from code
    #[serde(skip)]
    pub id: Option<IdExtractor>,
}

impl ServiceConfig {
    /// Create a definition with the mandatory fields set
    pub fn new(
        regex: impl Into<String>,
        embed_url: impl Into<String>,
        html: impl Into<String>,
    ) -> Self {
        Self {
            regex: Some(regex.into()),
            embed_url: Some(embed_url.into()),
            html: Some(html.into()),
            ..Self::default()
        }
    }

    /// Set height
    pub fn with_height(mut self, height: impl Into<Value>) -> Self {
        self.height = Some(height.into());
        self
    }

    /// Set width
    pub fn with_width(mut self, width: impl Into<Value>) -> Self {
        self.width = Some(width.into());
        self
    }

    /// Set the id strategy
    pub fn with_id(mut self, id: IdExtractor) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToolConfig::from_json("{}").unwrap();
        assert!(config.services.is_empty());
        assert_eq!(config.ready_delay(), Duration::from_millis(450));
    }

    #[test]
    fn test_service_settings_kinds() {
        let config = ToolConfig::from_json(
            r#"{
                "services": {
                    "youtube": true,
                    "vimeo": false,
                    "coub": "yes",
                    "mine": { "regex": "x", "embedUrl": "y", "html": "<iframe></iframe>" }
                },
                "readyDelay": 100
            }"#,
        )
        .unwrap();

        let kinds: Vec<_> = config.services.iter().collect();
        assert!(matches!(kinds[0], (k, ServiceSetting::Flag(true)) if k == "youtube"));
        assert!(matches!(kinds[1], (_, ServiceSetting::Flag(false))));
        assert!(matches!(kinds[2], (_, ServiceSetting::Ignored(_))));
        assert!(matches!(kinds[3], (_, ServiceSetting::Custom(_))));
        assert_eq!(config.ready_delay, 100);
    }

    #[test]
    fn test_service_order_preserved() {
        let config = ToolConfig::from_json(
            r#"{"services": {"zeta": true, "alpha": true, "mid": true}}"#,
        )
        .unwrap();
        let keys: Vec<_> = config.services.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_malformed_config() {
        assert!(matches!(
            ToolConfig::from_json("{\"readyDelay\": \"soon\"}"),
            Err(ConfigError::Parse(_))
        ));
        assert!(ToolConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_builders() {
        let config = ToolConfig::default()
            .enable("youtube")
            .with_service("mine", ServiceConfig::new("a", "b", "<iframe></iframe>").with_height(200));

        assert_eq!(config.services.len(), 2);
        match &config.services["mine"] {
            ServiceSetting::Custom(service) => {
                assert_eq!(service.height, Some(Value::from(200)));
            }
            other => panic!("unexpected setting: {:?}", other),
        }
    }
}
