//! valuebridge configuration types and loading

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::binding::BindingOptions;
use crate::broker::Kind;
use crate::events::DEFAULT_CHANNEL_CAPACITY;

/// Main valuebridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Event bus configuration
    pub events: EventsConfig,

    /// Bindings created by `vb run`
    pub bindings: Vec<BindingConfig>,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.events.channel_capacity == 0 {
            return Err(eyre::eyre!("events.channel-capacity must be greater than 0"));
        }

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if binding.path.trim().is_empty() {
                return Err(eyre::eyre!("Binding path must not be empty"));
            }
            if !seen.insert((binding.path.as_str(), binding.flow)) {
                return Err(eyre::eyre!(
                    "Duplicate {} binding for path '{}'",
                    binding.flow,
                    binding.path
                ));
            }
            if binding.flow == Flow::Outbound && binding.kind == Kind::Property && binding.default.is_none() {
                return Err(eyre::eyre!(
                    "Outbound property '{}' needs a default value to publish",
                    binding.path
                ));
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .valuebridge.yml
        let local_config = PathBuf::from(".valuebridge.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/valuebridge/valuebridge.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("valuebridge").join("valuebridge.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Capacity of the broadcast channel
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Which way values flow through a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    /// Broker -> local value
    Inbound,
    /// Local value -> broker
    Outbound,
}

impl std::fmt::Display for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Flow::Inbound => write!(f, "inbound"),
            Flow::Outbound => write!(f, "outbound"),
        }
    }
}

/// One binding declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Broker path
    pub path: String,

    /// Direction of flow
    #[serde(rename = "direction")]
    pub flow: Flow,

    /// Property or event
    pub kind: Kind,

    /// Registration description; the path is registered only when set
    #[serde(default)]
    pub description: Option<String>,

    /// Starting value of the local value (properties only)
    #[serde(default)]
    pub default: Option<serde_json::Value>,

    /// Ask the broker to delete the property when this binding unregisters
    #[serde(default = "default_delete_on_unregister", rename = "delete-on-unregister")]
    pub delete_on_unregister: bool,
}

fn default_delete_on_unregister() -> bool {
    true
}

impl BindingConfig {
    pub fn options(&self) -> BindingOptions {
        BindingOptions {
            description: self.description.clone(),
            delete_on_unregister: self.delete_on_unregister,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
log-level: debug
events:
  channel-capacity: 64
bindings:
  - path: lounge/temperature
    direction: inbound
    kind: property
    default: 18.5
  - path: lounge/light
    direction: outbound
    kind: property
    description: Lounge light state
    default: false
    delete-on-unregister: false
  - path: door/bell
    direction: outbound
    kind: event
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.log_level.is_none());
        assert_eq!(config.events.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.bindings.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_deserialize_config() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.events.channel_capacity, 64);
        assert_eq!(config.bindings.len(), 3);

        let temp = &config.bindings[0];
        assert_eq!(temp.flow, Flow::Inbound);
        assert_eq!(temp.kind, Kind::Property);
        assert_eq!(temp.default, Some(json!(18.5)));
        assert!(temp.delete_on_unregister);
        assert_eq!(temp.options(), BindingOptions::default());

        let light = &config.bindings[1];
        assert_eq!(
            light.options(),
            BindingOptions::registered("Lounge light state").with_delete_on_unregister(false)
        );

        config.validate().unwrap();
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("log-level: warn\n").unwrap();
        assert_eq!(config.events.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.bindings.is_empty());
    }

    #[test]
    fn test_validate_rejects_duplicate_binding() {
        let yaml = r#"
bindings:
  - { path: a/b, direction: inbound, kind: event }
  - { path: a/b, direction: inbound, kind: property }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate inbound binding"));
    }

    #[test]
    fn test_validate_allows_both_directions_on_one_path() {
        let yaml = r#"
bindings:
  - { path: a/b, direction: inbound, kind: property }
  - { path: a/b, direction: outbound, kind: property, default: 1 }
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_outbound_property_without_default() {
        let yaml = "bindings:\n  - { path: a/b, direction: outbound, kind: property }\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let yaml = "bindings:\n  - { path: ' ', direction: inbound, kind: event }\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bridge.yml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.bindings.len(), 3);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("debug"));
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
