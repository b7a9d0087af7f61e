//! Manager configuration.

use serde::Deserialize;

/// Errors produced while reading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for loading and replication. Every field has a default, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Namespace whose documents every other namespace overrides.
    pub builtin_namespace: String,
    /// Top-level directory that gun documents live under.
    pub category: String,
    /// Document extensions considered during candidate discovery.
    pub extensions: Vec<String>,
    /// Upper bound on the entry count accepted when decoding a sync payload.
    pub max_sync_entries: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            builtin_namespace: "armory".to_string(),
            category: "guns".to_string(),
            extensions: vec!["json".to_string(), "ron".to_string(), "toml".to_string()],
            max_sync_entries: 4096,
        }
    }
}

impl ManagerConfig {
    /// Parse a TOML configuration and check it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ManagerConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the loader cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.builtin_namespace.is_empty() {
            return Err(ConfigError::Invalid("builtin_namespace is empty".into()));
        }
        if self.category.is_empty() || self.category.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "category '{}' must be a single non-empty segment",
                self.category
            )));
        }
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid("no document extensions".into()));
        }
        for ext in &self.extensions {
            if crate::document::Format::from_extension(ext).is_none() {
                return Err(ConfigError::Invalid(format!("unsupported extension '{ext}'")));
            }
        }
        Ok(())
    }
}
