//! Provider profile configuration.
//!
//! A profile carries the credentials and endpoint for one provider account.
//! Profiles are typically loaded from a TOML file owned by the surrounding
//! application; chatloom only reads them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid profile: {0}")]
    Invalid(String),
}

/// Connection settings for one provider account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// Stable identifier, also used as the tool-invocation context id.
    pub id: String,

    /// Display name.
    pub name: String,

    /// API key for the provider.
    pub api_key: String,

    /// Endpoint override; `None` uses the provider's public endpoint.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Disabled profiles must not be used to build transports.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProviderProfile {
    pub fn new(id: impl Into<String>, api_key: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            api_key: api_key.into(),
            base_url: None,
            enabled: true,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Parse a profile from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let profile: Self = toml::from_str(text)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid("profile id must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal_profile() {
        let profile = ProviderProfile::from_toml_str(
            r#"
            id = "gemini-main"
            name = "Gemini"
            api_key = "test-key"
            "#,
        )
        .unwrap();
        assert_eq!(profile.id, "gemini-main");
        assert!(profile.enabled);
        assert!(profile.base_url.is_none());
    }

    #[test]
    fn parse_full_profile() {
        let profile = ProviderProfile::from_toml_str(
            r#"
            id = "gemini-proxy"
            name = "Gemini via proxy"
            api_key = "test-key"
            base_url = "https://proxy.example.com/v1beta"
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(
            profile.base_url.as_deref(),
            Some("https://proxy.example.com/v1beta")
        );
        assert!(!profile.enabled);
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = ProviderProfile::from_toml_str(
            r#"
            id = ""
            name = "x"
            api_key = "k"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id = \"g\"\nname = \"G\"\napi_key = \"k\"").unwrap();
        let profile = ProviderProfile::load(file.path()).unwrap();
        assert_eq!(profile.id, "g");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ProviderProfile::load("/nonexistent/profile.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
