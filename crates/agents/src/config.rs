//! Runtime configuration.
//!
//! Settings load from an optional TOML file, then `APEX_*` environment
//! variables override individual fields. Everything has a default so a
//! bare `apex` invocation works against a local endpoint.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/v1".to_string(),
            api_key: None,
            model: "default".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

impl RuntimeConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        debug!(endpoint = %config.endpoint, model = %config.model, "config loaded");
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = std::env::var("APEX_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(api_key) = std::env::var("APEX_API_KEY") {
            self.api_key = Some(api_key);
        }
        if let Ok(model) = std::env::var("APEX_MODEL") {
            self.model = model;
        }
        if let Ok(raw) = std::env::var("APEX_TEMPERATURE") {
            self.temperature = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "APEX_TEMPERATURE".to_string(),
                value: raw,
            })?;
        }
        if let Ok(raw) = std::env::var("APEX_TIMEOUT_SECS") {
            self.timeout_secs = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "APEX_TIMEOUT_SECS".to_string(),
                value: raw,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    // Env-var tests mutate process state; they only set variables that
    // no other test reads.

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.endpoint, "http://localhost:8080/v1");
        assert_eq!(config.timeout_secs, 120);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "endpoint = \"https://api.example.com/v1\"\nmodel = \"big-model\"\ntemperature = 0.2"
        )
        .unwrap();

        let config = RuntimeConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.endpoint, "https://api.example.com/v1");
        assert_eq!(config.model, "big-model");
        assert!((config.temperature - 0.2).abs() < f64::EPSILON);
        // Unspecified fields keep their defaults.
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_load_missing_file_errors() {
        let err = RuntimeConfig::load(Some(Path::new("/nonexistent/apex.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_file_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoint = [not toml").unwrap();
        let err = RuntimeConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
