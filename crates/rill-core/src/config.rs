//! Run configuration for a [`Model`](crate::model::Model).
//!
//! Loaded from TOML, or from JSON with the `json` feature:
//!
//! ```toml
//! name = "upper basin"
//! timesteps = 365
//! scenarios = 10
//! ```

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[cfg(feature = "json")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// How long a model runs and over how many scenarios.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Number of time steps per run.
    #[serde(default = "default_one")]
    pub timesteps: usize,
    /// Number of scenarios simulated side by side.
    #[serde(default = "default_one")]
    pub scenarios: usize,
}

fn default_one() -> usize {
    1
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: None,
            timesteps: 1,
            scenarios: 1,
        }
    }
}

impl ModelConfig {
    pub fn new(timesteps: usize, scenarios: usize) -> Self {
        Self {
            name: None,
            timesteps,
            scenarios,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    #[cfg(feature = "json")]
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: ModelConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timesteps == 0 {
            return Err(ConfigError::Invalid("timesteps must be at least 1".into()));
        }
        if self.scenarios == 0 {
            return Err(ConfigError::Invalid("scenarios must be at least 1".into()));
        }
        Ok(())
    }
}
