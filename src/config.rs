//! JSON:API Configuration
//!
//! Link prefix, pagination bounds, include depth and the default filter
//! pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: &'static str, message: String },

    #[error("Unknown filter strategy '{name}' for model '{model}'")]
    UnknownFilterStrategy { model: String, name: String },
}

/// JSON:API layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonApiConfig {
    /// Prefix of every generated link (default: "/api/v1")
    #[serde(default = "default_base_path")]
    pub base_path: String,

    /// Page size when page[limit] is not given (default: 50)
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest accepted page[limit] (default: 1000)
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Relationship levels embedded below a primary resource (default: 5)
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,

    /// Filter pipeline for models without their own (default: exact, match,
    /// expression, query)
    #[serde(default = "default_filters")]
    pub default_filters: Vec<String>,
}

fn default_base_path() -> String {
    "/api/v1".to_string()
}

fn default_limit() -> usize {
    50
}

fn default_max_limit() -> usize {
    1000
}

fn default_max_include_depth() -> usize {
    5
}

fn default_filters() -> Vec<String> {
    vec![
        "exact".to_string(),
        "match".to_string(),
        "expression".to_string(),
        "query".to_string(),
    ]
}

impl Default for JsonApiConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            max_include_depth: default_max_include_depth(),
            default_filters: default_filters(),
        }
    }
}

impl JsonApiConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "default_limit",
                message: "must be greater than 0".to_string(),
            });
        }
        if self.max_limit < self.default_limit {
            return Err(ConfigError::InvalidValue {
                field: "max_limit",
                message: format!("must be at least default_limit ({})", self.default_limit),
            });
        }
        Ok(())
    }

    /// Base path without a trailing slash
    pub fn base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }
}
