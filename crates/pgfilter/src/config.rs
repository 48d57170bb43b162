//! Builder configuration.
//!
//! Usually embedded in a service's own TOML config:
//!
//! ```toml
//! unknown_operator = "reject"
//! max_depth = 16
//! ```

use crate::error::{FilterError, FilterResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What to do with an operator token outside the supported set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOperatorPolicy {
    /// Compare with null-aware equality and report a warning.
    #[default]
    Equality,
    /// Fail compilation with [`FilterError::UnknownOperator`].
    Reject,
}

/// Knobs for where-clause compilation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub unknown_operator: UnknownOperatorPolicy,
    /// Maximum combinator nesting depth.
    pub max_depth: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            unknown_operator: UnknownOperatorPolicy::Equality,
            max_depth: 32,
        }
    }
}

impl BuilderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unknown_operator(mut self, policy: UnknownOperatorPolicy) -> Self {
        self.unknown_operator = policy;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(raw: &str) -> FilterResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> FilterResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FilterError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> FilterResult<()> {
        if self.max_depth == 0 {
            return Err(FilterError::Config("max_depth must be at least 1".to_string()));
        }
        Ok(())
    }
}
