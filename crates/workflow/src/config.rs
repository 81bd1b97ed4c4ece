//! Engine configuration.
//!
//! Plain struct with builder methods; can also be read from TOML:
//!
//! ```toml
//! delta_f = 0.02
//! warn_no_verification = false
//! bound_tolerance = 1e-9
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Configuration for an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Composition discrepancy δ_F added once per junction between steps.
    /// Zero assumes a strict functor.
    pub delta_f: f64,
    /// Report unverified paths through the hook.
    pub warn_no_verification: bool,
    /// Slack allowed when comparing measured error against the bound.
    pub bound_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delta_f: 0.0,
            warn_no_verification: true,
            bound_tolerance: 1e-9,
        }
    }
}

impl EngineConfig {
    /// Set the composition discrepancy.
    pub fn with_delta_f(mut self, delta_f: f64) -> Self {
        self.delta_f = delta_f;
        self
    }

    /// Enable or disable the unverified-path warning.
    pub fn with_warnings(mut self, enabled: bool) -> Self {
        self.warn_no_verification = enabled;
        self
    }

    pub fn with_bound_tolerance(mut self, tolerance: f64) -> Self {
        self.bound_tolerance = tolerance;
        self
    }

    /// Parse and validate a TOML table. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, WorkflowError> {
        let config: Self = toml::from_str(source).map_err(|e| WorkflowError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| WorkflowError::InvalidConfig {
            reason: format!("{}: {e}", path.display()),
        })?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String, WorkflowError> {
        toml::to_string(self).map_err(|e| WorkflowError::InvalidConfig {
            reason: e.to_string(),
        })
    }

    /// Reject negative or non-finite values.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        check_non_negative("delta_f", self.delta_f)?;
        check_non_negative("bound_tolerance", self.bound_tolerance)
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<(), WorkflowError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(WorkflowError::InvalidConfig {
            reason: format!("{name} must be finite and non-negative, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.delta_f, 0.0);
        assert!(config.warn_no_verification);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_delta_f(0.05)
            .with_warnings(false)
            .with_bound_tolerance(1e-6);
        assert_eq!(config.delta_f, 0.05);
        assert!(!config.warn_no_verification);
        assert_eq!(config.bound_tolerance, 1e-6);
    }

    #[test]
    fn test_partial_toml() {
        let config = EngineConfig::from_toml_str("delta_f = 0.02\n").unwrap();
        assert_eq!(config.delta_f, 0.02);
        assert!(config.warn_no_verification);
        assert_eq!(config.bound_tolerance, 1e-9);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig::default().with_delta_f(0.125).with_warnings(false);
        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_negative_delta() {
        let err = EngineConfig::from_toml_str("delta_f = -0.1").unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidConfig { .. }));
        assert!(err.to_string().contains("delta_f"));
    }

    #[test]
    fn test_rejects_non_finite() {
        let config = EngineConfig::default().with_bound_tolerance(f64::NAN);
        assert!(config.validate().is_err());
        let config = EngineConfig::default().with_delta_f(f64::INFINITY);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            EngineConfig::from_toml_str("delta_f = \"lots\""),
            Err(WorkflowError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EngineConfig::load("/nonexistent/engine.toml"),
            Err(WorkflowError::InvalidConfig { .. })
        ));
    }
}
