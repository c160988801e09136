//! # Flowstate Configuration
//!
//! YAML configuration with per-environment overrides. The core consumes, never
//! owns, these values: executor limits, notification bus tuning, and the
//! constructor-time parameters of each processor stage.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use flowstate_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let stage = manager.stage_config("prefixer");
//! let bulk = stage.supports_bulk;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::system;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring flowstate-config.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FlowstateConfig {
    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Processor stage settings keyed by stage name
    #[serde(default)]
    pub processors: HashMap<String, StageConfig>,
}

impl FlowstateConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.execution.max_concurrent_steps == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.max_concurrent_steps",
                "0",
                "must allow at least one concurrent step",
            ));
        }

        if self.notifications.slow_handler_threshold_ms == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "notifications.slow_handler_threshold_ms",
                "0",
                "omit the setting to disable slow handler warnings",
            ));
        }

        Ok(())
    }

    /// Settings for the named stage, or defaults when the stage is not configured
    pub fn stage_config(&self, name: &str) -> StageConfig {
        self.processors.get(name).cloned().unwrap_or_default()
    }
}

/// Step execution settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExecutionConfig {
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Upper bound on step instances running at once through `execute_async`
    #[serde(default = "default_max_concurrent_steps")]
    pub max_concurrent_steps: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            max_concurrent_steps: default_max_concurrent_steps(),
        }
    }
}

fn default_environment() -> String {
    system::DEFAULT_ENVIRONMENT.to_string()
}

fn default_max_concurrent_steps() -> usize {
    system::DEFAULT_MAX_CONCURRENT_STEPS
}

/// Notification bus settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Handlers running longer than this are logged; nothing is cancelled
    #[serde(default)]
    pub slow_handler_threshold_ms: Option<u64>,
}

impl NotificationConfig {
    pub fn slow_handler_threshold(&self) -> Option<Duration> {
        self.slow_handler_threshold_ms.map(Duration::from_millis)
    }
}

/// Constructor-time settings of one processor stage
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StageConfig {
    /// Overrides the processor's own bulk capability when set
    #[serde(default)]
    pub supports_bulk: Option<bool>,

    /// Opaque parameters handed to the processor constructor
    #[serde(default)]
    pub params: HashMap<String, Value>,
}

impl StageConfig {
    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_bulk(mut self, supports_bulk: bool) -> Self {
        self.supports_bulk = Some(supports_bulk);
        self
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    pub fn param_bool(&self, name: &str) -> Option<bool> {
        self.params.get(name).and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config_is_valid() {
        let config = FlowstateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.execution.environment, "development");
        assert!(config.notifications.slow_handler_threshold().is_none());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = FlowstateConfig::default();
        config.execution.max_concurrent_steps = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_stage_config_params() {
        let stage = StageConfig::default()
            .with_param("pfx", json!("P-"))
            .with_param("raise_error", json!(true))
            .with_bulk(true);

        assert_eq!(stage.param_str("pfx"), Some("P-"));
        assert_eq!(stage.param_bool("raise_error"), Some(true));
        assert_eq!(stage.supports_bulk, Some(true));
        assert!(stage.param("missing").is_none());
    }

    #[test]
    fn test_unconfigured_stage_gets_defaults() {
        let config = FlowstateConfig::default();
        assert_eq!(config.stage_config("nope"), StageConfig::default());
    }
}
