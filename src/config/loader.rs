//! Configuration Loader
//!
//! Environment-aware configuration loading: YAML file discovery, environment
//! detection, and merging of the per-environment override section.

use super::error::{ConfigResult, ConfigurationError};
use super::{FlowstateConfig, StageConfig};
use crate::constants::{env as env_vars, system};
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ConfigManager {
    config: FlowstateConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Tests use this to avoid touching process environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config_file = Self::find_config_file(&config_directory)?;
        let yaml_content = Self::read_config_file_safely(&config_file)?;
        let config = Self::parse_with_environment(
            &yaml_content,
            environment,
            &config_file.display().to_string(),
        )?;

        info!(
            environment = %environment,
            config_file = %config_file.display(),
            processors = config.processors.len(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Build a manager from YAML text, e.g. configuration embedded in a host
    pub fn from_yaml_str(yaml: &str, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        let config = Self::parse_with_environment(yaml, environment, "<inline>")?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from(system::DEFAULT_CONFIG_DIRECTORY),
        }))
    }

    /// Manager around an already-built configuration
    pub fn from_config(config: FlowstateConfig) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            environment: config.execution.environment.clone(),
            config,
            config_directory: PathBuf::from(system::DEFAULT_CONFIG_DIRECTORY),
        }))
    }

    pub fn config(&self) -> &FlowstateConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    pub fn stage_config(&self, name: &str) -> StageConfig {
        self.config.stage_config(name)
    }

    /// Detect current environment from environment variables
    fn detect_environment() -> String {
        env::var(env_vars::FLOWSTATE_ENV)
            .or_else(|_| env::var(env_vars::APP_ENV))
            .unwrap_or_else(|_| system::DEFAULT_ENVIRONMENT.to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        env::var(env_vars::FLOWSTATE_CONFIG_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(system::DEFAULT_CONFIG_DIRECTORY))
    }

    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for name in system::CONFIG_FILE_NAMES {
            let config_path = config_directory.join(name);
            searched_paths.push(config_path.clone());

            if config_path.exists() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    fn read_config_file_safely(path: &Path) -> ConfigResult<String> {
        const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

        let metadata = std::fs::metadata(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))?;

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigurationError::invalid_value(
                "file_size",
                metadata.len().to_string(),
                format!("Configuration file exceeds {MAX_CONFIG_FILE_SIZE} bytes"),
            ));
        }

        if !metadata.is_file() {
            return Err(ConfigurationError::invalid_value(
                "file_type",
                "directory or special file",
                "Configuration path must point to a regular file",
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::file_read_error(path.display().to_string(), e))
    }

    /// Parse YAML, fold the section named after `environment` over the base and
    /// deserialize the result
    fn parse_with_environment(
        yaml_content: &str,
        environment: &str,
        source: &str,
    ) -> ConfigResult<FlowstateConfig> {
        let mut yaml_data: YamlValue = serde_yaml::from_str(yaml_content)
            .map_err(|e| ConfigurationError::invalid_yaml(source, e))?;

        if yaml_data.is_null() {
            yaml_data = YamlValue::Mapping(Default::default());
        }

        if let Some(env_overrides) = yaml_data
            .get(YamlValue::String(environment.to_string()))
            .cloned()
        {
            debug!("Applying environment-specific overrides for: {}", environment);
            Self::merge_yaml_values(&mut yaml_data, env_overrides);
        }

        // Remove environment sections to avoid confusion
        if let YamlValue::Mapping(ref mut map) = yaml_data {
            for known in system::KNOWN_ENVIRONMENTS {
                map.remove(YamlValue::String(known.to_string()));
            }
            map.remove(YamlValue::String(environment.to_string()));
        }

        let mut config: FlowstateConfig = serde_yaml::from_value(yaml_data).map_err(|e| {
            ConfigurationError::invalid_yaml(
                source,
                format!("Failed to deserialize configuration: {e}"),
            )
        })?;

        config.execution.environment = environment.to_string();
        config.validate()?;
        Ok(config)
    }

    /// Recursively merge YAML values (environment overrides into base config)
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }
}
