//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Configuration file not found, searched: {searched_paths:?}")]
    ConfigFileNotFound { searched_paths: Vec<PathBuf> },

    #[error("Failed to read configuration file {path}: {reason}")]
    FileReadError { path: String, reason: String },

    #[error("Invalid YAML in {file}: {reason}")]
    InvalidYaml { file: String, reason: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

impl ConfigurationError {
    pub fn config_file_not_found(searched_paths: Vec<PathBuf>) -> Self {
        Self::ConfigFileNotFound { searched_paths }
    }

    pub fn file_read_error(path: impl Into<String>, error: std::io::Error) -> Self {
        Self::FileReadError {
            path: path.into(),
            reason: error.to_string(),
        }
    }

    pub fn invalid_yaml(file: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidYaml {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
