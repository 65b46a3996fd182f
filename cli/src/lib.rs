use std::fs;
use std::path::Path;

use annotate_common::LayerConfig;
use annotate_core::DEFAULT_UNDO_CAPACITY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Session configuration file: the layer taxonomy plus engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(flatten)]
    pub layers: LayerConfig,

    #[serde(default = "default_undo_capacity")]
    pub undo_capacity: usize,
}

fn default_undo_capacity() -> usize {
    DEFAULT_UNDO_CAPACITY
}

impl SessionConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    /// Convert the configuration to a JSON string
    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }

    /// Save the configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CliError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_config_with_defaults() {
        let config = SessionConfig::from_json(
            r#"{"layers": {"dog": {"corgi": {}}, "cat": {}}}"#,
        )
        .unwrap();
        assert_eq!(config.layers.layers.flatten(), vec!["dog", "corgi", "cat"]);
        assert_eq!(config.undo_capacity, DEFAULT_UNDO_CAPACITY);
    }

    #[test]
    fn explicit_undo_capacity_round_trips() {
        let config = SessionConfig::from_json(
            r#"{"layers": {"a": {}}, "undo_capacity": 12}"#,
        )
        .unwrap();
        assert_eq!(config.undo_capacity, 12);

        let json = config.to_json().unwrap();
        let parsed = SessionConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            SessionConfig::from_file("layers.yaml"),
            Err(CliError::UnsupportedFileFormat)
        ));
    }
}
