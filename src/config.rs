//! Generator configuration

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Settings for one generation run
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateConfig {
    /// Directory holding the module files and an optional `instances.json`
    pub input_directory: PathBuf,

    /// Directory output paths are resolved against
    pub output_directory: PathBuf,

    /// Indent JSON output
    pub pretty_json: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            input_directory: PathBuf::from("."),
            output_directory: PathBuf::from("."),
            pretty_json: true,
        }
    }
}

impl GenerateConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string; missing keys keep their defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_input_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_directory = dir.into();
        self
    }

    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    /// Set whether JSON output is indented
    pub fn with_pretty_json(mut self, pretty: bool) -> Self {
        self.pretty_json = pretty;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GenerateConfig::default();
        assert_eq!(config.input_directory, PathBuf::from("."));
        assert_eq!(config.output_directory, PathBuf::from("."));
        assert!(config.pretty_json);
    }

    #[test]
    fn test_builder_pattern() {
        let config = GenerateConfig::new()
            .with_input_directory("modules")
            .with_output_directory("out")
            .with_pretty_json(false);

        assert_eq!(config.input_directory, PathBuf::from("modules"));
        assert_eq!(config.output_directory, PathBuf::from("out"));
        assert!(!config.pretty_json);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = GenerateConfig::from_str("output_directory = \"build\"\n").expect("parse");
        assert_eq!(config.output_directory, PathBuf::from("build"));
        assert_eq!(config.input_directory, PathBuf::from("."));
        assert!(config.pretty_json);
    }

    #[test]
    fn test_invalid_toml_error() {
        let result = GenerateConfig::from_str("this is not valid toml {{{{");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unknown_key_error() {
        let result = GenerateConfig::from_str("pretty = false");
        assert!(result.is_err());
    }
}
