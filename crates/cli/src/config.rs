//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_SCHEMA_PATH: &str = "artifacts/encoded_columns.txt";
pub const DEFAULT_MODEL_DIR: &str = "artifacts/models";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Server URL for remote commands
    pub api_url: Option<String>,
    /// Schema file for local commands
    pub schema_path: Option<PathBuf>,
    /// Artifact directory for local commands
    pub model_dir: Option<PathBuf>,
    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from `path`, or the default location when `None`.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))
    }

    /// Get the default configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("netclass").join("config.json"))
    }

    pub fn api_url(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn schema_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.schema_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_PATH))
    }

    pub fn model_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.model_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("config.json"))).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.api_url(None), DEFAULT_API_URL);
        assert_eq!(config.model_dir(None), PathBuf::from(DEFAULT_MODEL_DIR));
    }

    #[test]
    fn test_file_values_and_flag_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_url": "http://classifier:5000", "model_dir": "/srv/models"}"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(config.api_url(None), "http://classifier:5000");
        assert_eq!(config.api_url(Some("http://other:1")), "http://other:1");
        assert_eq!(config.model_dir(None), PathBuf::from("/srv/models"));
        assert_eq!(config.schema_path(None), PathBuf::from(DEFAULT_SCHEMA_PATH));
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(Config::load(Some(&path)).is_err());
    }
}
