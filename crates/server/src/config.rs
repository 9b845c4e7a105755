//! Server configuration

use anyhow::{Context, Result};
use classifier_lib::store::ArtifactPaths;
use serde::Deserialize;
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Service name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Ordered list of encoded feature columns, one per line
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,

    /// Directory holding scaler.json and the three model artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

fn default_service_name() -> String {
    "netclass".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("artifacts/encoded_columns.txt")
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("artifacts/models")
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            bind_address: default_bind_address(),
            port: default_port(),
            schema_path: default_schema_path(),
            model_dir: default_model_dir(),
            log_format: default_log_format(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional `netclass.*` file and `NETCLASS_*` variables
    pub fn load() -> Result<Self> {
        Self::load_from(
            config::File::with_name("netclass").required(false),
            config::Environment::with_prefix("NETCLASS"),
        )
    }

    fn load_from(
        file: config::File<config::FileSourceFile, config::FileFormat>,
        env: config::Environment,
    ) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(file)
            .add_source(env)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.model_dir)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
