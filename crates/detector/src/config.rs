//! Detector configuration

use anyhow::{Context, Result};
use ids_lib::ReconcilePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Detector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Instance name used in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Address the HTTP API binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP API port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding manifest.json and the artifacts it names
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Reject records that do not match the schema exactly
    #[serde(default)]
    pub strict_features: bool,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "ids-detector".to_string())
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("/var/lib/ids/artifacts")
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            bind_address: default_bind_address(),
            api_port: default_api_port(),
            artifact_dir: default_artifact_dir(),
            strict_features: false,
        }
    }
}

impl DetectorConfig {
    /// Load configuration from `IDS_CONFIG_FILE` (if set) and `IDS_*` env vars
    pub fn load() -> Result<Self> {
        let file = std::env::var("IDS_CONFIG_FILE").ok().map(PathBuf::from);
        Self::load_from(file.as_deref())
    }

    /// Load configuration from an optional file, overridden by `IDS_*` env vars
    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        Self::load_with_env(file, None)
    }

    /// Like `load_from`, reading variables from `env` instead of the process
    /// environment when given
    fn load_with_env(
        file: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("IDS")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    pub fn policy(&self) -> ReconcilePolicy {
        if self.strict_features {
            ReconcilePolicy::Strict
        } else {
            ReconcilePolicy::Lenient
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }
}
