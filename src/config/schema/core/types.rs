use super::super::{LoggingConfig, MetricsConfig, PipelineConfig, SinksConfig, StorageConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sinks: SinksConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.toml"),
            pipeline: PipelineConfig::default(),
            metrics: MetricsConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            sinks: SinksConfig::default(),
        }
    }
}
