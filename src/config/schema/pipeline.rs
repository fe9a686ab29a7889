use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Buffered events that force an immediate flush (default: 10)
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,
    /// Debounce before a partial batch is flushed (default: 2000 ms)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Watchdog poll period; 0 disables it (default: 10 s)
    #[serde(default = "default_watchdog_interval_secs")]
    pub watchdog_interval_secs: u64,
    /// Re-queued events may grow the buffer to `batch_cap * factor` (default: 2)
    #[serde(default = "default_retry_buffer_factor")]
    pub retry_buffer_factor: usize,
}

fn default_batch_cap() -> usize {
    10
}

fn default_debounce_ms() -> u64 {
    2000
}

fn default_watchdog_interval_secs() -> u64 {
    10
}

fn default_retry_buffer_factor() -> usize {
    2
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_cap: default_batch_cap(),
            debounce_ms: default_debounce_ms(),
            watchdog_interval_secs: default_watchdog_interval_secs(),
            retry_buffer_factor: default_retry_buffer_factor(),
        }
    }
}

impl PipelineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    pub fn retry_limit(&self) -> usize {
        self.batch_cap.saturating_mul(self.retry_buffer_factor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Persisted metrics kept across restarts (default: 100)
    #[serde(default = "default_metrics_cap")]
    pub cap: usize,
    /// Replay persisted metrics when a pipeline starts (default: true)
    #[serde(default = "default_true")]
    pub replay_on_start: bool,
}

fn default_metrics_cap() -> usize {
    crate::pipeline::DEFAULT_METRICS_CAP
}

fn default_true() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            cap: default_metrics_cap(),
            replay_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "file" | "memory"
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    /// Directory for the file backend; a leading `~` is expanded
    #[serde(default = "default_storage_dir")]
    pub dir: String,
}

fn default_storage_backend() -> String {
    "file".into()
}

fn default_storage_dir() -> String {
    "~/.pulsegate/store".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            dir: default_storage_dir(),
        }
    }
}

impl StorageConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.dir).as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> tracing::Level {
        self.level
            .trim()
            .parse::<tracing::Level>()
            .unwrap_or(tracing::Level::INFO)
    }
}
