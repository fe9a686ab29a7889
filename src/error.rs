use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `pulsegate`.
///
/// None of these ever reach a `track_event` caller: the pipeline catches
/// them at the lowest level and turns them into log output. They surface
/// only from construction-time APIs (config, stores) and from sink internals.
#[derive(Debug, Error)]
pub enum PulseError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Durable storage ─────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Sinks ───────────────────────────────────────────────────────────
    #[error("sink: {0}")]
    Sink(#[from] SinkError),

    // ── Events ──────────────────────────────────────────────────────────
    #[error("event: {0}")]
    Event(#[from] EventError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Storage errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("quota exceeded writing {key}: needs {needed} bytes, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("invalid key: {0:?}")]
    InvalidKey(String),
}

// ─── Sink errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink {sink} request failed: {message}")]
    Request { sink: String, message: String },

    #[error("sink {sink} rejected payload with HTTP {status}")]
    Status { sink: String, status: u16 },

    #[error("sink {sink} is not configured: {reason}")]
    NotConfigured { sink: String, reason: String },
}

// ─── Event errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("event name must not be empty")]
    EmptyName,
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, PulseError>;
