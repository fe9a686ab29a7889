mod core;
mod pipeline;
mod sinks;

pub use core::Config;
pub use pipeline::{LoggingConfig, MetricsConfig, PipelineConfig, StorageConfig};
pub use sinks::{BackendSinkConfig, Ga4Config, PixelConfig, SinksConfig};
