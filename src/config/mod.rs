pub mod schema;

pub use schema::{
    BackendSinkConfig, Config, Ga4Config, LoggingConfig, MetricsConfig, PipelineConfig,
    PixelConfig, SinksConfig, StorageConfig,
};
