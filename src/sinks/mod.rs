pub mod backend;
pub mod ga4;
pub mod http;
pub mod log;
pub mod pixel;
pub mod traits;

pub use self::log::LogSink;
pub use backend::BackendSink;
pub use ga4::Ga4Sink;
pub use pixel::{PixelProvider, PixelSink};
pub use traits::{Delivery, Sink};

use crate::config::SinksConfig;
use std::sync::Arc;

/// Factory: every sink the config enables, in a stable order
pub fn create_sinks(config: &SinksConfig) -> Vec<Arc<dyn Sink>> {
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();
    if config.log {
        sinks.push(Arc::new(LogSink::new()));
    }
    if let Some(backend) = &config.backend {
        sinks.push(Arc::new(BackendSink::new(backend)));
    }
    if let Some(ga4) = &config.ga4 {
        sinks.push(Arc::new(Ga4Sink::new(ga4)));
    }
    if let Some(meta) = &config.meta_pixel {
        sinks.push(Arc::new(PixelSink::new(PixelProvider::Meta, meta)));
    }
    if let Some(pinterest) = &config.pinterest {
        sinks.push(Arc::new(PixelSink::new(PixelProvider::Pinterest, pinterest)));
    }
    if sinks.is_empty() {
        tracing::warn!("no sinks configured; events will be dropped after flush");
    }
    sinks
}
