use super::traits::Sink;
use crate::pipeline::Event;
use std::future::Future;
use std::pin::Pin;
use tracing::info;

/// Log-based sink — writes every event through tracing, no network
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn send<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            info!(
                id = %event.id(),
                event = event.name(),
                category = %event.category(),
                timestamp = event.timestamp(),
                properties = %event.properties_json(),
                "event.delivered"
            );
            Ok(())
        })
    }
}
