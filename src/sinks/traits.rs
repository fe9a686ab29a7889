use crate::pipeline::{Event, EventCategory};
use std::future::Future;
use std::pin::Pin;

/// How many events of a batch one sink accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Core sink trait — implement for any downstream destination
pub trait Sink: Send + Sync {
    /// Human-readable sink name
    fn name(&self) -> &str;

    /// Consent category that must be granted before this sink sees any
    /// event. First-party storage needs only essential consent.
    fn required_consent(&self) -> EventCategory {
        EventCategory::Essential
    }

    /// Whether the sink is configured and willing to receive events.
    /// Consulted once per batch.
    fn is_enabled(&self) -> bool {
        true
    }

    /// One-time setup at registration. Returning false keeps the sink out
    /// of the dispatcher.
    fn initialize(&self) -> bool {
        true
    }

    /// Deliver a single event
    fn send<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

    /// Deliver a whole batch. The default sends event by event and keeps
    /// going past failures.
    fn send_batch<'a>(
        &'a self,
        events: &'a [Event],
    ) -> Pin<Box<dyn Future<Output = Delivery> + Send + 'a>> {
        Box::pin(async move {
            let mut delivery = Delivery::default();
            for event in events {
                match self.send(event).await {
                    Ok(()) => delivery.delivered += 1,
                    Err(e) => {
                        tracing::warn!(
                            sink = self.name(),
                            event = event.name(),
                            error = %e,
                            "sink send failed"
                        );
                        delivery.failed += 1;
                    }
                }
            }
            delivery
        })
    }
}
