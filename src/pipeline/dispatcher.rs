use super::buffer::Batch;
use super::consent::{ConsentGate, ConsentRecord};
use crate::sinks::{Delivery, Sink};
use futures_util::FutureExt;
use futures_util::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SinkStatus {
    /// Disabled, or consent for its category is missing.
    Skipped,
    Delivered,
    Partial,
    Failed,
    Panicked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOutcome {
    pub sink: String,
    pub status: SinkStatus,
    pub delivered: usize,
    pub failed: usize,
}

impl SinkOutcome {
    fn skipped(sink: &str) -> Self {
        Self {
            sink: sink.to_string(),
            status: SinkStatus::Skipped,
            delivered: 0,
            failed: 0,
        }
    }

    fn from_delivery(sink: &str, delivery: Delivery) -> Self {
        let status = match (delivery.delivered, delivery.failed) {
            (_, 0) => SinkStatus::Delivered,
            (0, _) => SinkStatus::Failed,
            _ => SinkStatus::Partial,
        };
        Self {
            sink: sink.to_string(),
            status,
            delivered: delivery.delivered,
            failed: delivery.failed,
        }
    }

    pub fn was_attempted(&self) -> bool {
        self.status != SinkStatus::Skipped
    }
}

/// Per-sink results for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub batch_id: Uuid,
    pub events: usize,
    pub outcomes: Vec<SinkOutcome>,
}

impl DispatchReport {
    pub fn outcome(&self, sink: &str) -> Option<&SinkOutcome> {
        self.outcomes.iter().find(|o| o.sink == sink)
    }

    /// At least one sink was tried and none of them took a single event.
    pub fn is_total_failure(&self) -> bool {
        let mut attempted = self.outcomes.iter().filter(|o| o.was_attempted()).peekable();
        attempted.peek().is_some() && attempted.all(|o| o.delivered == 0)
    }

    pub fn delivered(&self) -> usize {
        self.outcomes.iter().map(|o| o.delivered).sum()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().map(|o| o.failed).sum()
    }
}

/// Fans batches out to registered sinks. One sink failing, erroring or
/// panicking never affects another, and `dispatch` itself cannot fail.
#[derive(Default)]
pub struct SinkDispatcher {
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
}

impl SinkDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize and add `sink`. Returns false if initialization failed.
    pub fn register(&self, sink: Arc<dyn Sink>) -> bool {
        if !sink.initialize() {
            tracing::warn!(sink = sink.name(), "sink failed to initialize, not registered");
            return false;
        }
        tracing::debug!(sink = sink.name(), "sink registered");
        self.sinks
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(sink);
        true
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|sink| sink.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn Sink>> {
        self.sinks
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub async fn dispatch(&self, batch: &Batch, consent: Option<ConsentRecord>) -> DispatchReport {
        let sinks = self.snapshot();
        let events = batch.events();

        let deliveries = sinks.iter().map(|sink| {
            // Decided once, before any event of the batch is sent.
            let enabled = sink.is_enabled()
                && ConsentGate::allows(sink.required_consent(), consent.as_ref());
            async move {
                let name = sink.name();
                if !enabled || events.is_empty() {
                    return SinkOutcome::skipped(name);
                }
                match AssertUnwindSafe(async { sink.send_batch(events).await })
                    .catch_unwind()
                    .await
                {
                    Ok(delivery) => SinkOutcome::from_delivery(name, delivery),
                    Err(_) => {
                        tracing::error!(sink = name, batch_id = %batch.id(), "sink panicked during delivery");
                        SinkOutcome {
                            sink: name.to_string(),
                            status: SinkStatus::Panicked,
                            delivered: 0,
                            failed: events.len(),
                        }
                    }
                }
            }
        });

        let outcomes = join_all(deliveries).await;
        DispatchReport {
            batch_id: batch.id(),
            events: events.len(),
            outcomes,
        }
    }
}
