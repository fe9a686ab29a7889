use super::http::{build_sink_client, is_http_url, send_checked};
use super::traits::{Delivery, Sink};
use crate::config::Ga4Config;
use crate::error::SinkError;
use crate::pipeline::{Event, EventCategory};
use reqwest::Client;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

/// Measurement Protocol accepts at most this many events per request.
const MAX_EVENTS_PER_REQUEST: usize = 25;
const MAX_EVENT_NAME_CHARS: usize = 40;

/// Google Analytics 4 over the Measurement Protocol.
pub struct Ga4Sink {
    measurement_id: String,
    api_secret: String,
    endpoint: String,
    client_id: String,
    enabled: bool,
    client: Client,
}

#[derive(Debug, Serialize)]
struct CollectRequest<'a> {
    client_id: &'a str,
    timestamp_micros: i64,
    events: Vec<CollectEvent>,
}

#[derive(Debug, Serialize)]
struct CollectEvent {
    name: String,
    timestamp_micros: i64,
    params: serde_json::Value,
}

impl CollectEvent {
    fn from_event(event: &Event) -> Self {
        Self {
            name: measurement_event_name(event.name()),
            timestamp_micros: event.timestamp().saturating_mul(1000),
            params: event.properties_json(),
        }
    }
}

/// GA4 event names are letters, digits and underscores, start with a
/// letter and are at most 40 characters.
fn measurement_event_name(name: &str) -> String {
    let mut sanitized: String = name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(MAX_EVENT_NAME_CHARS)
        .collect();
    if !sanitized.starts_with(|c: char| c.is_ascii_alphabetic()) {
        sanitized.insert(0, 'e');
        sanitized.truncate(MAX_EVENT_NAME_CHARS);
    }
    sanitized
}

impl Ga4Sink {
    pub fn new(config: &Ga4Config) -> Self {
        Self {
            measurement_id: config.measurement_id.trim().to_string(),
            api_secret: config.api_secret.trim().to_string(),
            endpoint: config.endpoint.clone(),
            client_id: config.client_id.clone(),
            enabled: config.enabled,
            client: build_sink_client(config.timeout_secs),
        }
    }

    async fn collect(&self, events: &[Event]) -> Result<(), SinkError> {
        let body = CollectRequest {
            client_id: &self.client_id,
            timestamp_micros: events
                .first()
                .map_or(0, |event| event.timestamp().saturating_mul(1000)),
            events: events.iter().map(CollectEvent::from_event).collect(),
        };
        let request = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("measurement_id", self.measurement_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ])
            .json(&body);
        send_checked(self.name(), request).await
    }

    fn configuration_problem(&self) -> Option<&'static str> {
        if self.measurement_id.is_empty() {
            Some("measurement_id is empty")
        } else if self.api_secret.is_empty() {
            Some("api_secret is empty")
        } else if !is_http_url(&self.endpoint) {
            Some("endpoint is not an http(s) URL")
        } else {
            None
        }
    }
}

impl Sink for Ga4Sink {
    fn name(&self) -> &str {
        "ga4"
    }

    fn required_consent(&self) -> EventCategory {
        EventCategory::Analytics
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn initialize(&self) -> bool {
        let Some(reason) = self.configuration_problem() else {
            return true;
        };
        let err = SinkError::NotConfigured {
            sink: self.name().to_string(),
            reason: reason.to_string(),
        };
        tracing::warn!(error = %err, "ga4 sink disabled");
        false
    }

    fn send<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.collect(std::slice::from_ref(event)).await?;
            Ok(())
        })
    }

    fn send_batch<'a>(
        &'a self,
        events: &'a [Event],
    ) -> Pin<Box<dyn Future<Output = Delivery> + Send + 'a>> {
        Box::pin(async move {
            let mut delivery = Delivery::default();
            for chunk in events.chunks(MAX_EVENTS_PER_REQUEST) {
                match self.collect(chunk).await {
                    Ok(()) => delivery.delivered += chunk.len(),
                    Err(e) => {
                        tracing::warn!(sink = self.name(), count = chunk.len(), error = %e, "ga4 collect failed");
                        delivery.failed += chunk.len();
                    }
                }
            }
            delivery
        })
    }
}
