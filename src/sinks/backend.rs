use super::http::{build_sink_client, is_http_url, send_checked};
use super::traits::{Delivery, Sink};
use crate::config::BackendSinkConfig;
use crate::error::SinkError;
use crate::pipeline::{Event, EventCategory, Properties};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

/// First-party event store over HTTP. Only needs essential consent.
pub struct BackendSink {
    endpoint: String,
    api_key: Option<String>,
    enabled: bool,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GroupPayload<'a> {
    event_name: &'a str,
    events: Vec<EventRecord<'a>>,
}

#[derive(Debug, Serialize)]
struct EventRecord<'a> {
    id: Uuid,
    timestamp: i64,
    category: EventCategory,
    properties: &'a Properties,
}

impl<'a> From<&'a Event> for EventRecord<'a> {
    fn from(event: &'a Event) -> Self {
        Self {
            id: event.id(),
            timestamp: event.timestamp(),
            category: event.category(),
            properties: event.properties(),
        }
    }
}

impl BackendSink {
    pub fn new(config: &BackendSinkConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            enabled: config.enabled,
            client: build_sink_client(config.timeout_secs),
        }
    }

    async fn post_group(&self, event_name: &str, events: &[&Event]) -> Result<(), SinkError> {
        let payload = GroupPayload {
            event_name,
            events: events.iter().map(|event| EventRecord::from(*event)).collect(),
        };

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key).header("apikey", key);
        }
        send_checked(self.name(), request).await
    }
}

impl Sink for BackendSink {
    fn name(&self) -> &str {
        "backend"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn initialize(&self) -> bool {
        if is_http_url(&self.endpoint) {
            return true;
        }
        let err = SinkError::NotConfigured {
            sink: self.name().to_string(),
            reason: format!("endpoint {:?} is not an http(s) URL", self.endpoint),
        };
        tracing::warn!(error = %err, "backend sink disabled");
        false
    }

    fn send<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.post_group(event.name(), &[event]).await?;
            Ok(())
        })
    }

    /// One request per event name, so the store can route each group to
    /// its own table.
    fn send_batch<'a>(
        &'a self,
        events: &'a [Event],
    ) -> Pin<Box<dyn Future<Output = Delivery> + Send + 'a>> {
        Box::pin(async move {
            let mut groups: BTreeMap<&str, Vec<&Event>> = BTreeMap::new();
            for event in events {
                groups.entry(event.name()).or_default().push(event);
            }

            let mut delivery = Delivery::default();
            for (name, group) in groups {
                match self.post_group(name, &group).await {
                    Ok(()) => delivery.delivered += group.len(),
                    Err(e) => {
                        tracing::warn!(
                            sink = self.name(),
                            event = name,
                            count = group.len(),
                            error = %e,
                            "backend group rejected"
                        );
                        delivery.failed += group.len();
                    }
                }
            }
            delivery
        })
    }
}
