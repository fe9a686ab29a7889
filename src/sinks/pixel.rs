use super::http::{build_sink_client, is_http_url, send_checked};
use super::traits::Sink;
use crate::config::PixelConfig;
use crate::error::SinkError;
use crate::pipeline::{Event, EventCategory};
use reqwest::Client;
use serde::Serialize;
use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;

/// Advertising pixel networks with a server-side conversions endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PixelProvider {
    Meta,
    Pinterest,
}

impl PixelProvider {
    /// Map an event name to the provider's standard event, or pass it
    /// through as a custom event.
    pub fn standard_event_name(self, name: &str) -> Cow<'_, str> {
        let mapped = match (self, name) {
            (Self::Meta, "page_view") => "PageView",
            (Self::Meta, "sign_up" | "signup_completed") => "CompleteRegistration",
            (Self::Meta, "purchase") => "Purchase",
            (Self::Meta, "add_to_cart") => "AddToCart",
            (Self::Meta, "lead" | "generate_lead") => "Lead",
            (Self::Meta, "search") => "Search",
            (Self::Meta, "view_item") => "ViewContent",
            (Self::Pinterest, "page_view") => "pagevisit",
            (Self::Pinterest, "sign_up" | "signup_completed") => "signup",
            (Self::Pinterest, "purchase") => "checkout",
            (Self::Pinterest, "add_to_cart") => "addtocart",
            (Self::Pinterest, "lead" | "generate_lead") => "lead",
            (Self::Pinterest, "search") => "search",
            (Self::Pinterest, "view_item") => "viewcategory",
            _ => return Cow::Owned(name.to_string()),
        };
        Cow::Borrowed(mapped)
    }
}

/// Server-side pixel hit. Needs marketing consent.
pub struct PixelSink {
    provider: PixelProvider,
    pixel_id: String,
    endpoint: String,
    access_token: Option<String>,
    enabled: bool,
    client: Client,
}

#[derive(Debug, Serialize)]
struct PixelHit<'a> {
    pixel_id: &'a str,
    event_name: Cow<'a, str>,
    /// Seconds since the epoch.
    event_time: i64,
    event_id: String,
    custom_data: serde_json::Value,
}

impl PixelSink {
    pub fn new(provider: PixelProvider, config: &PixelConfig) -> Self {
        Self {
            provider,
            pixel_id: config.pixel_id.trim().to_string(),
            endpoint: config.endpoint.clone(),
            access_token: config.access_token.clone().filter(|t| !t.trim().is_empty()),
            enabled: config.enabled,
            client: build_sink_client(config.timeout_secs),
        }
    }

    pub fn provider(&self) -> PixelProvider {
        self.provider
    }

    fn hit<'a>(&'a self, event: &'a Event) -> PixelHit<'a> {
        PixelHit {
            pixel_id: &self.pixel_id,
            event_name: self.provider.standard_event_name(event.name()),
            event_time: event.timestamp().div_euclid(1000),
            event_id: event.id().to_string(),
            custom_data: event.properties_json(),
        }
    }
}

impl Sink for PixelSink {
    fn name(&self) -> &str {
        match self.provider {
            PixelProvider::Meta => "meta_pixel",
            PixelProvider::Pinterest => "pinterest",
        }
    }

    fn required_consent(&self) -> EventCategory {
        EventCategory::Marketing
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn initialize(&self) -> bool {
        let reason = if self.pixel_id.is_empty() {
            "pixel_id is empty"
        } else if !is_http_url(&self.endpoint) {
            "endpoint is not an http(s) URL"
        } else {
            return true;
        };
        let err = SinkError::NotConfigured {
            sink: self.name().to_string(),
            reason: reason.to_string(),
        };
        tracing::warn!(error = %err, "pixel sink disabled");
        false
    }

    fn send<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut request = self.client.post(&self.endpoint).json(&self.hit(event));
            if let Some(token) = &self.access_token {
                request = request.bearer_auth(token);
            }
            send_checked(self.name(), request).await?;
            Ok(())
        })
    }
}
