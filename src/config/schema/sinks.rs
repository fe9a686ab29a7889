use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinksConfig {
    /// Echo every delivered event through the log (default: false)
    #[serde(default)]
    pub log: bool,
    #[serde(default)]
    pub backend: Option<BackendSinkConfig>,
    #[serde(default)]
    pub ga4: Option<Ga4Config>,
    #[serde(default)]
    pub meta_pixel: Option<PixelConfig>,
    #[serde(default)]
    pub pinterest: Option<PixelConfig>,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            log: false,
            backend: None,
            ga4: None,
            meta_pixel: None,
            pinterest: None,
        }
    }
}

/// First-party event store reached over HTTP (e.g. a Supabase REST table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSinkConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ga4Config {
    pub measurement_id: String,
    pub api_secret: String,
    #[serde(default = "default_ga4_endpoint")]
    pub endpoint: String,
    /// Stable pseudonymous client id sent with every hit
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelConfig {
    pub pixel_id: String,
    pub endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_ga4_endpoint() -> String {
    "https://www.google-analytics.com/mp/collect".into()
}

fn default_client_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl SinksConfig {
    /// Every configured endpoint, labelled for validation messages.
    pub(crate) fn endpoints(&self) -> Vec<(&'static str, &str)> {
        let mut endpoints = Vec::new();
        if let Some(backend) = &self.backend {
            endpoints.push(("sinks.backend.endpoint", backend.endpoint.as_str()));
        }
        if let Some(ga4) = &self.ga4 {
            endpoints.push(("sinks.ga4.endpoint", ga4.endpoint.as_str()));
        }
        if let Some(meta) = &self.meta_pixel {
            endpoints.push(("sinks.meta_pixel.endpoint", meta.endpoint.as_str()));
        }
        if let Some(pinterest) = &self.pinterest {
            endpoints.push(("sinks.pinterest.endpoint", pinterest.endpoint.as_str()));
        }
        endpoints
    }
}
