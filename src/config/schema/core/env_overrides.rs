use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(cap) = std::env::var("PULSEGATE_BATCH_CAP")
            && let Ok(cap) = cap.trim().parse::<usize>()
            && cap > 0
        {
            self.pipeline.batch_cap = cap;
        }

        if let Ok(ms) = std::env::var("PULSEGATE_DEBOUNCE_MS")
            && let Ok(ms) = ms.trim().parse::<u64>()
        {
            self.pipeline.debounce_ms = ms;
        }

        if let Ok(dir) = std::env::var("PULSEGATE_STORE_DIR")
            && !dir.is_empty()
        {
            self.storage.dir = dir;
        }

        if let Ok(level) = std::env::var("PULSEGATE_LOG_LEVEL")
            && !level.is_empty()
        {
            self.logging.level = level;
        }

        if let Ok(url) = std::env::var("PULSEGATE_BACKEND_URL")
            && !url.is_empty()
        {
            match self.sinks.backend.as_mut() {
                Some(backend) => backend.endpoint = url,
                None => {
                    self.sinks.backend = Some(crate::config::BackendSinkConfig {
                        endpoint: url,
                        api_key: None,
                        timeout_secs: 10,
                        enabled: true,
                    });
                }
            }
        }

        if let (Ok(measurement_id), Ok(api_secret)) = (
            std::env::var("PULSEGATE_GA4_MEASUREMENT_ID"),
            std::env::var("PULSEGATE_GA4_API_SECRET"),
        ) && !measurement_id.is_empty()
            && !api_secret.is_empty()
        {
            match self.sinks.ga4.as_mut() {
                Some(ga4) => {
                    ga4.measurement_id = measurement_id;
                    ga4.api_secret = api_secret;
                }
                None => {
                    self.sinks.ga4 = Some(crate::config::Ga4Config {
                        measurement_id,
                        api_secret,
                        endpoint: "https://www.google-analytics.com/mp/collect".into(),
                        client_id: uuid::Uuid::new_v4().to_string(),
                        timeout_secs: 10,
                        enabled: true,
                    });
                }
            }
        }
    }
}
