use super::Config;
use crate::error::ConfigError;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_cap == 0 {
            return Err(ConfigError::Validation(
                "pipeline.batch_cap must be greater than 0".into(),
            ));
        }
        if self.pipeline.retry_buffer_factor == 0 {
            return Err(ConfigError::Validation(
                "pipeline.retry_buffer_factor must be greater than 0".into(),
            ));
        }
        if self.metrics.cap == 0 {
            return Err(ConfigError::Validation(
                "metrics.cap must be greater than 0".into(),
            ));
        }
        for (label, endpoint) in self.sinks.endpoints() {
            let parsed = url::Url::parse(endpoint)
                .map_err(|e| ConfigError::Validation(format!("{label} is not a valid URL: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Validation(format!(
                    "{label} must use http or https, got {}",
                    parsed.scheme()
                )));
            }
        }
        Ok(())
    }
}
