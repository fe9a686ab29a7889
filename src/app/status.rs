use crate::config::Config;
use crate::pipeline::{ConsentRecord, Event};

fn flag(on: bool) -> &'static str {
    if on { "granted" } else { "denied" }
}

pub fn render_consent(record: Option<&ConsentRecord>) -> String {
    let Some(record) = record else {
        return "Consent: no decision yet (essential only)".to_string();
    };
    let settings = record.settings;
    [
        "Consent: decided".to_string(),
        "  essential        granted".to_string(),
        format!("  analytics        {}", flag(settings.analytics)),
        format!("  marketing        {}", flag(settings.marketing)),
        format!("  personalization  {}", flag(settings.personalization)),
    ]
    .join("\n")
}

pub fn render_metric(event: &Event) -> String {
    let when = chrono::DateTime::from_timestamp_millis(event.timestamp())
        .map_or_else(|| event.timestamp().to_string(), |dt| dt.to_rfc3339());
    format!(
        "{when}  {}  [{}]  {}",
        event.name(),
        event.category(),
        event.properties_json()
    )
}

pub fn render_status(config: &Config, consent: Option<&ConsentRecord>, persisted: usize) -> String {
    let pipeline = &config.pipeline;
    let sinks = &config.sinks;

    let mut configured = Vec::new();
    if sinks.log {
        configured.push("log".to_string());
    }
    for (name, enabled) in [
        ("backend", sinks.backend.as_ref().map(|s| s.enabled)),
        ("ga4", sinks.ga4.as_ref().map(|s| s.enabled)),
        ("meta_pixel", sinks.meta_pixel.as_ref().map(|s| s.enabled)),
        ("pinterest", sinks.pinterest.as_ref().map(|s| s.enabled)),
    ] {
        match enabled {
            Some(true) => configured.push(name.to_string()),
            Some(false) => configured.push(format!("{name} (disabled)")),
            None => {}
        }
    }

    let mut lines = vec![
        "◆ pulsegate status".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", config.config_path.display()),
        format!(
            "Storage     {} ({})",
            config.storage.backend,
            config.storage.resolved_dir().display()
        ),
        String::new(),
        format!("Batch cap   {}", pipeline.batch_cap),
        format!("Debounce    {} ms", pipeline.debounce_ms),
        format!(
            "Watchdog    {}",
            if pipeline.watchdog_interval_secs == 0 {
                "off".to_string()
            } else {
                format!("every {} s", pipeline.watchdog_interval_secs)
            }
        ),
        format!("Retry limit {} events", pipeline.retry_limit()),
        format!(
            "Sinks       {}",
            if configured.is_empty() {
                "(none)".to_string()
            } else {
                configured.join(", ")
            }
        ),
        format!("Persisted   {persisted} / {} metric(s)", config.metrics.cap),
        String::new(),
    ];
    lines.push(render_consent(consent));
    lines.join("\n")
}
