use pulsegate::pipeline::{ConsentSettings, EventCategory, Properties, PropertyValue, TrackOptions};

use super::recording_sink::{RecordingSink, pipeline};

fn analytics() -> TrackOptions {
    TrackOptions::category(EventCategory::Analytics)
}

#[tokio::test]
async fn analytics_consent_reaches_analytics_sink_but_not_marketing_sink() {
    let analytics_sink = RecordingSink::requiring("analytics", EventCategory::Analytics);
    let marketing_sink = RecordingSink::requiring("marketing", EventCategory::Marketing);
    let (pipeline, _store) = pipeline(10, &[analytics_sink.clone(), marketing_sink.clone()]);

    pipeline
        .consent_store()
        .save(ConsentSettings {
            analytics: true,
            marketing: false,
            ..ConsentSettings::essential_only()
        })
        .unwrap();

    let mut props = Properties::new();
    props.insert("path".into(), "/".into());
    pipeline.track_event("page_view", props, analytics());
    assert_eq!(pipeline.pending(), 1);

    let report = pipeline.flush_events().unwrap().wait().await.unwrap();
    assert_eq!(analytics_sink.names(), ["page_view"]);
    assert_eq!(
        analytics_sink.events()[0].property("path"),
        Some(&PropertyValue::String("/".into()))
    );
    assert!(marketing_sink.events().is_empty());
    assert_eq!(marketing_sink.attempts(), 0);
    assert!(!report.outcome("marketing").unwrap().was_attempted());
}

#[tokio::test]
async fn banner_event_bypasses_gate_without_any_record() {
    let sink = RecordingSink::new("first-party");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);
    assert!(pipeline.consent().is_none());

    pipeline.track_event(
        "cookie_banner_shown",
        Properties::new(),
        TrackOptions::category(EventCategory::Marketing),
    );
    pipeline.track_event("click", Properties::new(), analytics());

    assert_eq!(pipeline.pending(), 1);
    assert_eq!(pipeline.stats().dropped_consent, 1);

    pipeline.flush_events().unwrap().wait().await.unwrap();
    assert_eq!(sink.names(), ["cookie_banner_shown"]);
}

#[tokio::test]
async fn declined_consent_keeps_only_essential_events() {
    let sink = RecordingSink::new("first-party");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);
    pipeline.consent_store().decline_all().unwrap();

    for category in [
        EventCategory::Essential,
        EventCategory::Analytics,
        EventCategory::Marketing,
        EventCategory::Personalization,
    ] {
        pipeline.track_event(&format!("{category}_event"), Properties::new(), TrackOptions::category(category));
    }

    pipeline.flush_events().unwrap().wait().await.unwrap();
    assert_eq!(sink.names(), ["essential_event"]);
    assert_eq!(pipeline.stats().dropped_consent, 3);
}

#[tokio::test]
async fn consent_granted_later_applies_to_new_events_only() {
    let sink = RecordingSink::new("first-party");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);

    pipeline.track_event("before", Properties::new(), analytics());
    pipeline.update_consent(ConsentSettings::all()).unwrap();
    pipeline.track_event("after", Properties::new(), analytics());

    pipeline.flush_events().unwrap().wait().await.unwrap();
    assert_eq!(sink.names(), ["cookie_consent_updated", "after"]);
}

#[tokio::test]
async fn page_view_is_analytics_with_title_and_path() {
    let sink = RecordingSink::new("first-party");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);
    pipeline.consent_store().accept_all().unwrap();

    pipeline.track_page_view("Pricing", "/pricing", Properties::new());
    pipeline.flush_events().unwrap().wait().await.unwrap();

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name(), "page_view");
    assert_eq!(events[0].category(), EventCategory::Analytics);
    assert_eq!(events[0].property("title").and_then(PropertyValue::as_str), Some("Pricing"));
    assert_eq!(events[0].property("path").and_then(PropertyValue::as_str), Some("/pricing"));
}
