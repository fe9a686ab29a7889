use std::time::Duration;

use pulsegate::pipeline::{EventCategory, Properties, SinkStatus, TrackOptions};

use super::recording_sink::{RecordingSink, pipeline};

fn essential() -> TrackOptions {
    TrackOptions::category(EventCategory::Essential)
}

#[tokio::test]
async fn failing_sink_does_not_block_healthy_sink() {
    let healthy = RecordingSink::new("healthy");
    let broken = RecordingSink::new("broken");
    broken.set_failing(true);
    let (pipeline, _store) = pipeline(10, &[broken.clone(), healthy.clone()]);

    for name in ["a", "b", "c"] {
        pipeline.track_event(name, Properties::new(), essential());
    }
    let report = pipeline.flush_events().unwrap().wait().await.unwrap();

    assert_eq!(healthy.names(), ["a", "b", "c"]);
    assert_eq!(broken.attempts(), 3, "every event is attempted on the failing sink");
    assert_eq!(report.outcome("broken").unwrap().status, SinkStatus::Failed);
    assert_eq!(report.outcome("healthy").unwrap().status, SinkStatus::Delivered);
    assert!(!report.is_total_failure());
    assert_eq!(pipeline.pending(), 0, "partial success is not retried");
}

#[tokio::test]
async fn panicking_sink_is_contained() {
    let healthy = RecordingSink::new("healthy");
    let exploding = RecordingSink::new("exploding");
    exploding.set_panicking(true);
    let (pipeline, _store) = pipeline(10, &[exploding.clone(), healthy.clone()]);

    pipeline.track_event("a", Properties::new(), essential());
    let report = pipeline.flush_events().unwrap().wait().await.unwrap();

    assert_eq!(report.outcome("exploding").unwrap().status, SinkStatus::Panicked);
    assert_eq!(healthy.names(), ["a"]);

    pipeline.track_event("b", Properties::new(), essential());
    pipeline.flush_events().unwrap().wait().await.unwrap();
    assert_eq!(healthy.names(), ["a", "b"], "pipeline keeps working after a panic");
}

#[tokio::test]
async fn disabled_sink_is_skipped_for_the_whole_batch() {
    let sink = RecordingSink::new("paused");
    sink.set_enabled(false);
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);

    pipeline.track_event("a", Properties::new(), essential());
    let report = pipeline.flush_events().unwrap().wait().await.unwrap();

    assert_eq!(sink.attempts(), 0);
    assert_eq!(report.outcome("paused").unwrap().status, SinkStatus::Skipped);
    assert!(!report.is_total_failure(), "nothing attempted is not a failure");
    assert_eq!(pipeline.pending(), 0);
}

#[tokio::test]
async fn total_failure_is_retried_once_then_dropped() {
    let sink = RecordingSink::new("down");
    sink.set_failing(true);
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);

    pipeline.track_event("a", Properties::new(), essential());
    pipeline.track_event("b", Properties::new(), essential());

    let report = pipeline.flush_events().unwrap().wait().await.unwrap();
    assert!(report.is_total_failure());
    assert_eq!(pipeline.pending(), 2);

    let report = pipeline.flush_events().unwrap().wait().await.unwrap();
    assert!(report.is_total_failure());
    assert_eq!(pipeline.pending(), 0, "no second automatic retry");

    let stats = pipeline.stats();
    assert_eq!(stats.retry_requeued, 2);
    assert_eq!(stats.retry_dropped, 2);
    assert_eq!(stats.total_failures, 2);
}

#[tokio::test]
async fn retried_batch_is_delivered_once_sink_recovers() {
    let sink = RecordingSink::new("flaky");
    sink.set_failing(true);
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);

    pipeline.track_event("a", Properties::new(), essential());
    let handle = pipeline.flush_events().unwrap();
    pipeline.track_event("b", Properties::new(), essential());
    handle.wait().await.unwrap();

    sink.set_failing(false);
    pipeline.flush_events().unwrap().wait().await.unwrap();
    assert_eq!(sink.names(), ["a", "b"], "retried events go ahead of newer ones");
    assert_eq!(pipeline.stats().events_delivered, 2);
}

#[tokio::test(start_paused = true)]
async fn requeued_events_are_flushed_by_debounce() {
    let sink = RecordingSink::new("flaky");
    sink.set_failing(true);
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);

    pipeline.track_event("a", Properties::new(), essential());
    pipeline.flush_events().unwrap().wait().await.unwrap();
    assert_eq!(pipeline.pending(), 1);

    sink.set_failing(false);
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
    assert_eq!(sink.names(), ["a"]);
    assert_eq!(pipeline.pending(), 0);
}

#[tokio::test]
async fn sink_registered_later_sees_later_batches() {
    let first = RecordingSink::new("first");
    let (pipeline, _store) = pipeline(10, &[first.clone()]);
    pipeline.track_event("a", Properties::new(), essential());
    pipeline.flush_events().unwrap().wait().await.unwrap();

    let second = RecordingSink::new("second");
    assert!(pipeline.register_sink(second.clone()));
    pipeline.track_event("b", Properties::new(), essential());
    pipeline.flush_events().unwrap().wait().await.unwrap();

    assert_eq!(first.names(), ["a", "b"]);
    assert_eq!(second.names(), ["b"]);
    assert_eq!(pipeline.sink_names(), ["first", "second"]);
}
