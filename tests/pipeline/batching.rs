use std::time::Duration;

use pulsegate::pipeline::{EventCategory, LifecycleSignal, Properties, TrackOptions};

use super::recording_sink::{RecordingSink, pipeline};

fn essential() -> TrackOptions {
    TrackOptions::category(EventCategory::Essential)
}

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn exactly_cap_pushes_flush_immediately() {
    let sink = RecordingSink::new("sink");
    let (pipeline, _store) = pipeline(5, &[sink.clone()]);

    for i in 0..5 {
        pipeline.track_event(&format!("e{i}"), Properties::new(), essential());
    }
    assert_eq!(pipeline.pending(), 0);
    settle().await;
    assert_eq!(sink.names(), ["e0", "e1", "e2", "e3", "e4"]);
}

#[tokio::test(start_paused = true)]
async fn cap_minus_one_pushes_wait_for_debounce() {
    let sink = RecordingSink::new("sink");
    let (pipeline, _store) = pipeline(5, &[sink.clone()]);

    for i in 0..4 {
        pipeline.track_event(&format!("e{i}"), Properties::new(), essential());
    }
    settle().await;
    assert!(sink.events().is_empty());
    assert_eq!(pipeline.pending(), 4);

    tokio::time::sleep(Duration::from_millis(2_001)).await;
    settle().await;
    assert_eq!(sink.events().len(), 4);
    assert_eq!(pipeline.pending(), 0);
}

#[tokio::test]
async fn flush_twice_dispatches_once() {
    let sink = RecordingSink::new("sink");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);
    pipeline.track_event("only", Properties::new(), essential());

    let first = pipeline.flush_events();
    let second = pipeline.flush_events();
    assert!(first.is_some());
    assert!(second.is_none());

    let report = first.unwrap().wait().await.unwrap();
    assert_eq!(report.events, 1);
    assert_eq!(sink.attempts(), 1);
    assert_eq!(pipeline.stats().batches_dispatched, 1);
}

#[tokio::test]
async fn flush_of_empty_pipeline_is_noop() {
    let sink = RecordingSink::new("sink");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);
    assert!(pipeline.flush_events().is_none());
    assert!(pipeline.flush_and_wait(Duration::from_secs(1)).await.is_none());
    assert_eq!(sink.attempts(), 0);
}

#[tokio::test]
async fn flush_and_wait_returns_report() {
    let sink = RecordingSink::new("sink");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);
    pipeline.track_event("a", Properties::new(), essential());
    pipeline.track_event("b", Properties::new(), essential());

    let report = pipeline
        .flush_and_wait(Duration::from_secs(5))
        .await
        .expect("delivery finishes in time");
    assert_eq!(report.delivered(), 2);
    assert!(!report.is_total_failure());
}

#[tokio::test]
async fn every_event_is_delivered_once_across_batches() {
    let sink = RecordingSink::new("sink");
    let (pipeline, _store) = pipeline(3, &[sink.clone()]);

    for i in 0..7 {
        pipeline.track_event(&format!("e{i}"), Properties::new(), essential());
    }
    pipeline.flush_events().unwrap().wait().await.unwrap();
    assert!(pipeline.shutdown(Duration::from_secs(1)).await);

    let mut names = sink.names();
    names.sort_by_key(|name| name[1..].parse::<u32>().unwrap());
    let expected: Vec<String> = (0..7).map(|i| format!("e{i}")).collect();
    assert_eq!(names, expected);
    assert_eq!(pipeline.stats().batches_dispatched, 3);
}

#[tokio::test]
async fn page_hide_flushes_pending_events() {
    let sink = RecordingSink::new("sink");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);
    pipeline.track_event("scroll_depth", Properties::new(), essential());

    let handle = pipeline
        .handle_lifecycle(LifecycleSignal::PageHide)
        .expect("pending event flushed");
    handle.wait_timeout(Duration::from_secs(1)).await.unwrap();
    assert_eq!(sink.names(), ["scroll_depth"]);
}

#[tokio::test]
async fn shutdown_delivers_whatever_is_buffered() {
    let sink = RecordingSink::new("sink");
    let (pipeline, _store) = pipeline(10, &[sink.clone()]);
    pipeline.track_event("last", Properties::new(), essential());

    assert!(pipeline.shutdown(Duration::from_secs(1)).await);
    assert_eq!(sink.names(), ["last"]);
}
