use std::sync::Arc;

use pulsegate::pipeline::{Event, EventCategory, PersistentMetricStore, Properties, TrackOptions};
use pulsegate::storage::{DurableStore, FileStore};
use tempfile::TempDir;

use super::recording_sink::{RecordingSink, pipeline_on};

fn metric(i: i64) -> Event {
    Event::new(format!("metric_{i}"), EventCategory::Essential, i)
        .unwrap()
        .persisted(true)
}

#[test]
fn store_keeps_most_recent_hundred_across_sessions() {
    let dir = TempDir::new().unwrap();
    let mut saved = 0;

    // Several short sessions, each with its own store handle.
    for session in 0..8 {
        let store: Arc<dyn DurableStore> = Arc::new(FileStore::new(dir.path()));
        let metrics = PersistentMetricStore::new(store, 100);
        for _ in 0..15 {
            if saved == 120 {
                break;
            }
            metrics.save(&metric(saved)).unwrap();
            saved += 1;
        }
        if session == 0 {
            assert_eq!(metrics.load_all().len(), 15);
        }
    }
    assert_eq!(saved, 120);

    let store: Arc<dyn DurableStore> = Arc::new(FileStore::new(dir.path()));
    let all = PersistentMetricStore::new(store, 100).load_all();
    assert_eq!(all.len(), 100);
    assert_eq!(all.first().unwrap().name(), "metric_20");
    assert_eq!(all.last().unwrap().name(), "metric_119");
}

#[tokio::test]
async fn persisted_metrics_survive_restart_and_replay_once() {
    let dir = TempDir::new().unwrap();
    let first_sink = RecordingSink::new("sink");

    let original = {
        let store: Arc<dyn DurableStore> = Arc::new(FileStore::new(dir.path()));
        let pipeline = pipeline_on(10, store, &[first_sink.clone()]);
        let mut props = Properties::new();
        props.insert("value_ms".into(), 1234.into());
        pipeline.track_event(
            "largest_contentful_paint",
            props,
            TrackOptions::category(EventCategory::Essential).persistent(),
        );
        pipeline.track_event(
            "ephemeral",
            Properties::new(),
            TrackOptions::category(EventCategory::Essential),
        );
        assert!(pipeline.shutdown(std::time::Duration::from_secs(1)).await);
        first_sink.events()[0].clone()
    };

    let second_sink = RecordingSink::new("sink");
    let store: Arc<dyn DurableStore> = Arc::new(FileStore::new(dir.path()));
    let pipeline = pipeline_on(10, Arc::clone(&store), &[second_sink.clone()]);

    assert_eq!(pipeline.replay_persisted(), 1);
    assert_eq!(pipeline.replay_persisted(), 0, "replay happens once per session");
    assert!(pipeline.metric_store().load_all().is_empty());

    pipeline.flush_events().unwrap().wait().await.unwrap();
    let replayed = second_sink.events();
    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed[0].id(), original.id());
    assert_eq!(replayed[0].timestamp(), original.timestamp());
    assert_eq!(replayed[0].properties(), original.properties());
    assert!(!replayed[0].is_persistent());
    assert!(
        PersistentMetricStore::new(store, 100).load_all().is_empty(),
        "replayed metrics are not persisted again"
    );
    assert_eq!(pipeline.stats().replayed, 1);
}

#[tokio::test]
async fn replay_still_respects_consent() {
    let dir = TempDir::new().unwrap();
    let store: Arc<dyn DurableStore> = Arc::new(FileStore::new(dir.path()));
    let metrics = PersistentMetricStore::new(Arc::clone(&store), 100);
    metrics
        .save(
            &Event::new("ad_click", EventCategory::Marketing, 5)
                .unwrap()
                .persisted(true),
        )
        .unwrap();

    let sink = RecordingSink::new("sink");
    let pipeline = pipeline_on(10, store, &[sink.clone()]);
    assert_eq!(pipeline.replay_persisted(), 0);
    assert_eq!(pipeline.stats().dropped_consent, 1);
    assert!(pipeline.metric_store().load_all().is_empty());
}
