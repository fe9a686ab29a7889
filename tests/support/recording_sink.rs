#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pulsegate::config::PipelineConfig;
use pulsegate::pipeline::{Event, EventCategory, ManualClock, Pipeline};
use pulsegate::sinks::Sink;
use pulsegate::storage::{DurableStore, MemoryStore};

/// In-memory sink that records every event it accepts.
pub struct RecordingSink {
    name: String,
    required: EventCategory,
    failing: AtomicBool,
    panicking: AtomicBool,
    enabled: AtomicBool,
    attempts: AtomicUsize,
    events: Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new(name: &str) -> Arc<Self> {
        Self::requiring(name, EventCategory::Essential)
    }

    pub fn requiring(name: &str, required: EventCategory) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            required,
            failing: AtomicBool::new(false),
            panicking: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            attempts: AtomicUsize::new(0),
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panicking: bool) {
        self.panicking.store(panicking, Ordering::SeqCst);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// `send` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|event| event.name().to_string())
            .collect()
    }
}

impl Sink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn required_consent(&self) -> EventCategory {
        self.required
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn send<'a>(
        &'a self,
        event: &'a Event,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.panicking.load(Ordering::SeqCst) {
                panic!("{} blew up", self.name);
            }
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("{} is down", self.name);
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        })
    }
}

pub fn config(batch_cap: usize) -> PipelineConfig {
    PipelineConfig {
        batch_cap,
        debounce_ms: 2000,
        watchdog_interval_secs: 10,
        retry_buffer_factor: 2,
    }
}

/// Pipeline over a fresh in-memory store with a manual clock.
pub fn pipeline(batch_cap: usize, sinks: &[Arc<RecordingSink>]) -> (Pipeline, Arc<dyn DurableStore>) {
    let store: Arc<dyn DurableStore> = Arc::new(MemoryStore::new());
    let pipeline = pipeline_on(batch_cap, Arc::clone(&store), sinks);
    (pipeline, store)
}

pub fn pipeline_on(
    batch_cap: usize,
    store: Arc<dyn DurableStore>,
    sinks: &[Arc<RecordingSink>],
) -> Pipeline {
    let mut builder = Pipeline::builder(config(batch_cap), store)
        .with_clock(Arc::new(ManualClock::new(1_700_000_000_000)));
    for sink in sinks {
        builder = builder.with_sink(Arc::clone(sink) as Arc<dyn Sink>);
    }
    builder.build().expect("pipeline builds inside a runtime")
}
