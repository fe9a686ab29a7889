use super::buffer::{Batch, EventBuffer};
use super::clock::{Clock, SystemClock};
use super::consent::{ConsentGate, ConsentRecord, ConsentSettings, ConsentStore};
use super::dispatcher::{DispatchReport, SinkDispatcher};
use super::event::{Event, EventCategory, Properties, TrackOptions};
use super::metrics::{DEFAULT_METRICS_CAP, PersistentMetricStore};
use super::scheduler::{FlushReason, FlushScheduler, PushAction};
use super::stats::{DropReason, PipelineStats, StatsCounters, bump};
use crate::config::{Config, PipelineConfig};
use crate::error::StoreError;
use crate::sinks::Sink;
use crate::storage::DurableStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

/// Page/app lifecycle notifications that force a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleSignal {
    PageHide,
    Unload,
}

/// Completion of one flushed batch.
///
/// Dropping the handle does not cancel delivery.
pub struct FlushHandle {
    batch_id: Uuid,
    events: usize,
    task: JoinHandle<DispatchReport>,
}

impl FlushHandle {
    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn events(&self) -> usize {
        self.events
    }

    pub async fn wait(self) -> Option<DispatchReport> {
        match self.task.await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!(batch_id = %self.batch_id, error = %e, "flush task did not complete");
                None
            }
        }
    }

    /// Wait at most `timeout`; `None` if delivery is still running.
    pub async fn wait_timeout(self, timeout: Duration) -> Option<DispatchReport> {
        let batch_id = self.batch_id;
        if let Ok(report) = tokio::time::timeout(timeout, self.wait()).await {
            report
        } else {
            tracing::warn!(batch_id = %batch_id, ?timeout, "flush still in flight after timeout");
            None
        }
    }
}

struct Core {
    buffer: EventBuffer,
    scheduler: FlushScheduler,
    timer: Option<AbortHandle>,
}

struct Inner {
    core: Mutex<Core>,
    dispatcher: SinkDispatcher,
    consent: ConsentStore,
    metrics: PersistentMetricStore,
    clock: Arc<dyn Clock>,
    stats: StatsCounters,
    runtime: Handle,
    tasks: TaskTracker,
    shutdown: CancellationToken,
    retry_limit: usize,
    replayed: AtomicBool,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Assembles a [`Pipeline`] from its capabilities.
pub struct PipelineBuilder {
    config: PipelineConfig,
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
    metrics_cap: usize,
    sinks: Vec<Arc<dyn Sink>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig, store: Arc<dyn DurableStore>) -> Self {
        Self {
            config,
            store,
            clock: Arc::new(SystemClock),
            metrics_cap: DEFAULT_METRICS_CAP,
            sinks: Vec::new(),
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn DurableStore>) -> Self {
        Self::new(config.pipeline.clone(), store).with_metrics_cap(config.metrics.cap)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics_cap(mut self, cap: usize) -> Self {
        self.metrics_cap = cap;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_sinks(mut self, sinks: impl IntoIterator<Item = Arc<dyn Sink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    /// Build the pipeline and start its watchdog. Must be called from
    /// within a Tokio runtime; the pipeline keeps a handle to it so that
    /// tracking calls work from any thread afterwards.
    pub fn build(self) -> crate::error::Result<Pipeline> {
        let runtime = Handle::try_current()
            .map_err(|e| anyhow::anyhow!("pipeline requires a Tokio runtime: {e}"))?;

        let now = self.clock.now_millis();
        let scheduler = FlushScheduler::new(
            self.config.batch_cap,
            self.config.debounce(),
            self.config.watchdog_interval(),
            now,
        );
        let retry_limit = self.config.retry_limit().max(scheduler.cap());

        let dispatcher = SinkDispatcher::new();
        for sink in self.sinks {
            dispatcher.register(sink);
        }

        let inner = Arc::new(Inner {
            core: Mutex::new(Core {
                buffer: EventBuffer::new(),
                scheduler,
                timer: None,
            }),
            dispatcher,
            consent: ConsentStore::new(Arc::clone(&self.store)),
            metrics: PersistentMetricStore::new(self.store, self.metrics_cap),
            clock: self.clock,
            stats: StatsCounters::default(),
            runtime,
            tasks: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            retry_limit,
            replayed: AtomicBool::new(false),
        });

        let pipeline = Pipeline { inner };
        pipeline.spawn_watchdog(self.config.watchdog_interval());
        Ok(pipeline)
    }
}

/// Consent-gated event batching pipeline.
///
/// Cheap to clone; every clone drives the same buffer. The tracking calls
/// never fail and never panic: every problem is logged and counted.
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<Inner>,
}

impl Pipeline {
    pub fn builder(config: PipelineConfig, store: Arc<dyn DurableStore>) -> PipelineBuilder {
        PipelineBuilder::new(config, store)
    }

    // ── Public tracking API ─────────────────────────────────────────

    pub fn track_event(&self, name: &str, properties: Properties, options: TrackOptions) {
        let now = self.inner.clock.now_millis();
        let event = match Event::new(name, options.category, now) {
            Ok(event) => event
                .with_properties(properties)
                .persisted(options.persist),
            Err(e) => {
                bump(&self.inner.stats.dropped_invalid, 1);
                tracing::warn!(reason = %DropReason::InvalidEvent, error = %e, "event dropped");
                return;
            }
        };
        self.enqueue(event, options.send_immediately);
    }

    pub fn track_page_view(&self, title: &str, path: &str, mut properties: Properties) {
        properties.insert("title".into(), title.into());
        properties.insert("path".into(), path.into());
        self.track_event(
            "page_view",
            properties,
            TrackOptions::category(EventCategory::Analytics),
        );
    }

    /// Force a flush now. `None` if there was nothing to send.
    pub fn flush_events(&self) -> Option<FlushHandle> {
        self.flush(FlushReason::Manual)
    }

    /// Flush and wait up to `timeout` for every sink to finish.
    pub async fn flush_and_wait(&self, timeout: Duration) -> Option<DispatchReport> {
        self.flush_events()?.wait_timeout(timeout).await
    }

    pub fn handle_lifecycle(&self, signal: LifecycleSignal) -> Option<FlushHandle> {
        tracing::debug!(%signal, "lifecycle signal");
        self.flush(FlushReason::Lifecycle)
    }

    // ── Consent ─────────────────────────────────────────────────────

    pub fn consent(&self) -> Option<ConsentRecord> {
        self.inner.consent.current()
    }

    pub fn consent_store(&self) -> &ConsentStore {
        &self.inner.consent
    }

    /// Save new consent choices and record the change itself.
    pub fn update_consent(&self, settings: ConsentSettings) -> Result<ConsentRecord, StoreError> {
        let record = self.inner.consent.save(settings)?;
        let mut properties = Properties::new();
        properties.insert("analytics".into(), record.settings.analytics.into());
        properties.insert("marketing".into(), record.settings.marketing.into());
        properties.insert(
            "personalization".into(),
            record.settings.personalization.into(),
        );
        self.track_event(
            "cookie_consent_updated",
            properties,
            TrackOptions::category(EventCategory::Essential),
        );
        Ok(record)
    }

    // ── Sinks, metrics, introspection ───────────────────────────────

    pub fn register_sink(&self, sink: Arc<dyn Sink>) -> bool {
        self.inner.dispatcher.register(sink)
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.inner.dispatcher.sink_names()
    }

    pub fn metric_store(&self) -> &PersistentMetricStore {
        &self.inner.metrics
    }

    /// Feed metrics persisted by a previous session back through the
    /// pipeline, then clear them. Runs at most once per pipeline.
    pub fn replay_persisted(&self) -> usize {
        if self.inner.replayed.swap(true, Ordering::SeqCst) {
            return 0;
        }

        let stored = self.inner.metrics.load_all();
        if stored.is_empty() {
            return 0;
        }

        let total = stored.len();
        let mut replayed = 0;
        for event in stored {
            if self.enqueue(event.into_replay(), false) {
                replayed += 1;
            }
        }

        if let Err(e) = self.inner.metrics.clear() {
            bump(&self.inner.stats.persistence_failures, 1);
            tracing::warn!(error = %e, "failed to clear persisted metrics after replay");
        }
        bump(&self.inner.stats.replayed, replayed);
        tracing::info!(total, replayed, "replayed persisted metrics");
        replayed
    }

    pub fn pending(&self) -> usize {
        self.lock_core().buffer.len()
    }

    pub fn stats(&self) -> PipelineStats {
        self.inner.stats.snapshot()
    }

    /// Final flush, stop background tasks, then wait up to `timeout` for
    /// in-flight deliveries. Returns whether everything finished in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.flush(FlushReason::Shutdown);
        self.inner.shutdown.cancel();
        if let Some(timer) = self.lock_core().timer.take() {
            timer.abort();
        }
        self.inner.tasks.close();
        let drained = tokio::time::timeout(timeout, self.inner.tasks.wait())
            .await
            .is_ok();
        if !drained {
            tracing::warn!(?timeout, "pipeline shut down with deliveries still in flight");
        }
        drained
    }

    // ── Internals ───────────────────────────────────────────────────

    fn lock_core(&self) -> MutexGuard<'_, Core> {
        // Losing buffered events to a poisoned lock is worse than
        // continuing with whatever state the panicking holder left.
        self.inner.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gate, buffer and schedule one event. Returns whether it was buffered.
    fn enqueue(&self, event: Event, send_immediately: bool) -> bool {
        let consent = self.inner.consent.current();
        if !ConsentGate::permits(&event, consent.as_ref()) {
            bump(&self.inner.stats.dropped_consent, 1);
            tracing::debug!(
                event = event.name(),
                category = %event.category(),
                reason = %DropReason::ConsentDenied,
                "event dropped"
            );
            return false;
        }

        bump(&self.inner.stats.tracked, 1);
        let action = {
            let mut core = self.lock_core();
            core.buffer.push(event);
            let buffered = core.buffer.len();
            let action = core.scheduler.record_push(buffered);
            if send_immediately {
                PushAction::FlushNow
            } else {
                if let PushAction::ArmTimer { generation, delay } = action {
                    self.arm_timer(&mut core, generation, delay);
                }
                action
            }
        };

        if action == PushAction::FlushNow {
            let reason = if send_immediately {
                FlushReason::SendImmediately
            } else {
                FlushReason::CapReached
            };
            self.flush(reason);
        }
        true
    }

    fn arm_timer(&self, core: &mut Core, generation: u64, delay: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let deadline = tokio::time::Instant::now() + delay;
        let task = self.inner.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                Pipeline { inner }.on_timer(generation);
            }
        });
        if let Some(previous) = core.timer.replace(task.abort_handle()) {
            previous.abort();
        }
    }

    fn on_timer(&self, generation: u64) {
        {
            let mut core = self.lock_core();
            if !core.scheduler.timer_fired(generation) {
                return;
            }
            core.timer = None;
        }
        self.flush(FlushReason::Debounce);
    }

    fn spawn_watchdog(&self, interval: Duration) {
        if interval.is_zero() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let token = self.inner.shutdown.clone();
        self.inner.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        Pipeline { inner }.watchdog_tick();
                    }
                }
            }
        });
    }

    fn watchdog_tick(&self) {
        let now = self.inner.clock.now_millis();
        let due = {
            let core = self.lock_core();
            core.scheduler.watchdog_due(now, core.buffer.len())
        };
        if due {
            tracing::debug!("watchdog forcing flush");
            self.flush(FlushReason::Watchdog);
        }
    }

    /// Drain the buffer and hand the batch to the sinks. Returns as soon as
    /// delivery is spawned.
    fn flush(&self, reason: FlushReason) -> Option<FlushHandle> {
        let now = self.inner.clock.now_millis();
        let batch = {
            let mut core = self.lock_core();
            if let Some(timer) = core.timer.take() {
                timer.abort();
            }
            core.scheduler.flush_started(now);
            if core.buffer.is_empty() {
                return None;
            }
            core.buffer.drain()
        };

        self.persist_metrics(&batch);

        let batch_id = batch.id();
        let events = batch.len();
        tracing::debug!(%batch_id, events, %reason, "flushing batch");

        let pipeline = self.clone();
        let task = self
            .inner
            .tasks
            .spawn_on(async move { pipeline.deliver(batch).await }, &self.inner.runtime);

        Some(FlushHandle {
            batch_id,
            events,
            task,
        })
    }

    fn persist_metrics(&self, batch: &Batch) {
        for event in batch.persistent_events() {
            if let Err(e) = self.inner.metrics.save(event) {
                bump(&self.inner.stats.persistence_failures, 1);
                tracing::warn!(event = event.name(), error = %e, "failed to persist metric");
            }
        }
    }

    async fn deliver(&self, batch: Batch) -> DispatchReport {
        let consent = self.inner.consent.current();
        let report = self.inner.dispatcher.dispatch(&batch, consent).await;

        let stats = &self.inner.stats;
        bump(&stats.batches_dispatched, 1);
        bump(&stats.events_delivered, report.delivered());
        bump(&stats.sink_failures, report.failed());

        if report.is_total_failure() {
            bump(&stats.total_failures, 1);
            self.requeue(batch);
        } else {
            tracing::debug!(
                batch_id = %report.batch_id,
                delivered = report.delivered(),
                failed = report.failed(),
                "batch dispatched"
            );
        }
        report
    }

    fn requeue(&self, batch: Batch) {
        let batch_id = batch.id();
        let mut core = self.lock_core();
        let outcome = core.buffer.requeue_front(batch, self.inner.retry_limit);

        bump(&self.inner.stats.retry_requeued, outcome.requeued);
        bump(&self.inner.stats.retry_dropped, outcome.dropped + outcome.exhausted);

        if outcome.dropped > 0 {
            tracing::warn!(
                %batch_id,
                dropped = outcome.dropped,
                limit = self.inner.retry_limit,
                "retry buffer overflow, oldest events dropped"
            );
        }
        if outcome.exhausted > 0 {
            tracing::warn!(
                %batch_id,
                dropped = outcome.exhausted,
                "events failed after their single retry, dropped"
            );
        }
        tracing::info!(%batch_id, requeued = outcome.requeued, "batch failed on every sink, re-queued");

        if !core.buffer.is_empty()
            && let PushAction::ArmTimer { generation, delay } = core.scheduler.schedule_if_idle()
        {
            self.arm_timer(&mut core, generation, delay);
        }
    }
}
