use std::sync::atomic::{AtomicU64, Ordering};

/// Why an event never reached the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    ConsentDenied,
    InvalidEvent,
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub tracked: u64,
    pub dropped_consent: u64,
    pub dropped_invalid: u64,
    pub batches_dispatched: u64,
    pub events_delivered: u64,
    pub sink_failures: u64,
    pub total_failures: u64,
    pub retry_requeued: u64,
    pub retry_dropped: u64,
    pub persistence_failures: u64,
    pub replayed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub tracked: AtomicU64,
    pub dropped_consent: AtomicU64,
    pub dropped_invalid: AtomicU64,
    pub batches_dispatched: AtomicU64,
    pub events_delivered: AtomicU64,
    pub sink_failures: AtomicU64,
    pub total_failures: AtomicU64,
    pub retry_requeued: AtomicU64,
    pub retry_dropped: AtomicU64,
    pub persistence_failures: AtomicU64,
    pub replayed: AtomicU64,
}

pub(crate) fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(u64::try_from(by).unwrap_or(u64::MAX), Ordering::Relaxed);
}

impl StatsCounters {
    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            tracked: self.tracked.load(Ordering::Relaxed),
            dropped_consent: self.dropped_consent.load(Ordering::Relaxed),
            dropped_invalid: self.dropped_invalid.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            total_failures: self.total_failures.load(Ordering::Relaxed),
            retry_requeued: self.retry_requeued.load(Ordering::Relaxed),
            retry_dropped: self.retry_dropped.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            replayed: self.replayed.load(Ordering::Relaxed),
        }
    }
}
