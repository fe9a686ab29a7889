use super::event::Event;
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Pending {
    event: Event,
    /// Already put back once after a failed batch.
    requeued: bool,
}

/// Snapshot of the buffer taken at flush time. Immutable; owned by the
/// flush that drained it.
#[derive(Debug, Clone)]
pub struct Batch {
    id: Uuid,
    events: Vec<Event>,
    requeued: Vec<bool>,
}

impl Batch {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events to save in the metric store. Re-queued events were saved on
    /// their first flush and are skipped.
    pub fn persistent_events(&self) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .zip(&self.requeued)
            .filter(|(event, requeued)| !**requeued && event.is_persistent())
            .map(|(event, _)| event)
    }
}

/// Result of putting a failed batch back in front of the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequeueOutcome {
    pub requeued: usize,
    /// Dropped to keep the buffer within its retry limit.
    pub dropped: usize,
    /// Dropped because they had already been retried once.
    pub exhausted: usize,
}

/// Ordered in-memory collection of pending events.
#[derive(Debug, Default)]
pub struct EventBuffer {
    pending: VecDeque<Pending>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.pending.push_back(Pending {
            event,
            requeued: false,
        });
    }

    /// Take everything buffered so far, leaving the buffer empty.
    pub fn drain(&mut self) -> Batch {
        let pending = std::mem::take(&mut self.pending);
        let mut events = Vec::with_capacity(pending.len());
        let mut requeued = Vec::with_capacity(pending.len());
        for entry in pending {
            events.push(entry.event);
            requeued.push(entry.requeued);
        }
        Batch {
            id: Uuid::new_v4(),
            events,
            requeued,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Put a failed batch back at the front, ahead of anything pushed
    /// since it was drained.
    ///
    /// Events that were already re-queued once are not retried again. If the
    /// result would exceed `limit`, the oldest re-queued events are dropped;
    /// events pushed after the drain are never displaced.
    pub fn requeue_front(&mut self, batch: Batch, limit: usize) -> RequeueOutcome {
        let mut outcome = RequeueOutcome::default();

        let retryable: Vec<Event> = batch
            .events
            .into_iter()
            .zip(batch.requeued)
            .filter_map(|(event, already)| {
                if already {
                    outcome.exhausted += 1;
                    None
                } else {
                    Some(event)
                }
            })
            .collect();

        let room = limit.saturating_sub(self.pending.len());
        let skip = retryable.len().saturating_sub(room);
        outcome.dropped = skip;

        for event in retryable.into_iter().skip(skip).rev() {
            self.pending.push_front(Pending {
                event,
                requeued: true,
            });
            outcome.requeued += 1;
        }

        outcome
    }
}
