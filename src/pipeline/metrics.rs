use super::event::Event;
use crate::error::StoreError;
use crate::storage::DurableStore;
use std::sync::Arc;

pub const METRICS_KEY: &str = "persisted-metrics";
pub const DEFAULT_METRICS_CAP: usize = 100;

/// Capped FIFO of persisted metrics, kept in a single durable slot as a
/// JSON array. Survives restarts; independent of the in-memory buffer.
///
/// `save` is read-append-trim-write with no transaction around it: two
/// writers racing can lose one entry.
pub struct PersistentMetricStore {
    store: Arc<dyn DurableStore>,
    cap: usize,
}

impl PersistentMetricStore {
    pub fn new(store: Arc<dyn DurableStore>, cap: usize) -> Self {
        Self {
            store,
            cap: cap.max(1),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn save(&self, metric: &Event) -> Result<(), StoreError> {
        let mut entries = self.read()?;
        entries.push(metric.clone());
        if entries.len() > self.cap {
            let excess = entries.len() - self.cap;
            entries.drain(..excess);
        }
        let json = serde_json::to_string(&entries)?;
        self.store.set(METRICS_KEY, &json)
    }

    /// Everything stored, oldest first. A corrupt slot reads as empty.
    pub fn load_all(&self) -> Vec<Event> {
        match self.read() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load persisted metrics");
                Vec::new()
            }
        }
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove(METRICS_KEY)
    }

    fn read(&self) -> Result<Vec<Event>, StoreError> {
        let raw = match self.store.get(METRICS_KEY)? {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Ok(Vec::new()),
        };
        let entries: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                // Start over rather than wedge every future save.
                tracing::warn!(error = %e, "discarding corrupt persisted metrics");
                return Ok(Vec::new());
            }
        };
        Ok(entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Event>(entry) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping invalid persisted metric");
                    None
                }
            })
            .collect())
    }
}
