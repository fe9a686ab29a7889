pub mod buffer;
pub mod clock;
pub mod consent;
pub mod dispatcher;
pub mod engine;
pub mod event;
pub mod metrics;
pub mod scheduler;
pub mod stats;

pub use buffer::{Batch, EventBuffer, RequeueOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use consent::{
    CONSENT_KEY, ConsentGate, ConsentRecord, ConsentSettings, ConsentStore, SETTINGS_KEY,
    is_consent_lifecycle_event,
};
pub use dispatcher::{DispatchReport, SinkDispatcher, SinkOutcome, SinkStatus};
pub use engine::{FlushHandle, LifecycleSignal, Pipeline, PipelineBuilder};
pub use event::{Event, EventCategory, Properties, PropertyValue, TrackOptions};
pub use metrics::{DEFAULT_METRICS_CAP, METRICS_KEY, PersistentMetricStore};
pub use scheduler::{FlushReason, FlushScheduler, PushAction, SchedulerState};
pub use stats::{DropReason, PipelineStats};
