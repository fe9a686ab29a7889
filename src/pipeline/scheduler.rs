use std::time::Duration;

/// Why a flush happened. Carried into logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FlushReason {
    CapReached,
    Debounce,
    SendImmediately,
    Lifecycle,
    Watchdog,
    Manual,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// A debounce timer with this generation is pending.
    Scheduled { generation: u64 },
}

/// What the caller must do after a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushAction {
    FlushNow,
    ArmTimer { generation: u64, delay: Duration },
    None,
}

/// Decides when the buffer is drained. Holds no timers itself: the
/// pipeline arms them and reports back with the generation it was given.
#[derive(Debug)]
pub struct FlushScheduler {
    state: SchedulerState,
    cap: usize,
    debounce: Duration,
    watchdog_interval: Duration,
    next_generation: u64,
    last_flush_at: i64,
}

impl FlushScheduler {
    pub fn new(cap: usize, debounce: Duration, watchdog_interval: Duration, now: i64) -> Self {
        Self {
            state: SchedulerState::Idle,
            cap: cap.max(1),
            debounce,
            watchdog_interval,
            next_generation: 0,
            last_flush_at: now,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn last_flush_at(&self) -> i64 {
        self.last_flush_at
    }

    /// Called after every push with the new buffer length.
    ///
    /// An already pending debounce is left alone so a steady trickle of
    /// events cannot postpone delivery forever.
    pub fn record_push(&mut self, buffered: usize) -> PushAction {
        if buffered >= self.cap {
            self.state = SchedulerState::Idle;
            return PushAction::FlushNow;
        }
        self.schedule_if_idle()
    }

    /// Arm a debounce only if nothing is pending.
    pub fn schedule_if_idle(&mut self) -> PushAction {
        match self.state {
            SchedulerState::Scheduled { .. } => PushAction::None,
            SchedulerState::Idle => {
                self.next_generation += 1;
                let generation = self.next_generation;
                self.state = SchedulerState::Scheduled { generation };
                PushAction::ArmTimer {
                    generation,
                    delay: self.debounce,
                }
            }
        }
    }

    /// A debounce timer expired. Returns whether it is still the live one.
    pub fn timer_fired(&mut self, generation: u64) -> bool {
        match self.state {
            SchedulerState::Scheduled { generation: live } if live == generation => {
                self.state = SchedulerState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn flush_started(&mut self, now: i64) {
        self.state = SchedulerState::Idle;
        self.last_flush_at = now;
    }

    /// Whether the watchdog should force a flush: events are waiting and
    /// nothing has been flushed for a full interval.
    pub fn watchdog_due(&self, now: i64, buffered: usize) -> bool {
        if buffered == 0 {
            return false;
        }
        let interval_ms = i64::try_from(self.watchdog_interval.as_millis()).unwrap_or(i64::MAX);
        now.saturating_sub(self.last_flush_at) >= interval_ms
    }
}
