use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Every variable `apply_env_overrides` reads.
const OVERRIDE_VARS: &[&str] = &[
    "PULSEGATE_BATCH_CAP",
    "PULSEGATE_DEBOUNCE_MS",
    "PULSEGATE_STORE_DIR",
    "PULSEGATE_LOG_LEVEL",
    "PULSEGATE_BACKEND_URL",
    "PULSEGATE_GA4_MEASUREMENT_ID",
    "PULSEGATE_GA4_API_SECRET",
];

/// Process environment owned by one test: holds the env lock, starts with
/// no `PULSEGATE_*` overrides and puts the previous values back on drop.
pub(super) struct ScopedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    pub(super) fn clean() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut env = Self {
            saved: Vec::new(),
            _lock: lock,
        };
        for key in OVERRIDE_VARS {
            env.unset(key);
        }
        env
    }

    pub(super) fn set(&mut self, key: &'static str, value: &str) {
        self.remember(key);
        // SAFETY: ENV_LOCK is held for the lifetime of `self`.
        unsafe { std::env::set_var(key, value) };
    }

    fn unset(&mut self, key: &'static str) {
        self.remember(key);
        // SAFETY: ENV_LOCK is held for the lifetime of `self`.
        unsafe { std::env::remove_var(key) };
    }

    fn remember(&mut self, key: &'static str) {
        if !self.saved.iter().any(|(saved, _)| *saved == key) {
            self.saved.push((key, std::env::var(key).ok()));
        }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        // Runs before `_lock` is released.
        for (key, previous) in self.saved.drain(..).rev() {
            // SAFETY: ENV_LOCK is still held.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}

mod tests {
    use super::*;

    #[test]
    fn clean_env_has_no_overrides_and_remembers_first_value() {
        let mut env = ScopedEnv::clean();
        for key in OVERRIDE_VARS {
            assert!(std::env::var(key).is_err(), "{key} leaked into the test");
        }

        env.set("PULSEGATE_LOG_LEVEL", "trace");
        env.set("PULSEGATE_LOG_LEVEL", "warn");
        assert_eq!(std::env::var("PULSEGATE_LOG_LEVEL").as_deref(), Ok("warn"));

        let saved: Vec<_> = env
            .saved
            .iter()
            .filter(|(key, _)| *key == "PULSEGATE_LOG_LEVEL")
            .collect();
        assert_eq!(saved.len(), 1);
    }
}
