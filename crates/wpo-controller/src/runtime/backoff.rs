use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

/// Per-item exponential backoff: `base * 2^(failures - 1)`, capped at `max`.
#[derive(Debug)]
pub struct Backoff<T> {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<T, u32>>,
}

impl<T: Eq + Hash + Clone> Backoff<T> {
    pub const DEFAULT_BASE: Duration = Duration::from_millis(5);
    pub const DEFAULT_MAX: Duration = Duration::from_secs(1000);

    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Records a failure of `item` and returns how long to wait before
    /// retrying it.
    pub fn next_delay(&self, item: &T) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(|p| p.into_inner());
        let count = failures.entry(item.clone()).or_insert(0);
        *count = count.saturating_add(1);
        let exponent = (*count - 1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Clears the failure history of `item` after a success.
    pub fn forget(&self, item: &T) {
        self.failures
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(item);
    }

    pub fn failures(&self, item: &T) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(item)
            .copied()
            .unwrap_or(0)
    }
}

impl<T: Eq + Hash + Clone> Default for Backoff<T> {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE, Self::DEFAULT_MAX)
    }
}
