//! Per-prefix sequence counters

use std::collections::HashMap;
use std::sync::Mutex;

/// Key -> last issued number
///
/// Shared by every build pass in a process (wrap in `Arc`). The only
/// operation is an atomic increment-or-insert.
#[derive(Debug, Default)]
pub struct CounterStore {
    counters: Mutex<HashMap<String, u32>>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert 1 for an unseen key, otherwise increment; returns the new value
    pub fn next(&self, key: &str) -> u32 {
        let mut counters = self
            .counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = counters.entry(key.to_string()).or_insert(0);
        *slot += 1;
        *slot
    }

    /// Last value issued for `key`, 0 if none
    pub fn current(&self, key: &str) -> u32 {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub fn reset(&self) {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}
