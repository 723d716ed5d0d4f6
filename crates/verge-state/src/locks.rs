//! Keyed mutual exclusion for per-tenant and per-plan critical sections.
//!
//! The registry must serialize assignment writes for the same tenant, and
//! the orchestrator must serialize health checks and step advances for the
//! same plan, while unrelated tenants and plans proceed concurrently. A
//! single lock per key gives exactly that without a global lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A map of independent mutexes, one per string key.
#[derive(Default)]
pub struct KeyedLock {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// Callers for different keys do not block each other; callers for the
    /// same key run one at a time.
    pub fn with<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let slot = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(key.to_string()).or_default().clone()
        };
        let _guard = slot.lock().unwrap_or_else(|e| e.into_inner());
        f()
    }
}
