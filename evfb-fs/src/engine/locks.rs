//! Per-session serialization
//!
//! Every engine operation holds the lock for its submission key for the
//! whole read-modify-write, so two concurrent `next` calls on one session
//! cannot both observe the same current step. Different keys never contend.
//! Entries are dropped from the registry once nobody holds or awaits them.

use evfb_common::SubmissionKey;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Mutex<HashMap<SubmissionKey, Arc<AsyncMutex<()>>>>;

#[derive(Default)]
pub struct SessionLocks {
    registry: Registry,
}

/// Held for the duration of one engine operation
pub struct SessionGuard<'a> {
    registry: &'a Registry,
    key: SubmissionKey,
    mutex: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &SubmissionKey) -> SessionGuard<'_> {
        let mutex = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(registry.entry(key.clone()).or_default())
        };

        let guard = Arc::clone(&mutex).lock_owned().await;

        SessionGuard {
            registry: &self.registry,
            key: key.clone(),
            mutex,
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked
    pub fn active(&self) -> usize {
        self.registry.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        // Registry + this guard: no other holder or waiter
        if Arc::strong_count(&self.mutex) == 2 {
            registry.remove(&self.key);
        }
    }
}
