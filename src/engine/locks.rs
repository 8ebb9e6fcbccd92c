use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Async mutual exclusion keyed by record id.
///
/// Every write that can change an order's assignment, claims, delivery or
/// payment state runs while holding that order's guard. Writers that also
/// touch a driver take the order guard first and the driver guard second.
/// Different keys never contend. An entry lives only while some task holds
/// or waits on it, so the table is bounded by in-flight writers.
#[derive(Default, Clone)]
pub struct KeyedLocks {
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: Uuid) -> KeyedGuard {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyedGuard {
            guard: Some(lock.lock_owned().await),
            key,
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.len()
    }
}

/// Held lock for one key. Dropping it evicts the entry once no other task
/// holds or waits on the same key.
pub struct KeyedGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: Uuid,
    locks: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Release first so our own reference is gone before counting.
        drop(self.guard.take());
        // Waiters clone the Arc under the shard lock, so a count of one
        // means only the table still refers to it.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Lock tables shared by every component that writes orders or drivers.
#[derive(Default, Clone)]
pub struct Locks {
    pub orders: KeyedLocks,
    pub drivers: KeyedLocks,
}

impl Locks {
    pub fn new() -> Self {
        Self::default()
    }
}
