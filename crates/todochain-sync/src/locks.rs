use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::{Mutex, OwnedMutexGuard};
use todochain_types::TodoId;

/// Per-todo mutual exclusion for sync attempts.
///
/// Attempts on one todo run one at a time; attempts on different todos never
/// contend. Entries are dropped once nobody holds or waits on them.
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<TodoId, Arc<Mutex<()>>>,
    in_flight: DashSet<TodoId>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`.
    pub async fn acquire(&self, id: TodoId) -> SyncPermit<'_> {
        let lock = self.slot(id);
        let guard = lock.lock_owned().await;
        self.grant(id, guard)
    }

    /// Exclusive access to `id` if nobody holds it right now.
    pub fn try_acquire(&self, id: TodoId) -> Option<SyncPermit<'_>> {
        let lock = self.slot(id);
        let guard = lock.try_lock_owned().ok()?;
        Some(self.grant(id, guard))
    }

    /// Whether an attempt on `id` currently holds the lock.
    pub fn is_in_flight(&self, id: &TodoId) -> bool {
        self.in_flight.contains(id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn slot(&self, id: TodoId) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(id).or_default().value())
    }

    fn grant(&self, id: TodoId, guard: OwnedMutexGuard<()>) -> SyncPermit<'_> {
        self.in_flight.insert(id);
        SyncPermit {
            locks: self,
            id,
            guard: Some(guard),
        }
    }

    fn release(&self, id: &TodoId, guard: Option<OwnedMutexGuard<()>>) {
        // Clear the flag before unlocking, or it could erase the next holder's.
        self.in_flight.remove(id);
        drop(guard);
        self.locks.remove_if(id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl std::fmt::Debug for KeyedLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLocks")
            .field("slots", &self.locks.len())
            .field("in_flight", &self.in_flight.len())
            .finish()
    }
}

/// Exclusive right to sync one todo. Released on drop.
pub struct SyncPermit<'a> {
    locks: &'a KeyedLocks,
    id: TodoId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SyncPermit<'_> {
    pub fn id(&self) -> TodoId {
        self.id
    }
}

impl Drop for SyncPermit<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.id, self.guard.take());
    }
}
