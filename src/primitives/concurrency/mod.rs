//! Per-key mutual exclusion.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use rustc_hash::FxHashMap;

/// Table of mutexes, one per logical key.
///
/// Holding the lock for one key never blocks callers working on another key.
/// The table itself is only locked long enough to find or insert a slot, so
/// waiting on a busy key does not stall lookups for other keys. Slots live as
/// long as the table.
pub struct KeyedLock<K> {
    slots: Mutex<FxHashMap<K, Arc<Mutex<()>>>>,
}

/// Guard holding the mutex of one key; released on drop.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyGuard {
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl<K> Default for KeyedLock<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K> fmt::Debug for KeyedLock<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedLock")
            .field("keys", &self.slots.lock().len())
            .finish()
    }
}

impl<K: Eq + Hash + Clone> KeyedLock<K> {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until the mutex for `key` is free and returns its guard.
    pub fn lock(&self, key: &K) -> KeyGuard {
        let slot = self.slot(key);
        KeyGuard {
            _guard: slot.lock_arc(),
        }
    }

    /// Returns the guard for `key` if nobody else holds it.
    pub fn try_lock(&self, key: &K) -> Option<KeyGuard> {
        self.slot(key)
            .try_lock_arc()
            .map(|guard| KeyGuard { _guard: guard })
    }

    /// Runs `f` while holding the mutex for `key`.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock(key);
        f()
    }

    /// Whether some caller currently holds the mutex for `key`.
    pub fn is_locked(&self, key: &K) -> bool {
        self.slots
            .lock()
            .get(key)
            .is_some_and(|slot| slot.is_locked())
    }

    /// Number of keys that have ever been locked.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether no key has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }
        let slot = Arc::new(Mutex::new(()));
        slots.insert(key.clone(), Arc::clone(&slot));
        slot
    }
}
