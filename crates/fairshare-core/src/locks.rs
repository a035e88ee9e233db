// crates/fairshare-core/src/locks.rs
//
// Per-key async mutexes.
//
// Ledger mutations serialize per account, score writes per account, and
// vote casting per proposal. Guards for several keys are always acquired in
// ascending key order so two operations touching the same pair of accounts
// cannot deadlock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::account::AccountId;

type Slots<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

/// Held for as long as the caller owns the key. Dropping the last guard or
/// waiter for a key removes its entry from the table.
pub struct KeyGuard<K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    key: K,
    slots: Slots<K>,
}

impl<K: Eq + Hash> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a holder.
        self.guard.take();
        if let Ok(mut slots) = self.slots.lock() {
            let idle = slots
                .get(&self.key)
                .is_some_and(|slot| Arc::strong_count(slot) == 1);
            if idle {
                slots.remove(&self.key);
            }
        }
    }
}

/// A table of lazily created async mutexes, one per key in use.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Slots<K>,
}

/// Per-account lock table.
pub type AccountLocks = KeyedLocks<AccountId>;

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn slot(&self, key: &K) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().expect("lock table poisoned");
        slots.entry(key.clone()).or_default().clone()
    }

    async fn acquire(&self, key: &K) -> KeyGuard<K> {
        let guard = self.slot(key).lock_owned().await;
        KeyGuard {
            guard: Some(guard),
            key: key.clone(),
            slots: self.slots.clone(),
        }
    }

    /// Wait for exclusive ownership of one key.
    pub async fn lock(&self, key: &K) -> KeyGuard<K> {
        self.acquire(key).await
    }

    /// Wait for exclusive ownership of every key, deduplicated and acquired
    /// in ascending order.
    pub async fn lock_many(&self, keys: &[K]) -> Vec<KeyGuard<K>> {
        let mut ordered = keys.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in &ordered {
            guards.push(self.acquire(key).await);
        }
        guards
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.slots.lock().expect("lock table poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Ord + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
