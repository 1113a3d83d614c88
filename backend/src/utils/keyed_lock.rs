use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per key. Used to serialize find-or-create sequences for a
/// single user without blocking unrelated users.
pub struct KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: K) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }

    /// Drops entries nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, m| Arc::strong_count(m) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
