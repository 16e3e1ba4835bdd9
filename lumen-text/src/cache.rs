//! Synchronized cache shared by the coverage and atlas caches.
//!
//! One mutex guards the whole map and is held for the duration of each
//! call, including the build closure. Concurrent callers asking for the
//! same key therefore serialize instead of building twice.
//!
//! Entries are unbounded unless a capacity is given, in which case the
//! least recently used entry is dropped on overflow.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Outcome of [`SyncCache::get_or_try_insert_with`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Hit,
    Built,
}

pub struct SyncCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, Arc<V>>>,
}

impl<K: Hash + Eq, V> SyncCache<K, V> {
    /// Create a cache. `None` means entries are never evicted.
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let lru = match capacity {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            inner: Mutex::new(lru),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, Arc<V>>> {
        // A panic inside a build closure leaves the map itself intact.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    /// Return the entry for `key`, building and inserting it on a miss.
    ///
    /// A failed build inserts nothing.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, build: F) -> Result<(Arc<V>, Lookup), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut map = self.lock();
        if let Some(hit) = map.get(&key) {
            return Ok((Arc::clone(hit), Lookup::Hit));
        }

        let value = Arc::new(build()?);
        if map.push(key, Arc::clone(&value)).is_some() {
            log::debug!("SyncCache: evicted least recently used entry");
        }
        Ok((value, Lookup::Built))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
