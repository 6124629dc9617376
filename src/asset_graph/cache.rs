use std::hash::Hash;
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

type Slot<V> = Arc<RwLock<Option<Arc<V>>>>;

/// Memoizes values by key, so that every key is loaded at most once and all callers share the
/// same [`Arc`]. Each key has its own slot lock, the map itself is only locked for slot lookup and
/// insertion, never while a loader runs.
pub struct ResourceCache<K, V> {
    slots: DashMap<K, Slot<V>>,
}

impl<K: Eq + Hash + Clone, V> ResourceCache<K, V> {
    pub fn new() -> Self {
        Self {
            slots: DashMap::with_capacity(100),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let slot = self.slots.get(key)?.value().clone();
        let value = slot.read().expect("Get the read lock on the slot");
        value.clone()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Returns the cached value or runs `loader` and stores its result. Concurrent callers for the
    /// same key wait for the first loader instead of running their own. A failing loader leaves
    /// nothing behind, so a later call tries again.
    pub fn get_or_load<E, F>(&self, key: K, loader: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        // Easy path: the value is there already
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        // The dashmap shard lock is released before waiting on the slot.
        let slot = self.slots.entry(key.clone()).or_default().value().clone();
        let mut value = slot.write().expect("Get the write lock on the slot");
        if let Some(existing) = value.as_ref() {
            // we have been raced
            return Ok(existing.clone());
        }

        match loader() {
            Ok(loaded) => {
                let loaded = Arc::new(loaded);
                *value = Some(loaded.clone());
                Ok(loaded)
            }
            Err(err) => {
                drop(value);
                self.slots
                    .remove_if(&key, |_, candidate| Arc::ptr_eq(candidate, &slot) && Self::is_vacant(candidate));
                Err(err)
            }
        }
    }

    // These run under a shard lock, so they must not block on a slot that is being loaded.
    fn is_vacant(slot: &Slot<V>) -> bool {
        slot.try_read().is_ok_and(|value| value.is_none())
    }

    fn is_loaded(slot: &Slot<V>) -> bool {
        slot.try_read().is_ok_and(|value| value.is_some())
    }

    /// Number of loaded values.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| Self::is_loaded(slot.value())).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<K> {
        self.slots
            .iter()
            .filter(|slot| Self::is_loaded(slot.value()))
            .map(|slot| slot.key().clone())
            .collect()
    }

    /// Drops the cache's references, values stay alive as long as someone else holds them.
    pub fn remove_where(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let before = self.slots.len();
        self.slots.retain(|key, _| !predicate(key));
        before - self.slots.len()
    }

    pub fn clear(&self) {
        self.slots.clear();
    }
}

impl<K: Eq + Hash + Clone, V> Default for ResourceCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn loads_once() -> Result<(), anyhow::Error> {
        let cache = ResourceCache::<u32, String>::new();
        let calls = AtomicUsize::new(0);
        let loader = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>("terrain".to_owned())
        };

        let first = cache.get_or_load(7, loader)?;
        let second = cache.get_or_load(7, loader)?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[test]
    fn failed_load_is_not_cached() -> Result<(), anyhow::Error> {
        let cache = ResourceCache::<u32, u32>::new();

        let err = cache.get_or_load(1, || Err("broken"));
        assert_eq!(err.unwrap_err(), "broken");
        assert!(!cache.contains(&1));
        assert!(cache.keys().is_empty());

        let value = cache.get_or_load(1, || Ok::<_, &str>(5)).map_err(anyhow::Error::msg)?;
        assert_eq!(*value, 5);
        Ok(())
    }

    #[test]
    fn concurrent_callers_share_one_load() {
        let cache = Arc::new(ResourceCache::<u32, u32>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                std::thread::spawn(move || {
                    cache
                        .get_or_load(3, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(10));
                            Ok::<_, ()>(42)
                        })
                        .expect("loader does not fail")
                })
            })
            .collect();

        let values: Vec<Arc<u32>> = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread finished"))
            .collect();
        assert!(values.iter().all(|value| Arc::ptr_eq(value, &values[0])));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removal_keeps_handed_out_values() -> Result<(), anyhow::Error> {
        let cache = ResourceCache::<u32, u32>::new();
        let kept = cache.get_or_load(1, || Ok::<_, anyhow::Error>(10))?;
        cache.get_or_load(2, || Ok::<_, anyhow::Error>(20))?;

        assert_eq!(cache.remove_where(|key| *key == 1), 1);
        assert!(!cache.contains(&1));
        assert!(cache.contains(&2));
        assert_eq!(*kept, 10);

        cache.clear();
        assert!(cache.is_empty());
        Ok(())
    }
}
