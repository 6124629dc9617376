use std::sync::{Arc, Weak};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use itertools::Itertools;
use log::trace;
use strata_files::common::types::ResourceKey;

use crate::asset_graph::resource::Resource;

/// Values that hold on to something outside of Rust's ownership (GPU memory, file handles) and
/// need an explicit release when the cache lets go of them.
pub trait Releasable {
    fn release(&self);
}

struct SessionEntry<V> {
    source: Weak<Resource>,
    value: Arc<V>,
}

impl<V> SessionEntry<V> {
    fn is_for(&self, source: &Arc<Resource>) -> bool {
        std::ptr::eq(self.source.as_ptr(), Arc::as_ptr(source))
    }
}

/// Memoizes values derived from a [`Resource`], keyed by the resource's identity. The cache only
/// holds a [`Weak`] to the source, so unloading a resource does not keep it alive. Entries of
/// dead sources are pruned (and released) on insert, and a resource loaded again under the same
/// key gets a fresh value.
///
/// Like [`crate::asset_graph::cache::ResourceCache`] it is based on [`DashMap`] for interior
/// mutability. The factory runs outside of any lock, when two threads race for the same source,
/// the slower value is released and dropped.
pub struct SessionCache<V: Releasable> {
    inner: DashMap<ResourceKey, SessionEntry<V>>,
}

impl<V: Releasable> SessionCache<V> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: DashMap::with_capacity(capacity),
        }
    }

    pub fn get(&self, source: &Arc<Resource>) -> Option<Arc<V>> {
        let entry = self.inner.get(&source.key)?;
        entry.is_for(source).then(|| entry.value.clone())
    }

    pub fn get_or_create<F>(&self, source: &Arc<Resource>, factory: F) -> Arc<V>
    where
        F: FnOnce(&Resource) -> V,
    {
        if let Some(value) = self.get(source) {
            return value;
        }

        let created = Arc::new(factory(source.as_ref()));
        self.prune();

        let (value, discarded) = match self.inner.entry(source.key) {
            Entry::Occupied(existing) if existing.get().is_for(source) => (existing.get().value.clone(), created),
            Entry::Occupied(mut stale) => {
                let previous = stale.insert(SessionEntry {
                    source: Arc::downgrade(source),
                    value: created.clone(),
                });
                (created, previous.value)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(SessionEntry {
                    source: Arc::downgrade(source),
                    value: created.clone(),
                });
                return created;
            }
        };

        discarded.release();
        value
    }

    /// Releases and removes the values of sources that are gone.
    pub fn prune(&self) -> usize {
        let mut dead = Vec::new();
        self.inner.retain(|_, entry| {
            let alive = entry.source.strong_count() > 0;
            if !alive {
                dead.push(entry.value.clone());
            }
            alive
        });

        for value in &dead {
            value.release();
        }

        if !dead.is_empty() {
            trace!("Pruned {} derived values", dead.len());
        }
        dead.len()
    }

    /// Releases every value and empties the cache.
    pub fn destroy(&self) -> usize {
        let keys = self.inner.iter().map(|entry| *entry.key()).collect_vec();
        let values = keys
            .iter()
            .filter_map(|key| self.inner.remove(key))
            .map(|(_, entry)| entry.value)
            .collect_vec();

        for value in &values {
            value.release();
        }
        values.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn values(&self) -> Vec<Arc<V>> {
        self.inner.iter().map(|entry| entry.value.clone()).collect_vec()
    }
}

impl<V: Releasable> Default for SessionCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
