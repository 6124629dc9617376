use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use dashmap::DashMap;
use log::{debug, info, trace};
use strata_files::common::types::{ArchiveId, Reference, ResourceKey};
use tokio::sync::OnceCell;

use crate::asset_graph::cache::ResourceCache;
use crate::asset_graph::resolver::Resolver;
use crate::asset_graph::resource::Resource;
use crate::error::LoadError;
use crate::io::archive::loader::LoadedArchive;
use crate::io::common::loader::AssetSource;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct AssetStatistics {
    /// Archives fetched and parsed, counting reloads after a release.
    pub archives_opened: usize,
    /// Resources parsed by the resolver. Concurrent loads of one key parse it once.
    pub resources_parsed: usize,
    pub archives_loaded: usize,
    pub resources_cached: usize,
}

/// Entry point for consumers: loads archives once, resolves resources and shares them.
pub struct AssetManager<S: AssetSource> {
    source: S,
    next_id: AtomicU32,
    by_path: DashMap<String, ArchiveId>,
    paths: DashMap<ArchiveId, String>,
    archives: DashMap<ArchiveId, Arc<OnceCell<Arc<LoadedArchive>>>>,
    resources: ResourceCache<ResourceKey, Resource>,
    archives_opened: AtomicUsize,
    resources_parsed: AtomicUsize,
}

impl<S: AssetSource> AssetManager<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            next_id: AtomicU32::new(0),
            by_path: DashMap::new(),
            paths: DashMap::new(),
            archives: DashMap::new(),
            resources: ResourceCache::new(),
            archives_opened: AtomicUsize::new(0),
            resources_parsed: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Registering the same path twice yields the same id. Nothing is fetched yet.
    pub fn register_archive(&self, path: &str) -> ArchiveId {
        let id = *self
            .by_path
            .entry(path.to_owned())
            .or_insert_with(|| ArchiveId(self.next_id.fetch_add(1, Ordering::Relaxed)))
            .value();
        self.paths.entry(id).or_insert_with(|| path.to_owned());
        id
    }

    pub fn archive_path(&self, id: ArchiveId) -> Option<String> {
        self.paths.get(&id).map(|path| path.value().clone())
    }

    /// Fetches and parses the archive on first use. Concurrent callers share one load, a failed
    /// load is not remembered.
    pub async fn archive(&self, id: ArchiveId) -> Result<Arc<LoadedArchive>, LoadError> {
        let path = self.archive_path(id).ok_or(LoadError::UnknownArchive(id))?;
        let cell = self.archives.entry(id).or_default().value().clone();

        let archive = cell
            .get_or_try_init(|| async {
                let bytes = self
                    .source
                    .fetch(&path)
                    .await
                    .map_err(|source| LoadError::Fetch {
                        path: path.clone(),
                        source,
                    })?;

                let archive = LoadedArchive::open(id, &path, bytes).map_err(|source| LoadError::Archive {
                    path: path.clone(),
                    source,
                })?;
                self.archives_opened.fetch_add(1, Ordering::Relaxed);
                Ok::<_, LoadError>(Arc::new(archive))
            })
            .await?;

        Ok(archive.clone())
    }

    /// Returns the published resource, or loads it together with everything it references.
    pub async fn load_resource(&self, key: ResourceKey) -> Result<Arc<Resource>, LoadError> {
        if let Some(resource) = self.resources.get(&key) {
            return Ok(resource);
        }

        let archive = self.archive(key.archive).await?;
        self.resolve_and_publish(&archive, key)
    }

    fn resolve_and_publish(&self, archive: &LoadedArchive, key: ResourceKey) -> Result<Arc<Resource>, LoadError> {
        // A concurrent load may have published it while this one awaited the archive. Nothing below
        // suspends, so the check holds until publishing.
        if let Some(resource) = self.resources.get(&key) {
            trace!("{} was published while waiting for {}", key, key.archive);
            return Ok(resource);
        }

        let graph = Resolver::new(archive, &self.resources).resolve(key)?;
        self.resources_parsed
            .fetch_add(graph.resources.len(), Ordering::Relaxed);

        let mut root = None;
        for resource in graph.resources {
            let resource_key = resource.key;
            // Someone else may have published it in the meantime, theirs wins.
            let published = self
                .resources
                .get_or_load(resource_key, || Ok::<_, LoadError>(resource))?;
            if resource_key == key {
                root = Some(published);
            }
        }

        info!("Loaded {}", key);
        root.ok_or(LoadError::NotFound { key })
    }

    /// Published resources only, this never loads.
    pub fn resource(&self, key: &ResourceKey) -> Option<Arc<Resource>> {
        self.resources.get(key)
    }

    pub fn follow(&self, reference: &Reference) -> Option<Arc<Resource>> {
        reference.key().and_then(|key| self.resource(&key))
    }

    /// Drops the archive's bytes. Its published resources stay, a later load fetches it again.
    pub fn release_archive(&self, id: ArchiveId) -> bool {
        let released = self.archives.remove(&id).is_some();
        if released {
            debug!("Released archive {}", id);
        }
        released
    }

    /// Forgets all archives and resources. Handed out `Arc`s stay valid.
    pub fn unload(&self) {
        let resources = self.resources.len();
        self.archives.clear();
        self.resources.clear();
        info!("Unloaded {} resources", resources);
    }

    pub fn statistics(&self) -> AssetStatistics {
        AssetStatistics {
            archives_opened: self.archives_opened.load(Ordering::Relaxed),
            resources_parsed: self.resources_parsed.load(Ordering::Relaxed),
            archives_loaded: self
                .archives
                .iter()
                .filter(|cell| cell.value().initialized())
                .count(),
            resources_cached: self.resources.len(),
        }
    }
}
