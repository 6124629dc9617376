use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::trace;

/// Where archive bytes come from. Fetching is the only place a load suspends.
pub trait AssetSource: Send + Sync {
    fn fetch(&self, path: &str) -> impl Future<Output = io::Result<Vec<u8>>> + Send;
}

/// Reads archives from a data directory.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_owned(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not relative to the data directory", path),
            ));
        }

        Ok(self.root.join(relative))
    }
}

impl AssetSource for DirectorySource {
    async fn fetch(&self, path: &str) -> io::Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        trace!("Reading {}", full_path.display());
        tokio::fs::read(full_path).await
    }
}

/// Archives held in memory, mostly for tests and tools. Counts fetches so callers can observe
/// deduplication.
#[derive(Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) -> &mut Self {
        self.files.insert(path.into(), bytes);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl AssetSource for MemorySource {
    async fn fetch(&self, path: &str) -> io::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("'{}' is not in memory", path)))
    }
}
