use std::collections::HashMap;

use log::{info, trace, warn};
use strata_archive::{ArchiveError, Compression, Container, FileEntry, RawArchive};
use strata_files::common::types::{ArchiveId, ResourceKey, ResourceKind};
use strata_files::resource::{ParsedResource, ResourceReader, Siblings};
use strata_files::terrain::types::{ANIMATION_EXTENSION, MATERIAL_SWAP_EXTENSION};

use crate::error::LoadError;

/// A decompressed and parsed archive, with its files indexed per resource kind.
#[derive(Debug)]
pub struct LoadedArchive {
    id: ArchiveId,
    path: String,
    container: Container,
    // positions into container.entries(), in declaration order
    by_kind: HashMap<ResourceKind, Vec<usize>>,
}

impl LoadedArchive {
    pub fn open(id: ArchiveId, path: &str, bytes: Vec<u8>) -> Result<LoadedArchive, ArchiveError> {
        let raw = RawArchive::new(bytes)?;
        if let Compression::Lz { decompressed_size } = raw.compression() {
            trace!("{} is compressed, {} bytes unpacked", path, decompressed_size);
        }

        let container = Container::parse(raw.into_decompressed()?)?;
        let mut by_kind: HashMap<ResourceKind, Vec<usize>> = HashMap::new();
        for (position, entry) in container.entries().iter().enumerate() {
            if let Some(kind) = ResourceKind::from_type_tag(entry.type_tag) {
                by_kind.entry(kind).or_default().push(position);
            }
        }

        info!(
            "Opened archive {} as {}: {} files, {} directories",
            path,
            id,
            container.len(),
            container.directories().len()
        );

        Ok(LoadedArchive {
            id,
            path: path.to_owned(),
            container,
            by_kind,
        })
    }

    pub fn id(&self) -> ArchiveId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn count(&self, kind: ResourceKind) -> u32 {
        self.by_kind.get(&kind).map_or(0, |positions| positions.len() as u32)
    }

    /// The key of the `index`-th file of `kind`, if there is one.
    pub fn key_for(&self, kind: ResourceKind, index: u32) -> Option<ResourceKey> {
        (index < self.count(kind)).then(|| ResourceKey::new(self.id, kind, index))
    }

    pub fn keys(&self, kind: ResourceKind) -> impl Iterator<Item = ResourceKey> + '_ {
        (0..self.count(kind)).map(move |index| ResourceKey::new(self.id, kind, index))
    }

    /// Looks a resource up by its path inside the archive.
    pub fn key_for_path(&self, path: &str) -> Option<ResourceKey> {
        let entry = self.container.find(path)?;
        let kind = ResourceKind::from_type_tag(entry.type_tag)?;
        let position = self
            .by_kind
            .get(&kind)?
            .iter()
            .position(|&candidate| std::ptr::eq(&self.container.entries()[candidate], entry))?;
        Some(ResourceKey::new(self.id, kind, position as u32))
    }

    pub fn entry(&self, key: &ResourceKey) -> Option<&FileEntry> {
        if key.archive != self.id {
            return None;
        }

        let position = *self.by_kind.get(&key.kind)?.get(key.index as usize)?;
        self.container.entries().get(position)
    }

    /// Parses a single resource, discovering sibling files where the kind has any. References stay
    /// unresolved.
    pub fn parse(&self, key: &ResourceKey) -> Result<ParsedResource, LoadError> {
        let entry = self.entry(key).ok_or(LoadError::NotFound { key: *key })?;
        trace!("Parsing {} from {}", key, entry.path);

        let siblings = match key.kind {
            ResourceKind::TerrainTiles => Siblings {
                animation: self.sibling_data(entry, ANIMATION_EXTENSION),
                material_swaps: self.sibling_data(entry, MATERIAL_SWAP_EXTENSION),
            },
            _ => Siblings::default(),
        };

        ResourceReader::parse(key.kind, self.container.file_data(entry), siblings).map_err(|source| {
            LoadError::Format {
                key: *key,
                path: entry.path.clone(),
                source,
            }
        })
    }

    fn sibling_data(&self, entry: &FileEntry, extension: &str) -> Option<&[u8]> {
        match self.container.sibling(entry, extension) {
            Some(sibling) => {
                trace!("Found sibling {} for {}", sibling.path, entry.path);
                Some(self.container.file_data(sibling))
            }
            None => {
                warn!("{} has no .{} sibling", entry.path, extension);
                None
            }
        }
    }
}
