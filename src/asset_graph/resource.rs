use strata_files::common::types::{Reference, ResourceKey};
use strata_files::resource::ParsedResource;

/// A parsed resource as published in the cache. Once published, none of its references is
/// [`Reference::Unresolved`].
#[derive(Debug)]
pub struct Resource {
    pub key: ResourceKey,
    /// Path inside the archive.
    pub path: String,
    pub data: ParsedResource,
}

impl Resource {
    pub fn name(&self) -> Option<&str> {
        self.data.name()
    }

    /// Keys of all resources this one links to, in field order, duplicates included.
    pub fn dependencies(&self) -> impl Iterator<Item = ResourceKey> + '_ {
        self.data
            .references()
            .into_iter()
            .filter_map(|(_, _, reference)| reference.key())
    }

    pub fn is_resolved(&self) -> bool {
        self.data
            .references()
            .iter()
            .all(|(_, _, reference)| !matches!(reference, Reference::Unresolved { .. }))
    }
}
