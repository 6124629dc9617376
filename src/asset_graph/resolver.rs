use std::collections::{HashMap, HashSet, VecDeque};

use itertools::Itertools;
use log::{debug, trace};
use strata_files::common::types::{Reference, ResourceKey};

use crate::asset_graph::cache::ResourceCache;
use crate::asset_graph::resource::Resource;
use crate::error::LoadError;
use crate::io::archive::loader::LoadedArchive;

/// The resources staged by one resolution, root first. Every reference is resolved, either to a
/// member of the graph or to a resource that was already published.
#[derive(Debug)]
pub struct ResolvedGraph {
    pub resources: Vec<Resource>,
}

impl ResolvedGraph {
    pub fn root(&self) -> &Resource {
        &self.resources[0]
    }
}

// A reference whose target is staged but not published yet, rewritten in the second pass.
struct DeferredEdge {
    source: usize,
    ordinal: usize,
    target: ResourceKey,
}

/// Walks the references of a resource breadth first, parsing everything reachable that is not
/// published yet. Runs without holding any cache lock, the caller publishes the result.
pub struct Resolver<'a> {
    archive: &'a LoadedArchive,
    published: &'a ResourceCache<ResourceKey, Resource>,
}

impl<'a> Resolver<'a> {
    pub fn new(archive: &'a LoadedArchive, published: &'a ResourceCache<ResourceKey, Resource>) -> Self {
        Self { archive, published }
    }

    pub fn resolve(&self, root: ResourceKey) -> Result<ResolvedGraph, LoadError> {
        let mut staged: Vec<Resource> = Vec::new();
        let mut positions: HashMap<ResourceKey, usize> = HashMap::new();
        let mut discovered = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut deferred: Vec<DeferredEdge> = Vec::new();

        // First pass: parse everything reachable, resolve what is published already
        while let Some(key) = queue.pop_front() {
            let entry = self.archive.entry(&key).ok_or(LoadError::NotFound { key })?;
            let mut data = self.archive.parse(&key)?;
            let source = staged.len();

            for (ordinal, field) in data.references_mut().into_iter().enumerate() {
                let Reference::Unresolved { index } = *field.reference else {
                    continue;
                };

                let target = self
                    .archive
                    .key_for(field.target, index)
                    .ok_or(LoadError::UnresolvedReference {
                        key,
                        field: field.field,
                        target: field.target,
                        index,
                    })?;

                if self.published.contains(&target) {
                    trace!("{}.{} -> {} (published)", key, field.field, target);
                    *field.reference = Reference::Resolved(target);
                    continue;
                }

                // a target that was discovered before is either in progress (a cycle) or shared,
                // it is never walked twice
                debug!("Deferring {}.{} -> {}", key, field.field, target);
                deferred.push(DeferredEdge {
                    source,
                    ordinal,
                    target,
                });
                if discovered.insert(target) {
                    queue.push_back(target);
                }
            }

            positions.insert(key, source);
            staged.push(Resource {
                key,
                path: entry.path.clone(),
                data,
            });
        }

        // Second pass: every deferred target is staged now
        let by_source = deferred.iter().chunk_by(|edge| edge.source);
        for (source, edges) in &by_source {
            let mut fields = staged[source].data.references_mut();
            for edge in edges {
                if !positions.contains_key(&edge.target) {
                    return Err(LoadError::NotFound { key: edge.target });
                }
                *fields[edge.ordinal].reference = Reference::Resolved(edge.target);
            }
        }

        debug_assert!(staged.iter().all(Resource::is_resolved));
        debug!(
            "Resolved {}: {} resources staged, {} deferred edges",
            root,
            staged.len(),
            deferred.len()
        );

        Ok(ResolvedGraph { resources: staged })
    }
}
