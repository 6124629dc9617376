use std::fmt::Debug;
use std::sync::Mutex;

use glam::Vec3;
use itertools::Itertools;
use log::trace;
use strata_files::terrain::types::TerrainTiles;

use crate::asset_graph::resource::Resource;
use crate::util::session_cache::Releasable;

/// An object owned by a collaborator (e.g. a GPU buffer) that a derived value was uploaded to.
pub trait ExternalHandle: Send + Debug {
    fn release(self: Box<Self>);
}

/// Handles attached to one derived value, released together with it.
#[derive(Debug, Default)]
pub struct AttachedHandles {
    handles: Mutex<Vec<Box<dyn ExternalHandle>>>,
}

impl AttachedHandles {
    pub fn attach(&self, handle: Box<dyn ExternalHandle>) {
        self.handles
            .lock()
            .expect("Get the lock on the handles")
            .push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.lock().expect("Get the lock on the handles").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn release_all(&self) -> usize {
        let handles = std::mem::take(&mut *self.handles.lock().expect("Get the lock on the handles"));
        let count = handles.len();
        for handle in handles {
            handle.release();
        }
        count
    }
}

impl Releasable for AttachedHandles {
    fn release(&self) {
        self.release_all();
    }
}

/// Axis aligned bounds of a terrain, overall and per tile. Heights are scaled by the tile's
/// height scale. `tiles` lines up with the terrain's tiles, `None` for tiles without vertices.
#[derive(Debug)]
pub struct TerrainBounds {
    pub min: Vec3,
    pub max: Vec3,
    pub tiles: Vec<Option<(Vec3, Vec3)>>,
    pub handles: AttachedHandles,
}

impl TerrainBounds {
    /// `None` for resources that are not terrain.
    pub fn of(resource: &Resource) -> Option<TerrainBounds> {
        resource.data.as_terrain().map(TerrainBounds::from_terrain)
    }

    pub fn from_terrain(terrain: &TerrainTiles) -> TerrainBounds {
        let tiles = terrain
            .tiles
            .iter()
            .map(|tile| {
                terrain
                    .tile_vertices(tile)
                    .iter()
                    .map(|vertex| Vec3::new(vertex.x, vertex.y, vertex.z * tile.height_scale))
                    .fold(None, |bounds: Option<(Vec3, Vec3)>, point| match bounds {
                        Some((min, max)) => Some((min.min(point), max.max(point))),
                        None => Some((point, point)),
                    })
            })
            .collect_vec();

        let (min, max) = tiles
            .iter()
            .flatten()
            .copied()
            .reduce(|(min_a, max_a), (min_b, max_b)| (min_a.min(min_b), max_a.max(max_b)))
            .unwrap_or((Vec3::ZERO, Vec3::ZERO));

        trace!("Terrain bounds {} .. {} over {} tiles", min, max, tiles.len());
        TerrainBounds {
            min,
            max,
            tiles,
            handles: AttachedHandles::default(),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }
}

impl Releasable for TerrainBounds {
    fn release(&self) {
        let released = self.handles.release_all();
        if released > 0 {
            trace!("Released {} handles of terrain bounds", released);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use strata_files::builder::sample_terrain;
    use strata_files::terrain::reader::TerrainReader;

    use super::*;

    #[derive(Debug)]
    struct CountedHandle(Arc<AtomicUsize>);

    impl ExternalHandle for CountedHandle {
        fn release(self: Box<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn bounds_cover_all_tiles() -> Result<(), anyhow::Error> {
        let terrain = TerrainReader::parse_asset(&sample_terrain(None, &[None, None, None]), None, None)?;
        let bounds = TerrainBounds::from_terrain(&terrain);

        assert_eq!(bounds.tiles.len(), 3);
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(3.0, 1.0, 2.0));
        assert_eq!(bounds.tiles[1].map(|(min, _)| min), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(bounds.center(), Vec3::new(1.5, 0.5, 1.0));
        Ok(())
    }

    #[test]
    fn tiles_without_vertices_keep_their_slot() -> Result<(), anyhow::Error> {
        let mut terrain = TerrainReader::parse_asset(&sample_terrain(None, &[None, None, None]), None, None)?;
        terrain.tiles[1].vertex_count = 0;
        terrain.tiles[1].index_count = 0;
        let bounds = TerrainBounds::from_terrain(&terrain);

        assert_eq!(bounds.tiles.len(), 3);
        assert!(bounds.tiles[1].is_none());
        assert_eq!(bounds.tiles[2].map(|(min, _)| min), Some(Vec3::new(2.0, 0.0, 0.0)));
        assert_eq!(bounds.min, Vec3::ZERO);
        assert_eq!(bounds.max, Vec3::new(3.0, 1.0, 2.0));
        Ok(())
    }

    #[test]
    fn empty_terrain_has_no_extent() -> Result<(), anyhow::Error> {
        let terrain = TerrainReader::parse_asset(&sample_terrain(None, &[]), None, None)?;
        let bounds = TerrainBounds::from_terrain(&terrain);
        assert_eq!(bounds.extent(), Vec3::ZERO);
        Ok(())
    }

    #[test]
    fn release_drains_handles() {
        let released = Arc::new(AtomicUsize::new(0));
        let handles = AttachedHandles::default();
        handles.attach(Box::new(CountedHandle(released.clone())));
        handles.attach(Box::new(CountedHandle(released.clone())));

        handles.release();
        handles.release();
        assert!(handles.is_empty());
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }
}
