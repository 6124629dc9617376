use std::sync::Arc;

use strata::LoadError;
use strata::asset_graph::derived::TerrainBounds;
use strata::asset_graph::manager::AssetManager;
use strata::io::common::loader::{AssetSource, DirectorySource, MemorySource};
use strata::util::session_cache::SessionCache;
use strata_archive::builder::ContainerBuilder;
use strata_files::builder::{
    sample_animation, sample_environment, sample_material_swaps, sample_sequence, sample_terrain, sample_texture,
};
use strata_files::common::types::{ArchiveId, Reference, ResourceKey, ResourceKind};

fn world(with_siblings: bool) -> Vec<u8> {
    let mut builder = ContainerBuilder::new();
    builder
        .add_file("maps/field.ttb", *b"TTBL", sample_terrain(Some(0), &[Some(0), Some(1)]))
        .add_file("maps/field.env", *b"ENVR", sample_environment(Some(0), None, "field"))
        .add_file("textures/water.tex", *b"TXTR", sample_texture(Some(0), "water"))
        .add_file("textures/grass.tex", *b"TXTR", sample_texture(None, "grass"))
        .add_file("textures/water.tsq", *b"TSEQ", sample_sequence(&[0], "water"));
    if with_siblings {
        builder
            .add_file("maps/field.tta", *b"TANM", sample_animation())
            .add_file("maps/field.ttm", *b"TMSW", sample_material_swaps(1));
    }
    builder.build_compressed()
}

fn manager(with_siblings: bool) -> (AssetManager<MemorySource>, ArchiveId) {
    let mut source = MemorySource::new();
    source.insert("world.sarc", world(with_siblings));
    let manager = AssetManager::new(source);
    let id = manager.register_archive("world.sarc");
    (manager, id)
}

#[test_log::test(tokio::test)]
async fn end_to_end_with_sibling() -> Result<(), anyhow::Error> {
    let (manager, id) = manager(true);
    let key = ResourceKey::new(id, ResourceKind::TerrainTiles, 0);

    let terrain = manager.load_resource(key).await?;
    let tiles = terrain.data.as_terrain().expect("terrain");
    let animation = tiles.animation.as_ref().expect("animation sibling");
    assert_eq!(animation.keyframes.len(), 2);
    let swaps = tiles.material_swaps.as_ref().expect("material swap sibling");
    assert_eq!(
        swaps.swaps[0].texture,
        Reference::Resolved(ResourceKey::new(id, ResourceKind::Texture, 1))
    );

    let statistics = manager.statistics();
    assert_eq!(statistics.archives_opened, 1);
    assert_eq!(statistics.resources_parsed, 5);
    assert_eq!(statistics.resources_cached, 5);

    let again = manager.load_resource(key).await?;
    assert!(Arc::ptr_eq(&terrain, &again));
    assert_eq!(manager.statistics(), statistics);
    assert_eq!(manager.source().fetch_count(), 1);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn missing_sibling_is_none() -> Result<(), anyhow::Error> {
    let (manager, id) = manager(false);
    let terrain = manager
        .load_resource(ResourceKey::new(id, ResourceKind::TerrainTiles, 0))
        .await?;

    let tiles = terrain.data.as_terrain().expect("terrain");
    assert!(tiles.animation.is_none());
    assert!(tiles.material_swaps.is_none());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn cycles_link_to_the_shared_instances() -> Result<(), anyhow::Error> {
    let (manager, id) = manager(false);
    let terrain = manager
        .load_resource(ResourceKey::new(id, ResourceKind::TerrainTiles, 0))
        .await?;

    let tiles = terrain.data.as_terrain().expect("terrain");
    let environment = manager.follow(&tiles.environment).expect("environment is published");
    let back = manager
        .follow(&environment.data.as_environment().expect("environment").terrain)
        .expect("terrain is published");
    assert!(Arc::ptr_eq(&terrain, &back));

    let water = manager.follow(&tiles.tiles[0].texture).expect("texture is published");
    let sequence = manager
        .follow(&water.data.as_texture().expect("texture").sequence)
        .expect("sequence is published");
    let frame = manager
        .follow(&sequence.data.as_sequence().expect("sequence").frames[0])
        .expect("frame is published");
    assert!(Arc::ptr_eq(&water, &frame));

    // loading a member of the graph directly hands out the same instance
    let direct = manager.load_resource(water.key).await?;
    assert!(Arc::ptr_eq(&water, &direct));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn concurrent_loads_share_the_archive() -> Result<(), anyhow::Error> {
    let (manager, id) = manager(false);
    let (grass, sequence) = tokio::join!(
        manager.load_resource(ResourceKey::new(id, ResourceKind::Texture, 1)),
        manager.load_resource(ResourceKey::new(id, ResourceKind::TextureSequence, 0)),
    );

    assert_eq!(grass?.name(), Some("grass"));
    assert_eq!(sequence?.name(), Some("water"));
    assert_eq!(manager.source().fetch_count(), 1);
    assert_eq!(manager.statistics().archives_opened, 1);
    Ok(())
}

/// Suspends once before every fetch, so loads in flight interleave.
struct YieldingSource(MemorySource);

impl AssetSource for YieldingSource {
    async fn fetch(&self, path: &str) -> std::io::Result<Vec<u8>> {
        tokio::task::yield_now().await;
        self.0.fetch(path).await
    }
}

#[test_log::test(tokio::test)]
async fn concurrent_loads_of_one_key_parse_once() -> Result<(), anyhow::Error> {
    let mut source = MemorySource::new();
    source.insert("world.sarc", world(true));
    let manager = AssetManager::new(YieldingSource(source));
    let id = manager.register_archive("world.sarc");
    let key = ResourceKey::new(id, ResourceKind::TerrainTiles, 0);

    let (first, second) = tokio::join!(manager.load_resource(key), manager.load_resource(key));
    let (first, second) = (first?, second?);
    assert!(Arc::ptr_eq(&first, &second));

    let statistics = manager.statistics();
    assert_eq!(statistics.archives_opened, 1);
    assert_eq!(statistics.resources_parsed, 5);
    assert_eq!(statistics.resources_cached, 5);
    assert_eq!(manager.source().0.fetch_count(), 1);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn unload_forgets_everything()-> Result<(), anyhow::Error> {
    let (manager, id) = manager(false);
    let key = ResourceKey::new(id, ResourceKind::Texture, 1);
    let first = manager.load_resource(key).await?;

    manager.unload();
    assert!(manager.resource(&key).is_none());
    assert_eq!(manager.statistics().archives_loaded, 0);

    let second = manager.load_resource(key).await?;
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(manager.statistics().archives_opened, 2);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn released_archive_keeps_resources() -> Result<(), anyhow::Error> {
    let (manager, id) = manager(false);
    let key = ResourceKey::new(id, ResourceKind::Texture, 1);
    let texture = manager.load_resource(key).await?;

    assert!(manager.release_archive(id));
    assert!(!manager.release_archive(id));
    let cached = manager.resource(&key).expect("still published");
    assert!(Arc::ptr_eq(&texture, &cached));

    manager.archive(id).await?;
    assert_eq!(manager.statistics().archives_opened, 2);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn registration_is_by_path() -> Result<(), anyhow::Error> {
    let (manager, id) = manager(false);
    assert_eq!(manager.register_archive("world.sarc"), id);
    let other = manager.register_archive("missing.sarc");
    assert_ne!(other, id);

    let err = manager
        .load_resource(ResourceKey::new(other, ResourceKind::Texture, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Fetch { ref path, .. } if path == "missing.sarc"));

    let err = manager.archive(ArchiveId(99)).await.unwrap_err();
    assert!(matches!(err, LoadError::UnknownArchive(ArchiveId(99))));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn broken_archive_publishes_nothing() -> Result<(), anyhow::Error> {
    let mut bytes = world(false);
    // corrupt the compressed stream's magic
    bytes[0] = b'X';
    let mut source = MemorySource::new();
    source.insert("broken.sarc", bytes);
    let manager = AssetManager::new(source);
    let id = manager.register_archive("broken.sarc");

    let err = manager
        .load_resource(ResourceKey::new(id, ResourceKind::Texture, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, LoadError::Archive { .. }));
    assert_eq!(manager.statistics().resources_cached, 0);
    assert_eq!(manager.statistics().archives_loaded, 0);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn failed_fetch_is_retried() -> Result<(), anyhow::Error> {
    let root = std::env::temp_dir().join(format!("strata-retry-{}", std::process::id()));
    std::fs::create_dir_all(&root)?;
    let manager = AssetManager::new(DirectorySource::new(&root));
    let id = manager.register_archive("late.sarc");
    let key = ResourceKey::new(id, ResourceKind::TerrainTiles, 0);

    let err = manager.load_resource(key).await.unwrap_err();
    assert!(matches!(err, LoadError::Fetch { .. }));

    std::fs::write(root.join("late.sarc"), world(true))?;
    let terrain = manager.load_resource(key).await?;
    assert!(terrain.data.as_terrain().expect("terrain").animation.is_some());

    std::fs::remove_dir_all(&root)?;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn directory_source_stays_inside_its_root() {
    let source = DirectorySource::new(std::env::temp_dir());
    let err = source.fetch("../etc/passwd").await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test_log::test(tokio::test)]
async fn derived_values_follow_the_source() -> Result<(), anyhow::Error> {
    let (manager, id) = manager(false);
    let key = ResourceKey::new(id, ResourceKind::TerrainTiles, 0);
    let bounds = SessionCache::<TerrainBounds>::new();

    let terrain = manager.load_resource(key).await?;
    let factory = |resource: &strata::asset_graph::resource::Resource| {
        TerrainBounds::of(resource).expect("terrain resource")
    };
    let first = bounds.get_or_create(&terrain, factory);
    let second = bounds.get_or_create(&terrain, factory);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.tiles.len(), 2);

    manager.unload();
    drop(terrain);
    let reloaded = manager.load_resource(key).await?;
    let third = bounds.get_or_create(&reloaded, factory);
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(bounds.len(), 1);

    assert_eq!(bounds.destroy(), 1);
    Ok(())
}
