use std::sync::Arc;

use clap::Parser;
use itertools::Itertools;
use strata::asset_graph::derived::TerrainBounds;
use strata::asset_graph::manager::AssetManager;
use strata::asset_graph::resource::Resource;
use strata::io::common::loader::DirectorySource;
use strata::settings::{CliArgs, OperationMode};
use strata::util::session_cache::SessionCache;
use strata_files::common::types::{ResourceKey, ResourceKind};
use strata_files::resource::ParsedResource;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let args = CliArgs::parse();
    log::trace!("Starting with args: {:?}", args);

    let manager = AssetManager::new(DirectorySource::new(&args.data_dir));
    match args.operation_mode {
        OperationMode::List { archive } => {
            let id = manager.register_archive(&archive);
            let loaded = manager.archive(id).await?;
            for entry in loaded.container().entries() {
                let key = ResourceKind::from_type_tag(entry.type_tag)
                    .and_then(|_| loaded.key_for_path(&entry.path))
                    .map_or_else(|| "-".to_owned(), |key| key.to_string());
                println!("{:<4} {:>10} {:<14} {}", entry.type_tag_str(), entry.length, key, entry.path);
            }
        }
        OperationMode::Load { archive, kind, index } => {
            let id = manager.register_archive(&archive);
            let root = manager
                .load_resource(ResourceKey::new(id, kind.into(), index))
                .await?;

            let mut graph = vec![root.clone()];
            let mut position = 0;
            while position < graph.len() {
                let dependencies = graph[position].dependencies().unique().collect_vec();
                for key in dependencies {
                    if graph.iter().all(|resource| resource.key != key) {
                        if let Some(resource) = manager.resource(&key) {
                            graph.push(resource);
                        }
                    }
                }
                position += 1;
            }

            for resource in &graph {
                print_resource(resource);
            }
            println!("{:?}", manager.statistics());
        }
        OperationMode::Bounds { archive, index } => {
            let id = manager.register_archive(&archive);
            let terrain = manager
                .load_resource(ResourceKey::new(id, ResourceKind::TerrainTiles, index))
                .await?;

            let Some(tiles) = terrain.data.as_terrain() else {
                anyhow::bail!("{} is not a terrain", terrain.key);
            };

            let cache = SessionCache::<TerrainBounds>::new();
            let bounds = cache.get_or_create(&terrain, |_| TerrainBounds::from_terrain(tiles));
            println!("{} min {} max {} extent {}", terrain.key, bounds.min, bounds.max, bounds.extent());
            for (tile, extent) in bounds.tiles.iter().enumerate() {
                match extent {
                    Some((min, max)) => println!("  tile {:>4}: {} .. {}", tile, min, max),
                    None => println!("  tile {:>4}: no vertices", tile),
                }
            }
            cache.destroy();
        }
    }

    Ok(())
}

fn print_resource(resource: &Arc<Resource>) {
    let summary = match &resource.data {
        ParsedResource::TerrainTiles(terrain) => format!(
            "{}x{} grid, {} tiles, {} vertices, animation: {}, swaps: {}",
            terrain.grid_width,
            terrain.grid_height,
            terrain.tiles.len(),
            terrain.vertices.len(),
            terrain.animation.is_some(),
            terrain.material_swaps.is_some()
        ),
        ParsedResource::Environment(environment) => {
            format!("fog {}..{}", environment.fog_near, environment.fog_far)
        }
        ParsedResource::Texture(texture) => format!(
            "{}x{} {:?}, {} mips",
            texture.width, texture.height, texture.format, texture.mip_count
        ),
        ParsedResource::TextureSequence(sequence) => format!(
            "{} frames every {}ms",
            sequence.frames.len(),
            sequence.frame_duration
        ),
    };

    println!(
        "{} {} ({}): {}",
        resource.key,
        resource.path,
        resource.name().unwrap_or("unnamed"),
        summary
    );
    for (field, target, reference) in resource.data.references() {
        if let Some(key) = reference.key() {
            println!("    {} -> {} ({})", field, key, target);
        }
    }
}
