use std::collections::HashMap;

use log::trace;

use crate::ParserError;
use crate::common::chunk::{Chunk, ChunkTable};
use crate::common::reader::StringBlock;
use crate::common::types::{ABSENT_REFERENCE, C3Vector, ResourceKind};
use crate::terrain::types::{
    ANIMATION_VERSION, AnimationChunk, AnimationFlags, AnimationHeader, FOURCC_MATERIAL_SWAPS,
    FOURCC_TERRAIN_ANIMATION, Keyframe, MATERIAL_SWAP_VERSION, MaterialSwap, MaterialSwapChunk, MaterialSwaps,
    TERRAIN_VERSION, TerrainAnimation, TerrainChunk, TerrainFlags, TerrainHeader, TerrainTiles, Tile, TileRecord,
};

pub struct TerrainReader {}

impl TerrainReader {
    /// Parses a terrain base file together with its optional `.tta` and `.ttm` siblings.
    pub fn parse_asset(
        base: &[u8],
        animation: Option<&[u8]>,
        material_swaps: Option<&[u8]>,
    ) -> Result<TerrainTiles, ParserError> {
        let table = ChunkTable::<TerrainChunk>::read(base)?;
        let version = table.expect(ResourceKind::TerrainTiles.magic(), &[TERRAIN_VERSION])?;

        let header = table.mandatory::<TerrainHeader>(TerrainChunk::Header)?;
        let tile_chunk = table.mandatory_chunk(TerrainChunk::Tiles)?;
        let records = tile_chunk.read_records::<TileRecord>()?;
        if records.len() != header.tile_count as usize {
            return Err(tile_chunk.invalid(format!(
                "{} tile records, but the header declares {}",
                records.len(),
                header.tile_count
            )));
        }

        let vertices = table
            .mandatory_chunk(TerrainChunk::Vertices)?
            .read_records::<C3Vector>()?;
        let index_chunk = table.mandatory_chunk(TerrainChunk::Indices)?;
        let indices = index_chunk.read_records::<u16>()?;
        let strings = table
            .optional::<StringBlock>(TerrainChunk::Strings)?
            .unwrap_or_default();

        let tiles = records
            .into_iter()
            .map(|record| Self::read_tile(record, tile_chunk, index_chunk, &vertices, &indices, &strings))
            .collect::<Result<Vec<Tile>, ParserError>>()?;

        trace!(
            "Terrain {}x{}: {} tiles, {} vertices, {} indices",
            header.grid_width,
            header.grid_height,
            tiles.len(),
            vertices.len(),
            indices.len()
        );

        let animation = animation
            .map(|buffer| Self::parse_animation(buffer, tiles.len()))
            .transpose()
            .map_err(|source| ParserError::SiblingError {
                sibling: "animation",
                source: Box::new(source),
            })?;

        let material_swaps = material_swaps
            .map(|buffer| Self::parse_material_swaps(buffer, tiles.len()))
            .transpose()
            .map_err(|source| ParserError::SiblingError {
                sibling: "material swap",
                source: Box::new(source),
            })?;

        Ok(TerrainTiles {
            version,
            grid_width: header.grid_width,
            grid_height: header.grid_height,
            flags: TerrainFlags::from_bits_retain(header.flags),
            environment: header.environment,
            tiles,
            vertices,
            indices,
            animation,
            material_swaps,
        })
    }

    fn read_tile(
        record: TileRecord,
        tile_chunk: &Chunk<TerrainChunk>,
        index_chunk: &Chunk<TerrainChunk>,
        vertices: &[C3Vector],
        indices: &[u16],
        strings: &StringBlock,
    ) -> Result<Tile, ParserError> {
        let within = |start: u32, count: u32, len: usize| start as u64 + count as u64 <= len as u64;

        if !within(record.vertex_start, record.vertex_count, vertices.len()) {
            return Err(tile_chunk.invalid(format!(
                "vertex range {}+{} exceeds {} vertices",
                record.vertex_start,
                record.vertex_count,
                vertices.len()
            )));
        }

        if !within(record.index_start, record.index_count, indices.len()) {
            return Err(tile_chunk.invalid(format!(
                "index range {}+{} exceeds {} indices",
                record.index_start,
                record.index_count,
                indices.len()
            )));
        }

        if record.index_count % 3 != 0 {
            return Err(tile_chunk.invalid(format!(
                "index count {} is not a multiple of 3",
                record.index_count
            )));
        }

        let start = record.index_start as usize;
        let tile_indices = &indices[start..start + record.index_count as usize];
        if let Some(index) = tile_indices
            .iter()
            .find(|&&index| index as u32 >= record.vertex_count)
        {
            return Err(index_chunk.invalid(format!(
                "index {} is out of range for a tile with {} vertices",
                index, record.vertex_count
            )));
        }

        let name = match record.name_offset {
            ABSENT_REFERENCE => None,
            offset => Some(
                strings
                    .get(offset)
                    .ok_or_else(|| tile_chunk.invalid(format!("name offset {} does not name a string", offset)))?
                    .to_owned(),
            ),
        };

        Ok(Tile {
            name,
            texture: record.texture,
            vertex_start: record.vertex_start,
            vertex_count: record.vertex_count,
            index_start: record.index_start,
            index_count: record.index_count,
            height_scale: record.height_scale,
        })
    }

    pub fn parse_animation(buffer: &[u8], tile_count: usize) -> Result<TerrainAnimation, ParserError> {
        let table = ChunkTable::<AnimationChunk>::read(buffer)?;
        table.expect(FOURCC_TERRAIN_ANIMATION, &[ANIMATION_VERSION])?;

        let header = table.mandatory::<AnimationHeader>(AnimationChunk::Header)?;
        let key_chunk = table.mandatory_chunk(AnimationChunk::Keys)?;
        let keyframes = key_chunk.read_records::<Keyframe>()?;

        let mut last_time = HashMap::<u32, f32>::new();
        for key in &keyframes {
            if key.tile as usize >= tile_count {
                return Err(key_chunk.invalid(format!(
                    "keyframe for tile {} of {}",
                    key.tile, tile_count
                )));
            }

            let previous = last_time.insert(key.tile, key.time);
            if previous.is_some_and(|previous| key.time < previous) {
                return Err(key_chunk.invalid(format!("keyframe times of tile {} decrease", key.tile)));
            }
        }

        Ok(TerrainAnimation {
            duration: header.duration,
            flags: AnimationFlags::from_bits_retain(header.flags),
            keyframes,
        })
    }

    pub fn parse_material_swaps(buffer: &[u8], tile_count: usize) -> Result<MaterialSwaps, ParserError> {
        let table = ChunkTable::<MaterialSwapChunk>::read(buffer)?;
        table.expect(FOURCC_MATERIAL_SWAPS, &[MATERIAL_SWAP_VERSION])?;

        let swap_chunk = table.mandatory_chunk(MaterialSwapChunk::Swaps)?;
        let swaps = swap_chunk.read_records::<MaterialSwap>()?;
        for swap in &swaps {
            if swap.tile as usize >= tile_count {
                return Err(swap_chunk.invalid(format!("swap for tile {} of {}", swap.tile, tile_count)));
            }

            if swap.texture.is_absent() {
                return Err(swap_chunk.invalid(format!("swap for tile {} has no texture", swap.tile)));
            }
        }

        Ok(MaterialSwaps { swaps })
    }
}
