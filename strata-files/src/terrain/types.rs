use bitflags::bitflags;
use strata_files_derive_parseable::Parse;

use crate::common::chunk::chunk_tags;
use crate::common::types::{C3Vector, Reference, fourcc};

pub const TERRAIN_VERSION: u32 = 2;
pub const ANIMATION_VERSION: u32 = 1;
pub const MATERIAL_SWAP_VERSION: u32 = 1;

pub const FOURCC_TERRAIN_ANIMATION: u32 = fourcc(b"TANM");
pub const FOURCC_MATERIAL_SWAPS: u32 = fourcc(b"TMSW");

pub const ANIMATION_EXTENSION: &str = "tta";
pub const MATERIAL_SWAP_EXTENSION: &str = "ttm";

chunk_tags! {
    pub enum TerrainChunk {
        Header = b"THDR",
        Tiles = b"TILE",
        Vertices = b"VERT",
        Indices = b"INDX",
        Strings = b"STRS",
    }
}

chunk_tags! {
    pub enum AnimationChunk {
        Header = b"AHDR",
        Keys = b"KEYS",
    }
}

chunk_tags! {
    pub enum MaterialSwapChunk {
        Swaps = b"SWAP",
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct TerrainFlags: u32 {
        const HAS_WATER = 0x1;
        const CAST_SHADOWS = 0x2;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct AnimationFlags: u32 {
        const LOOPING = 0x1;
    }
}

#[derive(Debug, Clone, Parse)]
pub struct TerrainHeader {
    pub grid_width: u16,
    pub grid_height: u16,
    pub tile_count: u32,
    pub environment: Reference,
    pub flags: u32,
}

#[derive(Debug, Clone, Parse)]
pub struct TileRecord {
    pub name_offset: u32, // into STRS
    pub texture: Reference,
    pub vertex_start: u32,
    pub vertex_count: u32,
    pub index_start: u32,
    pub index_count: u32,
    pub height_scale: f32,
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub name: Option<String>,
    pub texture: Reference,
    pub vertex_start: u32,
    pub vertex_count: u32,
    pub index_start: u32,
    pub index_count: u32,
    pub height_scale: f32,
}

#[derive(Debug, Clone)]
pub struct TerrainTiles {
    pub version: u32,
    pub grid_width: u16,
    pub grid_height: u16,
    pub flags: TerrainFlags,
    pub environment: Reference,
    pub tiles: Vec<Tile>,
    pub vertices: Vec<C3Vector>,
    /// Relative to the owning tile's `vertex_start`.
    pub indices: Vec<u16>,
    pub animation: Option<TerrainAnimation>,
    pub material_swaps: Option<MaterialSwaps>,
}

impl TerrainTiles {
    // The ranges are validated by the reader, so slicing cannot go out of bounds.
    pub fn tile_vertices(&self, tile: &Tile) -> &[C3Vector] {
        let start = tile.vertex_start as usize;
        &self.vertices[start..start + tile.vertex_count as usize]
    }

    pub fn tile_indices(&self, tile: &Tile) -> &[u16] {
        let start = tile.index_start as usize;
        &self.indices[start..start + tile.index_count as usize]
    }
}

#[derive(Debug, Clone, Parse)]
pub struct AnimationHeader {
    pub duration: f32,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Parse)]
pub struct Keyframe {
    pub tile: u32,
    pub time: f32,
    pub offset: C3Vector,
}

/// The `.tta` sibling: per tile offset tracks.
#[derive(Debug, Clone)]
pub struct TerrainAnimation {
    pub duration: f32,
    pub flags: AnimationFlags,
    pub keyframes: Vec<Keyframe>,
}

impl TerrainAnimation {
    pub fn keyframes_for(&self, tile: u32) -> impl Iterator<Item = &Keyframe> {
        self.keyframes.iter().filter(move |key| key.tile == tile)
    }
}

#[derive(Debug, Clone, Parse)]
pub struct MaterialSwap {
    pub tile: u32,
    pub frame: u32,
    pub texture: Reference,
}

/// The `.ttm` sibling: texture replacements per tile and frame.
#[derive(Debug, Clone)]
pub struct MaterialSwaps {
    pub swaps: Vec<MaterialSwap>,
}
