//! Writers for resource fixtures, in the layout the readers expect.

use crate::common::types::{ABSENT_REFERENCE, C3Vector};

/// Assembles a resource file: the 12 byte header followed by the chunks in insertion order.
pub struct ChunkWriter {
    magic: [u8; 4],
    version: u32,
    chunks: Vec<([u8; 4], Vec<u8>)>,
}

impl ChunkWriter {
    pub fn new(magic: &[u8; 4], version: u32) -> Self {
        Self {
            magic: *magic,
            version,
            chunks: Vec::new(),
        }
    }

    pub fn chunk(&mut self, tag: &[u8; 4], payload: Vec<u8>) -> &mut Self {
        self.chunks.push((*tag, payload));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.magic);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&(self.chunks.len() as u32).to_le_bytes());
        for (tag, payload) in &self.chunks {
            out.extend_from_slice(tag);
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(payload);
        }
        out
    }
}

/// Little endian payload writer.
#[derive(Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(mut self, value: u8) -> Self {
        self.buf.push(value);
        self
    }

    pub fn u16(mut self, value: u16) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u32(mut self, value: u32) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn f32(mut self, value: f32) -> Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn vector(self, value: C3Vector) -> Self {
        self.f32(value.x).f32(value.y).f32(value.z)
    }

    pub fn cstring(mut self, value: &str) -> Self {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        self
    }

    pub fn bytes(mut self, value: &[u8]) -> Self {
        self.buf.extend_from_slice(value);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

pub fn reference(target: Option<u32>) -> u32 {
    target.unwrap_or(ABSENT_REFERENCE)
}

/// A terrain with one quad (4 vertices, 6 indices) per tile, tile `i` named `tile{i}`.
pub fn sample_terrain(environment: Option<u32>, tile_textures: &[Option<u32>]) -> Vec<u8> {
    let tile_count = tile_textures.len() as u32;
    let header = PayloadWriter::new()
        .u16(tile_count as u16)
        .u16(1)
        .u32(tile_count)
        .u32(reference(environment))
        .u32(1)
        .finish();

    let mut strings = PayloadWriter::new();
    let mut tiles = PayloadWriter::new();
    let mut vertices = PayloadWriter::new();
    let mut indices = PayloadWriter::new();
    let mut name_offset = 0u32;
    for (i, texture) in tile_textures.iter().enumerate() {
        let name = format!("tile{}", i);
        strings = strings.cstring(&name);
        tiles = tiles
            .u32(name_offset)
            .u32(reference(*texture))
            .u32(i as u32 * 4)
            .u32(4)
            .u32(i as u32 * 6)
            .u32(6)
            .f32(1.0);
        name_offset += name.len() as u32 + 1;

        let x = i as f32;
        for (dx, dy, z) in [(0.0, 0.0, 0.0), (1.0, 0.0, 0.5), (0.0, 1.0, 1.0), (1.0, 1.0, 2.0)] {
            vertices = vertices.vector(C3Vector { x: x + dx, y: dy, z });
        }
        for index in [0u16, 1, 2, 2, 1, 3] {
            indices = indices.u16(index);
        }
    }

    ChunkWriter::new(b"TTBL", 2)
        .chunk(b"THDR", header)
        .chunk(b"TILE", tiles.finish())
        .chunk(b"VERT", vertices.finish())
        .chunk(b"INDX", indices.finish())
        .chunk(b"STRS", strings.finish())
        .build()
}

/// Two keyframes for tile 0.
pub fn sample_animation() -> Vec<u8> {
    let header = PayloadWriter::new().f32(2.0).u32(1).finish();
    let keys = PayloadWriter::new()
        .u32(0)
        .f32(0.0)
        .vector(C3Vector::default())
        .u32(0)
        .f32(1.0)
        .vector(C3Vector { x: 0.0, y: 0.0, z: 0.25 })
        .finish();

    ChunkWriter::new(b"TANM", 1)
        .chunk(b"AHDR", header)
        .chunk(b"KEYS", keys)
        .build()
}

/// Swaps the texture of tile 0 in frame 1.
pub fn sample_material_swaps(texture: u32) -> Vec<u8> {
    let swaps = PayloadWriter::new().u32(0).u32(1).u32(texture).finish();
    ChunkWriter::new(b"TMSW", 1).chunk(b"SWAP", swaps).build()
}

pub fn sample_environment(terrain: Option<u32>, skybox: Option<u32>, name: &str) -> Vec<u8> {
    let header = PayloadWriter::new()
        .u32(0xFF80_4020)
        .f32(10.0)
        .f32(500.0)
        .u32(0xFF30_3030)
        .vector(C3Vector { x: 0.0, y: -1.0, z: -1.0 })
        .finish();
    let links = PayloadWriter::new()
        .u32(reference(terrain))
        .u32(reference(skybox))
        .finish();

    ChunkWriter::new(b"ENVR", 1)
        .chunk(b"EHDR", header)
        .chunk(b"ELNK", links)
        .chunk(b"NAME", PayloadWriter::new().cstring(name).finish())
        .build()
}

/// A 4x4 RGBA8 texture with a single mip level.
pub fn sample_texture(sequence: Option<u32>, name: &str) -> Vec<u8> {
    let header = PayloadWriter::new()
        .u16(4)
        .u16(4)
        .u8(0)
        .u8(1)
        .u16(0b11)
        .u32(reference(sequence))
        .finish();

    ChunkWriter::new(b"TXTR", 2)
        .chunk(b"TXHD", header)
        .chunk(b"TXDT", vec![0x7F; 4 * 4 * 4])
        .chunk(b"NAME", PayloadWriter::new().cstring(name).finish())
        .build()
}

pub fn sample_sequence(frames: &[u32], name: &str) -> Vec<u8> {
    let header = PayloadWriter::new()
        .f32(100.0)
        .u32(1)
        .u32(frames.len() as u32)
        .finish();
    let frames = frames
        .iter()
        .fold(PayloadWriter::new(), |writer, frame| writer.u32(*frame))
        .finish();

    ChunkWriter::new(b"TSEQ", 1)
        .chunk(b"SQHD", header)
        .chunk(b"FRMS", frames)
        .chunk(b"NAME", PayloadWriter::new().cstring(name).finish())
        .build()
}
