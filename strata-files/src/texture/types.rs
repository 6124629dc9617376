use bitflags::bitflags;
use num_enum::TryFromPrimitive;
use strata_files_derive_parseable::Parse;

use crate::common::chunk::chunk_tags;
use crate::common::types::Reference;

pub const TEXTURE_VERSION: u32 = 2;
/// Older files, their header ends before the sequence reference.
pub const TEXTURE_VERSION_LEGACY: u32 = 1;

chunk_tags! {
    pub enum TextureChunk {
        Header = b"TXHD",
        Data = b"TXDT",
        Name = b"NAME",
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
pub enum TextureFormat {
    Rgba8 = 0,
    Rgb565 = 1,
    Dxt1 = 2,
    Dxt5 = 3,
    L8 = 4,
}

impl TextureFormat {
    /// Size in bytes of one mip level with the given dimensions.
    pub fn level_size(&self, width: u32, height: u32) -> usize {
        let (width, height) = (width as usize, height as usize);
        let blocks = width.div_ceil(4) * height.div_ceil(4);
        match self {
            TextureFormat::Rgba8 => width * height * 4,
            TextureFormat::Rgb565 => width * height * 2,
            TextureFormat::Dxt1 => blocks * 8,
            TextureFormat::Dxt5 => blocks * 16,
            TextureFormat::L8 => width * height,
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct TextureFlags: u16 {
        const WRAP_S = 0x1;
        const WRAP_T = 0x2;
        const SRGB = 0x4;
    }
}

#[derive(Debug, Clone, Parse)]
pub struct TextureHeader {
    pub width: u16,
    pub height: u16,
    pub format: u8,
    pub mip_count: u8,
    pub flags: u16,
}

#[derive(Debug, Clone, Parse)]
pub struct TextureHeaderV2 {
    pub base: TextureHeader,
    pub sequence: Reference,
}

#[derive(Debug, Clone)]
pub struct Texture {
    pub version: u32,
    pub name: Option<String>,
    pub width: u16,
    pub height: u16,
    pub format: TextureFormat,
    pub mip_count: u8,
    pub flags: TextureFlags,
    /// The flipbook this texture is a frame of, if any.
    pub sequence: Reference,
    pub data: Vec<u8>,
}
