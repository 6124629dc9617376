use bitflags::bitflags;
use strata_files_derive_parseable::Parse;

use crate::common::chunk::chunk_tags;
use crate::common::types::Reference;

pub const SEQUENCE_VERSION: u32 = 1;

chunk_tags! {
    pub enum SequenceChunk {
        Header = b"SQHD",
        Frames = b"FRMS",
        Name = b"NAME",
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct SequenceFlags: u32 {
        const LOOP = 0x1;
        const PING_PONG = 0x2;
    }
}

#[derive(Debug, Clone, Parse)]
pub struct SequenceHeader {
    pub frame_duration: f32, // milliseconds
    pub flags: u32,
    pub frame_count: u32,
}

/// A texture flipbook. Its frames usually point back at it through [`crate::texture::types::Texture::sequence`].
#[derive(Debug, Clone)]
pub struct TextureSequence {
    pub version: u32,
    pub name: Option<String>,
    pub frame_duration: f32,
    pub flags: SequenceFlags,
    pub frames: Vec<Reference>,
}
