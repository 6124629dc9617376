use std::fmt::{Display, Formatter};

use strata_files_derive_parseable::Parse;

/// On-disk marker for a reference that points nowhere.
pub const ABSENT_REFERENCE: u32 = 0xFFFF_FFFF;

pub const fn fourcc(tag: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*tag)
}

pub fn fourcc_str(magic: u32) -> String {
    magic.to_le_bytes().escape_ascii().to_string()
}

#[derive(Debug, Copy, Clone, PartialEq, Default, Parse)]
pub struct C3Vector {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<u32> for Rgba {
    fn from(value: u32) -> Self {
        let [r, g, b, a] = value.to_le_bytes();
        Rgba { r, g, b, a }
    }
}

#[derive(Debug, Copy, Clone, Parse)]
pub struct ResourceHeader {
    pub magic: u32,
    pub version: u32,
    pub chunk_count: u32,
}

/// Identifies a registered archive for the lifetime of the owning manager.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchiveId(pub u32);

impl Display for ArchiveId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    TerrainTiles,
    Environment,
    Texture,
    TextureSequence,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::TerrainTiles,
        ResourceKind::Environment,
        ResourceKind::Texture,
        ResourceKind::TextureSequence,
    ];

    /// The container type tag, which is also the magic of the resource file.
    pub const fn type_tag(&self) -> &'static [u8; 4] {
        match self {
            ResourceKind::TerrainTiles => b"TTBL",
            ResourceKind::Environment => b"ENVR",
            ResourceKind::Texture => b"TXTR",
            ResourceKind::TextureSequence => b"TSEQ",
        }
    }

    pub const fn magic(&self) -> u32 {
        fourcc(self.type_tag())
    }

    pub fn from_type_tag(tag: [u8; 4]) -> Option<ResourceKind> {
        Self::ALL.into_iter().find(|kind| *kind.type_tag() == tag)
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            ResourceKind::TerrainTiles => "ttb",
            ResourceKind::Environment => "env",
            ResourceKind::Texture => "tex",
            ResourceKind::TextureSequence => "tsq",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_tag().escape_ascii())
    }
}

/// Identity of a resource: the n-th file carrying the kind's type tag in an archive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub archive: ArchiveId,
    pub kind: ResourceKind,
    pub index: u32,
}

impl ResourceKey {
    pub fn new(archive: ArchiveId, kind: ResourceKind, index: u32) -> Self {
        Self { archive, kind, index }
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}[{}]", self.archive, self.kind, self.index)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// As read from disk, an index among the target kind's files in the same archive.
    Unresolved { index: u32 },
    Resolved(ResourceKey),
    Absent,
}

impl Reference {
    pub fn from_raw(raw: u32) -> Reference {
        match raw {
            ABSENT_REFERENCE => Reference::Absent,
            index => Reference::Unresolved { index },
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Reference::Absent)
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Reference::Unresolved { .. })
    }

    pub fn key(&self) -> Option<ResourceKey> {
        match self {
            Reference::Resolved(key) => Some(*key),
            _ => None,
        }
    }
}
