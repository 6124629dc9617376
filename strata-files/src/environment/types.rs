use strata_files_derive_parseable::Parse;

use crate::common::chunk::chunk_tags;
use crate::common::types::{C3Vector, Reference, Rgba};

pub const ENVIRONMENT_VERSION: u32 = 1;

chunk_tags! {
    pub enum EnvironmentChunk {
        Header = b"EHDR",
        Links = b"ELNK",
        Name = b"NAME",
    }
}

#[derive(Debug, Clone, Parse)]
pub struct EnvironmentHeader {
    pub fog_color: Rgba,
    pub fog_near: f32,
    pub fog_far: f32,
    pub ambient: Rgba,
    pub light_direction: C3Vector,
}

#[derive(Debug, Clone, Parse)]
pub struct EnvironmentLinks {
    pub terrain: Reference,
    pub skybox: Reference,
}

/// Lighting and fog settings, linked back to the terrain that uses them.
#[derive(Debug, Clone)]
pub struct Environment {
    pub version: u32,
    pub name: Option<String>,
    pub fog_color: Rgba,
    pub fog_near: f32,
    pub fog_far: f32,
    pub ambient: Rgba,
    pub light_direction: C3Vector,
    pub terrain: Reference,
    pub skybox: Reference,
}
