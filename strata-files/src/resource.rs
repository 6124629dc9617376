use std::fmt::{Display, Formatter};

use crate::ParserError;
use crate::common::types::{Reference, ResourceKind};
use crate::environment::reader::EnvironmentReader;
use crate::environment::types::Environment;
use crate::sequence::reader::SequenceReader;
use crate::sequence::types::TextureSequence;
use crate::terrain::reader::TerrainReader;
use crate::terrain::types::TerrainTiles;
use crate::texture::reader::TextureReader;
use crate::texture::types::Texture;

#[derive(Debug, Clone)]
pub enum ParsedResource {
    TerrainTiles(TerrainTiles),
    Environment(Environment),
    Texture(Texture),
    TextureSequence(TextureSequence),
}

/// Companion files discovered next to a resource. Only terrain has any.
#[derive(Debug, Default, Clone, Copy)]
pub struct Siblings<'a> {
    pub animation: Option<&'a [u8]>,
    pub material_swaps: Option<&'a [u8]>,
}

/// Names a reference field, `slot` is the element for fields inside tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldName {
    pub name: &'static str,
    pub slot: Option<usize>,
}

impl FieldName {
    fn single(name: &'static str) -> Self {
        Self { name, slot: None }
    }

    fn element(name: &'static str, slot: usize) -> Self {
        Self { name, slot: Some(slot) }
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.slot {
            Some(slot) => write!(f, "{}[{}]", self.name, slot),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug)]
pub struct ReferenceField<'a> {
    pub field: FieldName,
    pub target: ResourceKind,
    pub reference: &'a mut Reference,
}

impl<'a> ReferenceField<'a> {
    fn new(field: FieldName, target: ResourceKind, reference: &'a mut Reference) -> Self {
        Self {
            field,
            target,
            reference,
        }
    }
}

pub struct ResourceReader {}

impl ResourceReader {
    pub fn parse(kind: ResourceKind, buffer: &[u8], siblings: Siblings<'_>) -> Result<ParsedResource, ParserError> {
        Ok(match kind {
            ResourceKind::TerrainTiles => ParsedResource::TerrainTiles(TerrainReader::parse_asset(
                buffer,
                siblings.animation,
                siblings.material_swaps,
            )?),
            ResourceKind::Environment => ParsedResource::Environment(EnvironmentReader::parse_asset(buffer)?),
            ResourceKind::Texture => ParsedResource::Texture(TextureReader::parse_asset(buffer)?),
            ResourceKind::TextureSequence => ParsedResource::TextureSequence(SequenceReader::parse_asset(buffer)?),
        })
    }
}

impl ParsedResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ParsedResource::TerrainTiles(_) => ResourceKind::TerrainTiles,
            ParsedResource::Environment(_) => ResourceKind::Environment,
            ParsedResource::Texture(_) => ResourceKind::Texture,
            ParsedResource::TextureSequence(_) => ResourceKind::TextureSequence,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            ParsedResource::TerrainTiles(_) => None,
            ParsedResource::Environment(environment) => environment.name.as_deref(),
            ParsedResource::Texture(texture) => texture.name.as_deref(),
            ParsedResource::TextureSequence(sequence) => sequence.name.as_deref(),
        }
    }

    pub fn as_terrain(&self) -> Option<&TerrainTiles> {
        match self {
            ParsedResource::TerrainTiles(terrain) => Some(terrain),
            _ => None,
        }
    }

    pub fn as_environment(&self) -> Option<&Environment> {
        match self {
            ParsedResource::Environment(environment) => Some(environment),
            _ => None,
        }
    }

    pub fn as_texture(&self) -> Option<&Texture> {
        match self {
            ParsedResource::Texture(texture) => Some(texture),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&TextureSequence> {
        match self {
            ParsedResource::TextureSequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Every reference field, including those in tables and sibling data, in a stable order.
    pub fn references_mut(&mut self) -> Vec<ReferenceField<'_>> {
        let mut fields = Vec::new();
        match self {
            ParsedResource::TerrainTiles(terrain) => {
                fields.push(ReferenceField::new(
                    FieldName::single("environment"),
                    ResourceKind::Environment,
                    &mut terrain.environment,
                ));
                for (slot, tile) in terrain.tiles.iter_mut().enumerate() {
                    fields.push(ReferenceField::new(
                        FieldName::element("tile_texture", slot),
                        ResourceKind::Texture,
                        &mut tile.texture,
                    ));
                }
                if let Some(swaps) = terrain.material_swaps.as_mut() {
                    for (slot, swap) in swaps.swaps.iter_mut().enumerate() {
                        fields.push(ReferenceField::new(
                            FieldName::element("swap_texture", slot),
                            ResourceKind::Texture,
                            &mut swap.texture,
                        ));
                    }
                }
            }
            ParsedResource::Environment(environment) => {
                fields.push(ReferenceField::new(
                    FieldName::single("terrain"),
                    ResourceKind::TerrainTiles,
                    &mut environment.terrain,
                ));
                fields.push(ReferenceField::new(
                    FieldName::single("skybox"),
                    ResourceKind::Texture,
                    &mut environment.skybox,
                ));
            }
            ParsedResource::Texture(texture) => {
                fields.push(ReferenceField::new(
                    FieldName::single("sequence"),
                    ResourceKind::TextureSequence,
                    &mut texture.sequence,
                ));
            }
            ParsedResource::TextureSequence(sequence) => {
                for (slot, frame) in sequence.frames.iter_mut().enumerate() {
                    fields.push(ReferenceField::new(FieldName::element("frames", slot), ResourceKind::Texture, frame));
                }
            }
        }

        fields
    }

    /// Read-only counterpart of [`ParsedResource::references_mut`].
    pub fn references(&self) -> Vec<(FieldName, ResourceKind, Reference)> {
        let mut fields = Vec::new();
        match self {
            ParsedResource::TerrainTiles(terrain) => {
                fields.push((FieldName::single("environment"), ResourceKind::Environment, terrain.environment));
                for (slot, tile) in terrain.tiles.iter().enumerate() {
                    fields.push((FieldName::element("tile_texture", slot), ResourceKind::Texture, tile.texture));
                }
                if let Some(swaps) = &terrain.material_swaps {
                    for (slot, swap) in swaps.swaps.iter().enumerate() {
                        fields.push((FieldName::element("swap_texture", slot), ResourceKind::Texture, swap.texture));
                    }
                }
            }
            ParsedResource::Environment(environment) => {
                fields.push((FieldName::single("terrain"), ResourceKind::TerrainTiles, environment.terrain));
                fields.push((FieldName::single("skybox"), ResourceKind::Texture, environment.skybox));
            }
            ParsedResource::Texture(texture) => {
                fields.push((FieldName::single("sequence"), ResourceKind::TextureSequence, texture.sequence));
            }
            ParsedResource::TextureSequence(sequence) => {
                for (slot, frame) in sequence.frames.iter().enumerate() {
                    fields.push((FieldName::element("frames", slot), ResourceKind::Texture, *frame));
                }
            }
        }

        fields
    }
}
