use crate::ParserError;
use crate::common::chunk::ChunkTable;
use crate::common::reader::NameChunk;
use crate::common::types::ResourceKind;
use crate::environment::types::{
    ENVIRONMENT_VERSION, Environment, EnvironmentChunk, EnvironmentHeader, EnvironmentLinks,
};

pub struct EnvironmentReader {}

impl EnvironmentReader {
    pub fn parse_asset(buffer: &[u8]) -> Result<Environment, ParserError> {
        let table = ChunkTable::<EnvironmentChunk>::read(buffer)?;
        let version = table.expect(ResourceKind::Environment.magic(), &[ENVIRONMENT_VERSION])?;

        let header_chunk = table.mandatory_chunk(EnvironmentChunk::Header)?;
        let header = header_chunk.parse::<EnvironmentHeader>()?;
        // also rejects NaN
        if !(header.fog_near <= header.fog_far) {
            return Err(header_chunk.invalid(format!(
                "fog near plane {} is behind the far plane {}",
                header.fog_near, header.fog_far
            )));
        }

        let links = table.mandatory::<EnvironmentLinks>(EnvironmentChunk::Links)?;
        let name = table.optional::<NameChunk>(EnvironmentChunk::Name)?;

        Ok(Environment {
            version,
            name: name.map(|chunk| chunk.name),
            fog_color: header.fog_color,
            fog_near: header.fog_near,
            fog_far: header.fog_far,
            ambient: header.ambient,
            light_direction: header.light_direction,
            terrain: links.terrain,
            skybox: links.skybox,
        })
    }
}
