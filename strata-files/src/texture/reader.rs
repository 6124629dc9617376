use log::warn;

use crate::ParserError;
use crate::common::chunk::ChunkTable;
use crate::common::reader::NameChunk;
use crate::common::types::{Reference, ResourceKind};
use crate::texture::types::{
    TEXTURE_VERSION, TEXTURE_VERSION_LEGACY, Texture, TextureChunk, TextureFlags, TextureFormat, TextureHeader,
    TextureHeaderV2,
};

pub struct TextureReader {}

impl TextureReader {
    pub fn parse_asset(buffer: &[u8]) -> Result<Texture, ParserError> {
        let table = ChunkTable::<TextureChunk>::read(buffer)?;
        let version = table.expect(
            ResourceKind::Texture.magic(),
            &[TEXTURE_VERSION_LEGACY, TEXTURE_VERSION],
        )?;

        let header_chunk = table.mandatory_chunk(TextureChunk::Header)?;
        let (header, sequence) = if version == TEXTURE_VERSION_LEGACY {
            (header_chunk.parse::<TextureHeader>()?, Reference::Absent)
        } else {
            let header = header_chunk.parse::<TextureHeaderV2>()?;
            (header.base, header.sequence)
        };

        if header.width == 0 || header.height == 0 {
            return Err(header_chunk.invalid(format!(
                "dimensions {}x{} are empty",
                header.width, header.height
            )));
        }

        if header.mip_count == 0 {
            return Err(header_chunk.invalid("mip count is zero"));
        }

        let format = TextureFormat::try_from(header.format)
            .map_err(|_| header_chunk.invalid(format!("unknown texture format {}", header.format)))?;

        let data_chunk = table.mandatory_chunk(TextureChunk::Data)?;
        let level_size = format.level_size(header.width as u32, header.height as u32);
        if data_chunk.data.len() < level_size {
            return Err(data_chunk.invalid(format!(
                "{} bytes of pixel data, the base level alone needs {}",
                data_chunk.data.len(),
                level_size
            )));
        }

        let flags = TextureFlags::from_bits_truncate(header.flags);
        if flags.bits() != header.flags {
            warn!("Ignoring unknown texture flags {:#06x}", header.flags & !flags.bits());
        }

        let name = table.optional::<NameChunk>(TextureChunk::Name)?;

        Ok(Texture {
            version,
            name: name.map(|chunk| chunk.name),
            width: header.width,
            height: header.height,
            format,
            mip_count: header.mip_count,
            flags,
            sequence,
            data: data_chunk.data.clone(),
        })
    }
}
