use crate::ParserError;
use crate::common::chunk::ChunkTable;
use crate::common::reader::NameChunk;
use crate::common::types::{Reference, ResourceKind};
use crate::sequence::types::{SEQUENCE_VERSION, SequenceChunk, SequenceFlags, SequenceHeader, TextureSequence};

pub struct SequenceReader {}

impl SequenceReader {
    pub fn parse_asset(buffer: &[u8]) -> Result<TextureSequence, ParserError> {
        let table = ChunkTable::<SequenceChunk>::read(buffer)?;
        let version = table.expect(ResourceKind::TextureSequence.magic(), &[SEQUENCE_VERSION])?;

        let header = table.mandatory::<SequenceHeader>(SequenceChunk::Header)?;
        let frame_chunk = table.mandatory_chunk(SequenceChunk::Frames)?;
        let frames = frame_chunk.read_records::<Reference>()?;
        if frames.len() != header.frame_count as usize {
            return Err(frame_chunk.invalid(format!(
                "{} frames, but the header declares {}",
                frames.len(),
                header.frame_count
            )));
        }

        if let Some(position) = frames.iter().position(Reference::is_absent) {
            return Err(frame_chunk.invalid(format!("frame {} has no texture", position)));
        }

        let name = table.optional::<NameChunk>(SequenceChunk::Name)?;

        Ok(TextureSequence {
            version,
            name: name.map(|chunk| chunk.name),
            frame_duration: header.frame_duration,
            flags: SequenceFlags::from_bits_retain(header.flags),
            frames,
        })
    }
}
