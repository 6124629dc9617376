use std::collections::HashMap;
use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::ParserError;
use crate::common::types::{Reference, Rgba};

pub trait Parseable<T> {
    fn parse<R: Read>(rdr: &mut R) -> Result<T, ParserError>;
}

/// On-disk size of a record, so that tables can be checked against their chunk length before
/// reading them. `#[derive(Parse)]` implements it by summing the field sizes.
pub trait FixedSize {
    const SIZE: usize;
}

impl Parseable<u8> for u8 {
    fn parse<R: Read>(rdr: &mut R) -> Result<u8, ParserError> {
        Ok(rdr.read_u8()?)
    }
}

impl FixedSize for u8 {
    const SIZE: usize = 1;
}

impl Parseable<u16> for u16 {
    fn parse<R: Read>(rdr: &mut R) -> Result<u16, ParserError> {
        Ok(rdr.read_u16::<LittleEndian>()?)
    }
}

impl FixedSize for u16 {
    const SIZE: usize = 2;
}

impl Parseable<u32> for u32 {
    fn parse<R: Read>(rdr: &mut R) -> Result<u32, ParserError> {
        Ok(rdr.read_u32::<LittleEndian>()?)
    }
}

impl FixedSize for u32 {
    const SIZE: usize = 4;
}

impl Parseable<f32> for f32 {
    fn parse<R: Read>(rdr: &mut R) -> Result<f32, ParserError> {
        Ok(rdr.read_f32::<LittleEndian>()?)
    }
}

impl FixedSize for f32 {
    const SIZE: usize = 4;
}

impl Parseable<Rgba> for Rgba {
    fn parse<R: Read>(rdr: &mut R) -> Result<Rgba, ParserError> {
        Ok(Rgba::from(rdr.read_u32::<LittleEndian>()?))
    }
}

impl FixedSize for Rgba {
    const SIZE: usize = 4;
}

impl Parseable<Reference> for Reference {
    fn parse<R: Read>(rdr: &mut R) -> Result<Reference, ParserError> {
        Ok(Reference::from_raw(rdr.read_u32::<LittleEndian>()?))
    }
}

impl FixedSize for Reference {
    const SIZE: usize = 4;
}

// Helper Type because multiple kinds carry a block of NUL-terminated strings addressed by offset.
#[derive(Debug, Clone, Default)]
pub struct StringBlock {
    pub strings: Vec<String>,
    pub offsets: HashMap<u32, usize>,
}

impl StringBlock {
    pub fn get(&self, offset: u32) -> Option<&str> {
        self.offsets
            .get(&offset)
            .map(|&index| self.strings[index].as_str())
    }
}

impl Parseable<StringBlock> for StringBlock {
    fn parse<R: Read>(rdr: &mut R) -> Result<StringBlock, ParserError> {
        let mut buf = Vec::new();
        rdr.read_to_end(&mut buf)?;
        if buf.last().is_some_and(|&last| last != 0) {
            return Err(ParserError::FormatError {
                reason: "String block is not NUL-terminated",
            });
        }

        let mut block = StringBlock::default();
        let mut offset = 0u32;
        for raw in buf.split(|&c| c == 0) {
            // empty strings are padding, but they still count towards the offsets
            if !raw.is_empty() {
                block.offsets.insert(offset, block.strings.len());
                block.strings.push(String::from_utf8(raw.to_vec())?);
            }
            offset += raw.len() as u32 + 1;
        }

        Ok(block)
    }
}

/// Optional `NAME` chunks, a single C string.
#[derive(Debug, Clone)]
pub struct NameChunk {
    pub name: String,
}

impl Parseable<NameChunk> for NameChunk {
    fn parse<R: Read>(rdr: &mut R) -> Result<NameChunk, ParserError> {
        Ok(NameChunk {
            name: read_cstring(rdr)?,
        })
    }
}

pub(crate) fn read_cstring<R: Read>(rdr: &mut R) -> Result<String, ParserError> {
    let mut buf = Vec::new();
    loop {
        let c = rdr.read_u8()?;
        if c == 0 {
            return Ok(String::from_utf8(buf)?);
        }
        buf.push(c);
    }
}
