use std::fmt::Debug;
use std::io::{Cursor, ErrorKind};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, trace};

use crate::ParserError;
use crate::common::reader::{FixedSize, Parseable};
use crate::common::types::{ResourceHeader, fourcc_str};

const CHUNK_HEADER_SIZE: usize = 8;

/// The closed set of chunk tags a resource kind knows, see [`chunk_tags`].
pub trait ChunkTag: Copy + Eq + Debug {
    fn classify(magic: u32, size: u32) -> Self;
    fn magic(&self) -> u32;
    fn is_unknown(&self) -> bool;
}

/// Declares a chunk tag enum with an `Unknown { magic, size }` fallback, so decoding stays total
/// when files carry chunks newer than this reader.
macro_rules! chunk_tags {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident = $tag:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq)]
        $vis enum $name {
            $($variant,)+
            Unknown { magic: u32, size: u32 },
        }

        impl $crate::common::chunk::ChunkTag for $name {
            fn classify(magic: u32, size: u32) -> Self {
                $(
                    if magic == u32::from_le_bytes(*$tag) {
                        return $name::$variant;
                    }
                )+
                $name::Unknown { magic, size }
            }

            fn magic(&self) -> u32 {
                match self {
                    $($name::$variant => u32::from_le_bytes(*$tag),)+
                    $name::Unknown { magic, .. } => *magic,
                }
            }

            fn is_unknown(&self) -> bool {
                matches!(self, $name::Unknown { .. })
            }
        }
    };
}

pub(crate) use chunk_tags;

#[derive(Debug, Clone)]
pub struct Chunk<T> {
    pub tag: T,
    pub size: u32,
    /// Offset of the payload within the resource buffer.
    pub offset: usize,
    pub data: Vec<u8>,
}

impl<T: ChunkTag> Chunk<T> {
    pub fn magic_str(&self) -> String {
        fourcc_str(self.tag.magic())
    }

    pub fn parse<P: Parseable<P>>(&self) -> Result<P, ParserError> {
        P::parse(&mut Cursor::new(&self.data)).map_err(|err| self.truncation(err))
    }

    /// Reads the whole payload as a table of fixed-size records. A payload that is not a multiple
    /// of the record size is rejected instead of dropping the tail.
    pub fn read_records<P: Parseable<P> + FixedSize>(&self) -> Result<Vec<P>, ParserError> {
        if P::SIZE == 0 || self.data.len() % P::SIZE != 0 {
            return Err(self.invalid(format!(
                "{} bytes are not a multiple of the {} byte record size",
                self.data.len(),
                P::SIZE
            )));
        }

        let mut rdr = Cursor::new(&self.data);
        (0..self.data.len() / P::SIZE)
            .map(|_| P::parse(&mut rdr))
            .collect::<Result<Vec<P>, ParserError>>()
            .map_err(|err| self.truncation(err))
    }

    pub fn invalid(&self, reason: impl Into<String>) -> ParserError {
        ParserError::InvalidChunk {
            chunk: self.magic_str(),
            reason: reason.into(),
        }
    }

    fn truncation(&self, err: ParserError) -> ParserError {
        match err {
            ParserError::IOError(inner) if inner.kind() == ErrorKind::UnexpectedEof => {
                self.invalid(format!("payload of {} bytes is too short", self.size))
            }
            other => other,
        }
    }
}

/// A resource file split into its header and chunks, in file order.
#[derive(Debug)]
pub struct ChunkTable<T> {
    pub header: ResourceHeader,
    pub chunks: Vec<Chunk<T>>,
}

impl<T: ChunkTag> ChunkTable<T> {
    pub fn read(buffer: &[u8]) -> Result<ChunkTable<T>, ParserError> {
        let mut rdr = Cursor::new(buffer);
        let header = ResourceHeader::parse(&mut rdr).map_err(|err| match err {
            ParserError::IOError(inner) if inner.kind() == ErrorKind::UnexpectedEof => ParserError::FormatError {
                reason: "Resource header is truncated",
            },
            other => other,
        })?;

        let mut chunks = Vec::with_capacity(header.chunk_count.min(64) as usize);
        for _ in 0..header.chunk_count {
            let position = rdr.position() as usize;
            if buffer.len() - position < CHUNK_HEADER_SIZE {
                return Err(ParserError::FormatError {
                    reason: "Chunk table extends past the end of the file",
                });
            }

            let magic = rdr.read_u32::<LittleEndian>()?;
            let size = rdr.read_u32::<LittleEndian>()?;
            let offset = position + CHUNK_HEADER_SIZE;
            let remaining = buffer.len() - offset;
            if size as usize > remaining {
                return Err(ParserError::InvalidChunk {
                    chunk: fourcc_str(magic),
                    reason: format!("{} bytes exceed the remaining {} bytes", size, remaining),
                });
            }

            let tag = T::classify(magic, size);
            if tag.is_unknown() {
                debug!("Skipping unknown chunk {} ({} bytes)", fourcc_str(magic), size);
            } else {
                trace!("Chunk {} at {} ({} bytes)", fourcc_str(magic), offset, size);
            }

            let end = offset + size as usize;
            chunks.push(Chunk {
                tag,
                size,
                offset,
                data: buffer[offset..end].to_vec(),
            });
            rdr.set_position(end as u64);
        }

        Ok(ChunkTable { header, chunks })
    }

    /// Checks the magic and returns the version, if it is one of `versions`.
    pub fn expect(&self, magic: u32, versions: &[u32]) -> Result<u32, ParserError> {
        if self.header.magic != magic {
            return Err(ParserError::InvalidMagicValue {
                magic: fourcc_str(self.header.magic),
                expected: fourcc_str(magic),
            });
        }

        if !versions.contains(&self.header.version) {
            return Err(ParserError::UnsupportedVersion {
                magic: fourcc_str(magic),
                version: self.header.version,
            });
        }

        Ok(self.header.version)
    }

    pub fn find(&self, tag: T) -> Result<Option<&Chunk<T>>, ParserError> {
        let mut matches = self.chunks.iter().filter(|chunk| chunk.tag == tag);
        let first = matches.next();
        if let Some(duplicate) = matches.next() {
            return Err(ParserError::DuplicateChunk {
                chunk: duplicate.magic_str(),
            });
        }

        Ok(first)
    }

    pub fn mandatory_chunk(&self, tag: T) -> Result<&Chunk<T>, ParserError> {
        self.find(tag)?.ok_or_else(|| ParserError::MissingChunk {
            chunk: fourcc_str(tag.magic()),
        })
    }

    pub fn mandatory<P: Parseable<P>>(&self, tag: T) -> Result<P, ParserError> {
        self.mandatory_chunk(tag)?.parse::<P>()
    }

    pub fn optional<P: Parseable<P>>(&self, tag: T) -> Result<Option<P>, ParserError> {
        self.find(tag)?.map(|chunk| chunk.parse::<P>()).transpose()
    }

    pub fn unknown_chunks(&self) -> impl Iterator<Item = &Chunk<T>> {
        self.chunks.iter().filter(|chunk| chunk.tag.is_unknown())
    }
}
