use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;

use crate::error::ArchiveError;

pub const FOURCC_SLZ: [u8; 4] = *b"SLZ0";
const HEADER_SIZE: usize = 12;

const WINDOW_SIZE: usize = 0x1000;
const MIN_MATCH: usize = 3;
// n + 2 with n being a nibble, n = 0 selects the escape encoding
const MAX_SHORT_MATCH: usize = 0x0F + 2;
const LONG_MATCH_BIAS: usize = 0x12;
const MAX_MATCH: usize = 0xFF + LONG_MATCH_BIAS;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Size of the payload following the 12 byte header.
    pub compressed_size: u32,
    pub decompressed_size: u32,
}

impl StreamHeader {
    pub fn read(buffer: &[u8]) -> Result<StreamHeader, ArchiveError> {
        if buffer.len() < HEADER_SIZE {
            return Err(ArchiveError::Truncated {
                what: "compression header",
            });
        }

        let mut rdr = Cursor::new(buffer);
        let mut magic = [0u8; 4];
        std::io::Read::read_exact(&mut rdr, &mut magic)?;
        if magic != FOURCC_SLZ {
            return Err(ArchiveError::InvalidMagic {
                expected: FOURCC_SLZ,
                found: magic,
            });
        }

        Ok(StreamHeader {
            compressed_size: rdr.read_u32::<LittleEndian>()?,
            decompressed_size: rdr.read_u32::<LittleEndian>()?,
        })
    }
}

pub fn is_compressed(buffer: &[u8]) -> bool {
    buffer.len() >= HEADER_SIZE && buffer[..4] == FOURCC_SLZ
}

/// Reverses [`compress`]. Literals are written directly, back-references are copied byte by byte
/// from the already decoded output, so a distance smaller than the length repeats the tail.
pub fn decompress(buffer: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let header = StreamHeader::read(buffer)?;
    let payload_end = HEADER_SIZE + header.compressed_size as usize;
    if payload_end > buffer.len() {
        return Err(ArchiveError::InvalidRange {
            what: "compressed payload",
            offset: HEADER_SIZE as u64,
            length: header.compressed_size as u64,
            limit: buffer.len() as u64,
        });
    }

    let input = &buffer[HEADER_SIZE..payload_end];
    let declared = header.decompressed_size as usize;
    // The header is untrusted, no payload decodes to more than MAX_MATCH bytes per input byte.
    let mut output: Vec<u8> = Vec::with_capacity(declared.min(input.len().saturating_mul(MAX_MATCH)));
    let mut pos = 0usize;

    // Running out of input before the declared size is reached means the decoded length is off.
    let mut next_byte = |written: usize| -> Result<u8, ArchiveError> {
        let byte = *input.get(pos).ok_or(ArchiveError::LengthMismatch {
            declared,
            actual: written,
        })?;
        pos += 1;
        Ok(byte)
    };

    while output.len() < declared {
        let control = next_byte(output.len())?;
        for bit in (0..8).rev() {
            if output.len() >= declared {
                break;
            }

            if control & (1 << bit) != 0 {
                let literal = next_byte(output.len())?;
                output.push(literal);
                continue;
            }

            let b1 = next_byte(output.len())?;
            let b2 = next_byte(output.len())?;
            let distance = ((((b1 & 0x0F) as usize) << 8) | b2 as usize) + 1;
            let length = match b1 >> 4 {
                0 => next_byte(output.len())? as usize + LONG_MATCH_BIAS,
                n => n as usize + 2,
            };

            if distance > output.len() {
                return Err(ArchiveError::BackReferenceOutOfRange {
                    distance,
                    written: output.len(),
                });
            }

            if output.len() + length > declared {
                return Err(ArchiveError::LengthMismatch {
                    declared,
                    actual: output.len() + length,
                });
            }

            let start = output.len() - distance;
            for i in 0..length {
                let byte = output[start + i];
                output.push(byte);
            }
        }
    }

    trace!(
        "Decompressed {} bytes into {} bytes",
        header.compressed_size,
        output.len()
    );
    Ok(output)
}

/// Greedy reference encoder for the SLZ0 stream. It is not tuned for ratio, but every stream it
/// produces decodes with [`decompress`].
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut payload: Vec<u8> = Vec::with_capacity(data.len() + data.len() / 8 + 1);
    let mut pos = 0usize;

    while pos < data.len() {
        let control_index = payload.len();
        let mut control = 0u8;
        payload.push(control);

        for bit in (0..8).rev() {
            if pos >= data.len() {
                break;
            }

            let (distance, length) = find_longest_match(data, pos);
            if length < MIN_MATCH {
                control |= 1 << bit;
                payload.push(data[pos]);
                pos += 1;
                continue;
            }

            let d = distance - 1;
            if length <= MAX_SHORT_MATCH {
                payload.push((((length - 2) as u8) << 4) | (d >> 8) as u8);
                payload.push((d & 0xFF) as u8);
            } else {
                payload.push((d >> 8) as u8);
                payload.push((d & 0xFF) as u8);
                payload.push((length - LONG_MATCH_BIAS) as u8);
            }
            pos += length;
        }

        payload[control_index] = control;
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&FOURCC_SLZ);
    // Writing into a Vec cannot fail.
    let _ = out.write_u32::<LittleEndian>(payload.len() as u32);
    let _ = out.write_u32::<LittleEndian>(data.len() as u32);
    out.extend_from_slice(&payload);
    out
}

fn find_longest_match(data: &[u8], pos: usize) -> (usize, usize) {
    let max_length = MAX_MATCH.min(data.len() - pos);
    if max_length < MIN_MATCH {
        return (0, 0);
    }

    let mut best = (0usize, 0usize);
    for start in (pos.saturating_sub(WINDOW_SIZE)..pos).rev() {
        let mut length = 0;
        // start + length may run past pos, that's the overlapping copy the decoder reproduces
        while length < max_length && data[start + length] == data[pos + length] {
            length += 1;
        }

        if length > best.1 {
            best = (pos - start, length);
            if length == max_length {
                break;
            }
        }
    }

    best
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Compression {
    None,
    Lz { decompressed_size: u32 },
}

/// A fetched archive blob, before decompression.
#[derive(Debug)]
pub struct RawArchive {
    bytes: Vec<u8>,
    compression: Compression,
}

impl RawArchive {
    pub fn new(bytes: Vec<u8>) -> Result<Self, ArchiveError> {
        let compression = if is_compressed(&bytes) {
            let header = StreamHeader::read(&bytes)?;
            Compression::Lz {
                decompressed_size: header.decompressed_size,
            }
        } else {
            Compression::None
        };

        Ok(RawArchive { bytes, compression })
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn decompressed_len(&self) -> usize {
        match self.compression {
            Compression::None => self.bytes.len(),
            Compression::Lz { decompressed_size } => decompressed_size as usize,
        }
    }

    pub fn into_decompressed(self) -> Result<Vec<u8>, ArchiveError> {
        match self.compression {
            Compression::None => Ok(self.bytes),
            Compression::Lz { .. } => decompress(&self.bytes),
        }
    }
}
