use crate::ParserError;
use crate::builder::{ChunkWriter, PayloadWriter, sample_texture};
use crate::common::types::Reference;
use crate::texture::reader::TextureReader;
use crate::texture::types::{TextureFlags, TextureFormat};

fn texture(version: u32, header: Vec<u8>, data: Vec<u8>) -> Vec<u8> {
    ChunkWriter::new(b"TXTR", version)
        .chunk(b"TXHD", header)
        .chunk(b"TXDT", data)
        .build()
}

#[test]
fn parse_texture() -> Result<(), anyhow::Error> {
    let texture = TextureReader::parse_asset(&sample_texture(Some(3), "water_0"))?;

    assert_eq!(texture.version, 2);
    assert_eq!(texture.name.as_deref(), Some("water_0"));
    assert_eq!((texture.width, texture.height), (4, 4));
    assert_eq!(texture.format, TextureFormat::Rgba8);
    assert_eq!(texture.flags, TextureFlags::WRAP_S | TextureFlags::WRAP_T);
    assert_eq!(texture.sequence, Reference::Unresolved { index: 3 });
    assert_eq!(texture.data.len(), 64);
    Ok(())
}

#[test]
fn legacy_header_has_no_sequence() -> Result<(), anyhow::Error> {
    let header = PayloadWriter::new().u16(8).u16(8).u8(2).u8(1).u16(0).finish();
    let texture = TextureReader::parse_asset(&texture(1, header, vec![0; 32]))?;

    assert_eq!(texture.version, 1);
    assert_eq!(texture.format, TextureFormat::Dxt1);
    assert_eq!(texture.sequence, Reference::Absent);
    Ok(())
}

#[test]
fn v2_requires_sequence_field() {
    let header = PayloadWriter::new().u16(8).u16(8).u8(2).u8(1).u16(0).finish();
    let err = TextureReader::parse_asset(&texture(2, header, vec![0; 32])).unwrap_err();
    assert!(matches!(err, ParserError::InvalidChunk { ref chunk, .. } if chunk == "TXHD"));
}

#[test]
fn rejects_invalid_headers() {
    let cases = [
        // zero width
        PayloadWriter::new().u16(0).u16(4).u8(0).u8(1).u16(0).u32(u32::MAX).finish(),
        // zero mips
        PayloadWriter::new().u16(4).u16(4).u8(0).u8(0).u16(0).u32(u32::MAX).finish(),
        // unknown format
        PayloadWriter::new().u16(4).u16(4).u8(9).u8(1).u16(0).u32(u32::MAX).finish(),
    ];

    for header in cases {
        let err = TextureReader::parse_asset(&texture(2, header, vec![0; 64])).unwrap_err();
        assert!(matches!(err, ParserError::InvalidChunk { ref chunk, .. } if chunk == "TXHD"));
    }
}

#[test]
fn rejects_short_pixel_data() {
    let header = PayloadWriter::new().u16(4).u16(4).u8(0).u8(1).u16(0).u32(u32::MAX).finish();
    let err = TextureReader::parse_asset(&texture(2, header, vec![0; 63])).unwrap_err();
    assert!(matches!(err, ParserError::InvalidChunk { ref chunk, .. } if chunk == "TXDT"));
}

#[test]
fn rejects_wrong_magic() {
    let mut buffer = sample_texture(None, "x");
    buffer[..4].copy_from_slice(b"TSEQ");
    let err = TextureReader::parse_asset(&buffer).unwrap_err();
    assert!(matches!(err, ParserError::InvalidMagicValue { ref magic, .. } if magic == "TSEQ"));
}

#[test]
fn block_compressed_sizes_round_up() {
    assert_eq!(TextureFormat::Dxt1.level_size(1, 1), 8);
    assert_eq!(TextureFormat::Dxt5.level_size(5, 4), 32);
    assert_eq!(TextureFormat::Rgb565.level_size(3, 3), 18);
}
