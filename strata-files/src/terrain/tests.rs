use crate::ParserError;
use crate::builder::{ChunkWriter, PayloadWriter, sample_animation, sample_material_swaps, sample_terrain};
use crate::common::types::Reference;
use crate::terrain::reader::TerrainReader;
use crate::terrain::types::TerrainFlags;

#[test]
fn parse_base() -> Result<(), anyhow::Error> {
    let base = sample_terrain(Some(0), &[Some(1), None]);
    let terrain = TerrainReader::parse_asset(&base, None, None)?;

    assert_eq!(terrain.version, 2);
    assert_eq!(terrain.grid_width, 2);
    assert_eq!(terrain.flags, TerrainFlags::HAS_WATER);
    assert_eq!(terrain.environment, Reference::Unresolved { index: 0 });
    assert_eq!(terrain.tiles.len(), 2);
    assert_eq!(terrain.tiles[0].texture, Reference::Unresolved { index: 1 });
    assert_eq!(terrain.tiles[1].texture, Reference::Absent);
    assert_eq!(terrain.tiles[1].name.as_deref(), Some("tile1"));
    assert_eq!(terrain.tile_vertices(&terrain.tiles[1])[0].x, 1.0);
    assert_eq!(terrain.tile_indices(&terrain.tiles[1]), &[0, 1, 2, 2, 1, 3]);
    assert!(terrain.animation.is_none());
    assert!(terrain.material_swaps.is_none());
    Ok(())
}

#[test]
fn siblings_are_attached() -> Result<(), anyhow::Error> {
    let base = sample_terrain(None, &[Some(0)]);
    let animation = sample_animation();
    let swaps = sample_material_swaps(0);
    let terrain = TerrainReader::parse_asset(&base, Some(&animation), Some(&swaps))?;

    let animation = terrain.animation.expect("animation sibling");
    assert_eq!(animation.keyframes_for(0).count(), 2);
    assert_eq!(animation.keyframes[1].offset.z, 0.25);
    let swaps = terrain.material_swaps.expect("material swap sibling");
    assert_eq!(swaps.swaps[0].texture, Reference::Unresolved { index: 0 });
    Ok(())
}

#[test]
fn broken_sibling_is_reported_as_such() {
    let base = sample_terrain(None, &[Some(0)]);
    let mut animation = sample_animation();
    animation[0] = b'X';

    let err = TerrainReader::parse_asset(&base, Some(&animation), None).unwrap_err();
    assert!(matches!(
        err,
        ParserError::SiblingError {
            sibling: "animation",
            ..
        }
    ));
}

#[test]
fn animation_for_unknown_tile() {
    let base = sample_terrain(None, &[Some(0)]);
    let keys = PayloadWriter::new().u32(5).f32(0.0).f32(0.0).f32(0.0).f32(0.0).finish();
    let animation = ChunkWriter::new(b"TANM", 1)
        .chunk(b"AHDR", PayloadWriter::new().f32(1.0).u32(0).finish())
        .chunk(b"KEYS", keys)
        .build();

    let err = TerrainReader::parse_asset(&base, Some(&animation), None).unwrap_err();
    let ParserError::SiblingError { source, .. } = err else {
        panic!("expected a sibling error, got {:?}", err);
    };
    assert!(matches!(*source, ParserError::InvalidChunk { ref chunk, .. } if chunk == "KEYS"));
}

#[test]
fn rejects_index_outside_tile() {
    let mut base = sample_terrain(None, &[Some(0)]);
    // last INDX entry, the file ends with STRS "tile0\0" preceded by its 8 byte chunk header
    let last_index = base.len() - 6 - 8 - 2;
    base[last_index..last_index + 2].copy_from_slice(&4u16.to_le_bytes());

    let err = TerrainReader::parse_asset(&base, None, None).unwrap_err();
    assert!(matches!(err, ParserError::InvalidChunk { ref chunk, .. } if chunk == "INDX"));
}

#[test]
fn rejects_tile_count_mismatch() {
    let header = PayloadWriter::new().u16(1).u16(1).u32(2).u32(u32::MAX).u32(0).finish();
    let base = ChunkWriter::new(b"TTBL", 2)
        .chunk(b"THDR", header)
        .chunk(b"TILE", Vec::new())
        .chunk(b"VERT", Vec::new())
        .chunk(b"INDX", Vec::new())
        .build();

    let err = TerrainReader::parse_asset(&base, None, None).unwrap_err();
    assert!(matches!(err, ParserError::InvalidChunk { ref chunk, .. } if chunk == "TILE"));
}

#[test]
fn rejects_missing_vertices() {
    let header = PayloadWriter::new().u16(0).u16(0).u32(0).u32(u32::MAX).u32(0).finish();
    let base = ChunkWriter::new(b"TTBL", 2)
        .chunk(b"THDR", header)
        .chunk(b"TILE", Vec::new())
        .chunk(b"INDX", Vec::new())
        .build();

    let err = TerrainReader::parse_asset(&base, None, None).unwrap_err();
    assert!(matches!(err, ParserError::MissingChunk { ref chunk } if chunk == "VERT"));
}

#[test]
fn rejects_other_versions() {
    let mut base = sample_terrain(None, &[]);
    base[4] = 3;

    let err = TerrainReader::parse_asset(&base, None, None).unwrap_err();
    assert!(matches!(err, ParserError::UnsupportedVersion { version: 3, .. }));
}

#[test]
fn rejects_absent_swap_texture() {
    let base = sample_terrain(None, &[Some(0)]);
    let swaps = sample_material_swaps(u32::MAX);

    let err = TerrainReader::parse_asset(&base, None, Some(&swaps)).unwrap_err();
    assert!(matches!(
        err,
        ParserError::SiblingError {
            sibling: "material swap",
            ..
        }
    ));
}
