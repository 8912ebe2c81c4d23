//! Compact binary grid snapshots handed to background path workers.
//!
//! Layout: byte 0 is the width, byte 1 the height and byte 2 a flag telling
//! whether structures are included. The remaining bytes hold one terrain byte
//! per cell in row-major order, each followed by a structure byte (0 for none)
//! when the flag is set.
use crate::error::SnapshotError;
use crate::terrain::{StructureKind, Terrain, TerrainGrid};
use crate::tile_map::TileMap;
use grid_util::Point;

const HEADER_LEN: usize = 3;

pub fn encode<G: TerrainGrid>(grid: &G, with_entities: bool) -> Result<Vec<u8>, SnapshotError> {
    let (width, height) = (grid.width(), grid.height());
    if width > u8::MAX as usize || height > u8::MAX as usize {
        return Err(SnapshotError::DimensionsTooLarge { width, height });
    }
    let per_cell = if with_entities { 2 } else { 1 };
    let mut bytes = Vec::with_capacity(HEADER_LEN + width * height * per_cell);
    bytes.extend([width as u8, height as u8, with_entities as u8]);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let cell = grid.cell(Point::new(x, y));
            // Cells the grid cannot resolve are encoded as impassable rock
            bytes.push(cell.map_or(Terrain::Rock, |c| c.terrain).to_byte());
            if with_entities {
                bytes.push(
                    cell.and_then(|c| c.structure)
                        .map_or(0, |s| s.kind.to_byte()),
                );
            }
        }
    }
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<TileMap, SnapshotError> {
    if bytes.len() < HEADER_LEN {
        return Err(SnapshotError::Truncated {
            expected: HEADER_LEN,
            got: bytes.len(),
        });
    }
    let width = bytes[0] as usize;
    let height = bytes[1] as usize;
    let with_entities = bytes[2] != 0;
    let per_cell = if with_entities { 2 } else { 1 };
    let expected = HEADER_LEN + width * height * per_cell;
    if bytes.len() != expected {
        return Err(SnapshotError::SizeMismatch {
            expected,
            got: bytes.len(),
        });
    }

    let mut tile_map = TileMap::new(width, height, Terrain::Grass);
    for (ix, cell_bytes) in bytes[HEADER_LEN..].chunks_exact(per_cell).enumerate() {
        let point = Point::new((ix % width) as i32, (ix / width) as i32);
        let terrain =
            Terrain::from_byte(cell_bytes[0]).ok_or(SnapshotError::UnknownTerrain(cell_bytes[0]))?;
        tile_map.set_terrain(point, terrain);
        if with_entities && cell_bytes[1] != 0 {
            let kind = StructureKind::from_byte(cell_bytes[1])
                .ok_or(SnapshotError::UnknownStructure(cell_bytes[1]))?;
            tile_map.place_structure(point, kind);
        }
    }
    Ok(tile_map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_cell_layout() {
        let map = TileMap::from_ascii(".W\n~T");
        let bytes = encode(&map, true).unwrap();
        assert_eq!(&bytes[..3], &[2, 2, 1]);
        assert_eq!(
            &bytes[3..],
            &[
                Terrain::Grass.to_byte(),
                0,
                Terrain::Grass.to_byte(),
                StructureKind::Wall.to_byte(),
                Terrain::Water.to_byte(),
                0,
                Terrain::Tree.to_byte(),
                0,
            ]
        );
        let terrain_only = encode(&map, false).unwrap();
        assert_eq!(terrain_only.len(), 3 + 4);
    }

    #[test]
    fn decode_restores_the_drawing() {
        let drawing = "..T~\n#WC=\n,:bF\n";
        let map = TileMap::from_ascii(drawing);
        let decoded = decode(&encode(&map, true).unwrap()).unwrap();
        assert_eq!(decoded.to_string(), drawing);
        let without_entities = decode(&encode(&map, false).unwrap()).unwrap();
        assert_eq!(without_entities.to_string(), "..T~\n#..=\n,:b.\n");
    }

    #[test]
    fn rejects_malformed_buffers() {
        assert!(matches!(
            decode(&[1]),
            Err(SnapshotError::Truncated {
                expected: 3,
                got: 1
            })
        ));
        assert!(matches!(
            decode(&[1, 1, 0]),
            Err(SnapshotError::SizeMismatch {
                expected: 4,
                got: 3
            })
        ));
        assert!(matches!(
            decode(&[1, 1, 0, 42]),
            Err(SnapshotError::UnknownTerrain(42))
        ));
        assert!(matches!(
            decode(&[1, 1, 1, 0, 9]),
            Err(SnapshotError::UnknownStructure(9))
        ));
        let huge = TileMap::new(300, 1, Terrain::Grass);
        assert!(matches!(
            encode(&huge, false),
            Err(SnapshotError::DimensionsTooLarge { .. })
        ));
    }
}
