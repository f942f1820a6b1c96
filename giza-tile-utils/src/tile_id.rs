//! Packed 64-bit tile identifiers.
//!
//! The level lives in the most significant bits, so sorting identifiers
//! groups tiles by level and the level can be extracted without a full
//! decode. Layout: 6 bits of level, 29 bits of x, 29 bits of y.

use std::fmt::{Display, Formatter};

use crate::TileCoord;

/// Deepest level a [`TileId`] can represent: x and y each get 29 bits.
pub const MAX_LEVEL: u8 = 29;

const LEVEL_SHIFT: u32 = 58;
const X_SHIFT: u32 = 29;
const COORD_MASK: u64 = (1 << X_SHIFT) - 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TileIdError {
    #[error("zoom level {0} exceeds the deepest encodable level {MAX_LEVEL}")]
    LevelTooDeep(u8),
}

/// A single integer uniquely identifying a tile `(z, x, y)`.
///
/// `TileId::new(c).decode() == c` for every coordinate with
/// `z <= MAX_LEVEL`. The derived `Ord` sorts by level first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(u64);

impl TileId {
    /// Encodes a tile coordinate into its identifier.
    ///
    /// Fails when the level is not representable. Coordinates outside the
    /// level's grid are a contract violation and panic.
    pub fn new(coord: TileCoord) -> Result<Self, TileIdError> {
        if coord.z > MAX_LEVEL {
            return Err(TileIdError::LevelTooDeep(coord.z));
        }
        assert!(u64::from(coord.x) < (1u64 << coord.z));
        assert!(u64::from(coord.y) < (1u64 << coord.z));
        Ok(TileId(
            (u64::from(coord.z) << LEVEL_SHIFT)
                | (u64::from(coord.x) << X_SHIFT)
                | u64::from(coord.y),
        ))
    }

    /// The tile's level, without a full decode.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn zoom(self) -> u8 {
        (self.0 >> LEVEL_SHIFT) as u8
    }

    /// Recovers the `(z, x, y)` coordinate this identifier encodes.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn decode(self) -> TileCoord {
        TileCoord {
            z: self.zoom(),
            x: ((self.0 >> X_SHIFT) & COORD_MASK) as u32,
            y: (self.0 & COORD_MASK) as u32,
        }
    }
}

impl Display for TileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.decode(), f)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_roundtrip_all_levels() {
        for z in 0..=MAX_LEVEL {
            let edge = (1u32 << z) - 1;
            for (x, y) in [(0, 0), (edge, 0), (0, edge), (edge, edge), (edge / 2, edge / 3)] {
                let coord = TileCoord { z, x, y };
                assert_eq!(TileId::new(coord).unwrap().decode(), coord);
            }
        }
    }

    #[rstest]
    #[case(30)]
    #[case(255)]
    fn test_level_too_deep(#[case] z: u8) {
        assert_eq!(
            TileId::new(TileCoord { z, x: 0, y: 0 }),
            Err(TileIdError::LevelTooDeep(z))
        );
    }

    #[test]
    fn test_sorting_groups_by_level() {
        let deep = TileId::new(TileCoord { z: 5, x: 0, y: 0 }).unwrap();
        let shallow = TileId::new(TileCoord { z: 4, x: 15, y: 15 }).unwrap();
        assert!(shallow < deep);
        assert_eq!(shallow.zoom(), 4);
        assert_eq!(deep.zoom(), 5);
    }

    #[test]
    fn test_distinct_ids_within_level() {
        let a = TileId::new(TileCoord { z: 3, x: 1, y: 2 }).unwrap();
        let b = TileId::new(TileCoord { z: 3, x: 2, y: 1 }).unwrap();
        assert_ne!(a, b);
    }
}
