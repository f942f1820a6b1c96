//! Rectangular tile ranges and the level-coarsening recurrence.

use serde::Serialize;

use crate::TileCoord;

/// A rectangular region in tile coordinate space.
///
/// The rectangle is inclusive of both min and max coordinates and belongs to
/// one zoom level. Moving to a coarser level always goes through
/// [`TileRect::coarsen`], never back through geography, so a shape's overlap
/// set at a coarse level is always derived from the finer level's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    /// The zoom level of the tiles
    pub zoom: u8,
    /// The minimum X coordinate (inclusive)
    pub min_x: u32,
    /// The minimum Y coordinate (inclusive)
    pub min_y: u32,
    /// The maximum X coordinate (inclusive)
    pub max_x: u32,
    /// The maximum Y coordinate (inclusive)
    pub max_y: u32,
}

impl Serialize for TileRect {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(&format!(
            "{}: ({},{}) - ({},{})",
            self.zoom, self.min_x, self.min_y, self.max_x, self.max_y
        ))
    }
}

impl TileRect {
    /// Creates a new `TileRect`.
    ///
    /// # Panics
    ///
    /// Panics if `min_x > max_x`, `min_y > max_y`, or the max corner does not
    /// fit the level's `2^zoom x 2^zoom` grid.
    #[must_use]
    pub fn new(zoom: u8, min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        assert!(min_x <= max_x);
        assert!(min_y <= max_y);
        assert!(u64::from(max_x) < (1u64 << zoom));
        assert!(u64::from(max_y) < (1u64 << zoom));
        TileRect {
            zoom,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Total number of tiles contained in this rectangle.
    #[must_use]
    pub fn size(&self) -> u64 {
        u64::from(self.max_x - self.min_x + 1) * u64::from(self.max_y - self.min_y + 1)
    }

    /// The same range expressed `levels` levels higher in the pyramid.
    ///
    /// Each corner is divided by `2^levels` with flooring; because the
    /// bounds are inclusive this maps `[lo, hi]` to `[lo >> k, hi >> k]`,
    /// which keeps the coarse range a superset consequence of the fine one.
    ///
    /// # Panics
    ///
    /// Panics if `levels > self.zoom`.
    #[must_use]
    pub fn coarsen(&self, levels: u8) -> Self {
        assert!(levels <= self.zoom);
        TileRect {
            zoom: self.zoom - levels,
            min_x: self.min_x >> levels,
            min_y: self.min_y >> levels,
            max_x: self.max_x >> levels,
            max_y: self.max_y >> levels,
        }
    }

    /// The overlap of two ranges at the same zoom, if any.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        assert_eq!(self.zoom, other.zoom);
        let min_x = self.min_x.max(other.min_x);
        let min_y = self.min_y.max(other.min_y);
        let max_x = self.max_x.min(other.max_x);
        let max_y = self.max_y.min(other.max_y);
        (min_x <= max_x && min_y <= max_y)
            .then(|| TileRect::new(self.zoom, min_x, min_y, max_x, max_y))
    }

    /// Iterates over every tile coordinate in the range, column-major.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + use<> {
        let TileRect {
            zoom: z,
            min_x,
            min_y,
            max_x,
            max_y,
        } = *self;
        (min_x..=max_x).flat_map(move |x| (min_y..=max_y).map(move |y| TileCoord { z, x, y }))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_size() {
        assert_eq!(1, TileRect::new(0, 0, 0, 0, 0).size());
        assert_eq!(4, TileRect::new(1, 0, 0, 1, 1).size());
        assert_eq!(15, TileRect::new(3, 2, 3, 4, 7).size());
    }

    #[rstest]
    #[case(TileRect::new(3, 2, 3, 5, 7), 1, TileRect::new(2, 1, 1, 2, 3))]
    #[case(TileRect::new(3, 2, 3, 5, 7), 3, TileRect::new(0, 0, 0, 0, 0))]
    #[case(TileRect::new(6, 8, 8, 15, 15), 3, TileRect::new(3, 1, 1, 1, 1))]
    #[case(TileRect::new(4, 0, 0, 15, 15), 2, TileRect::new(2, 0, 0, 3, 3))]
    fn test_coarsen(#[case] rect: TileRect, #[case] levels: u8, #[case] expected: TileRect) {
        assert_eq!(rect.coarsen(levels), expected);
    }

    #[test]
    fn test_coarsen_one_level_at_a_time_matches_jump() {
        let rect = TileRect::new(9, 13, 57, 300, 301);
        assert_eq!(rect.coarsen(1).coarsen(1).coarsen(1), rect.coarsen(3));
    }

    #[test]
    fn test_intersect() {
        let a = TileRect::new(4, 2, 2, 6, 6);
        let b = TileRect::new(4, 4, 0, 9, 3);
        assert_eq!(a.intersect(&b), Some(TileRect::new(4, 4, 2, 6, 3)));
        let c = TileRect::new(4, 8, 8, 9, 9);
        assert_eq!(a.intersect(&c), None);
    }

    #[test]
    fn test_tiles_iteration() {
        let rect = TileRect::new(2, 1, 2, 2, 3);
        let tiles: Vec<TileCoord> = rect.tiles().collect();
        assert_eq!(tiles.len() as u64, rect.size());
        assert_eq!(tiles[0], TileCoord { z: 2, x: 1, y: 2 });
        assert_eq!(tiles[3], TileCoord { z: 2, x: 2, y: 3 });
    }
}
