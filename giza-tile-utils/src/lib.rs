#![doc = include_str!("../README.md")]

use std::fmt::{Display, Formatter};
use std::str::FromStr;

mod rectangle;
mod tile_id;

pub use rectangle::TileRect;
pub use tile_id::{MAX_LEVEL, TileId, TileIdError};

/// An axis-aligned rectangle in geographic units.
///
/// Invariant: `x1 <= x2` and `y1 <= y2`. Once used as the input MBR of a
/// pyramid, the rectangle must not change for the lifetime of that job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl GeoRect {
    /// Creates a new rectangle.
    ///
    /// # Panics
    ///
    /// Panics if `x1 > x2` or `y1 > y2`.
    #[must_use]
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        assert!(x1 <= x2);
        assert!(y1 <= y2);
        GeoRect { x1, y1, x2, y2 }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    /// The smallest rectangle containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        GeoRect {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Grows the shorter axis around its center so that width equals height.
    ///
    /// Pyramid levels subdivide both axes by the same power of two, so a
    /// square input keeps tiles square at every level.
    #[must_use]
    pub fn expand_to_square(self) -> Self {
        let (w, h) = (self.width(), self.height());
        if w > h {
            let y1 = self.y1 - (w - h) / 2.0;
            GeoRect::new(self.x1, y1, self.x2, y1 + w)
        } else if h > w {
            let x1 = self.x1 - (h - w) / 2.0;
            GeoRect::new(x1, self.y1, x1 + h, self.y2)
        } else {
            self
        }
    }
}

impl Display for GeoRect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.x1, self.y1, self.x2, self.y2)
    }
}

impl FromStr for GeoRect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let &[x1, y1, x2, y2] = parts.as_slice() else {
            return Err(format!("expected 'x1,y1,x2,y2', got '{s}'"));
        };
        let parse = |v: &str| {
            v.parse::<f64>()
                .map_err(|e| format!("invalid coordinate '{v}': {e}"))
        };
        let (x1, y1, x2, y2) = (parse(x1)?, parse(y1)?, parse(x2)?, parse(y2)?);
        if x1 > x2 || y1 > y2 {
            return Err(format!("rectangle '{s}' has min corner beyond max corner"));
        }
        Ok(GeoRect { x1, y1, x2, y2 })
    }
}

/// A single tile position within the pyramid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl Display for TileCoord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}/{}/{}", self.z, self.x, self.y)
        } else {
            write!(f, "{},{},{}", self.z, self.x, self.y)
        }
    }
}

/// Geographic footprint of one tile by axis-aligned subdivision of the
/// input MBR: tile `(z, x, y)` covers the cell `[x/2^z, (x+1)/2^z]` of the
/// width and the matching cell of the height.
///
/// # Panics
///
/// Panics if the coordinate is outside the level's `2^z x 2^z` grid; callers
/// must only pass coordinates produced by the overlap computation.
#[must_use]
pub fn tile_rect(input_mbr: &GeoRect, coord: TileCoord) -> GeoRect {
    assert!(coord.z <= MAX_LEVEL);
    assert!(u64::from(coord.x) < (1u64 << coord.z));
    assert!(u64::from(coord.y) < (1u64 << coord.z));
    let n = f64::from(1u32 << coord.z);
    let w = input_mbr.width() / n;
    let h = input_mbr.height() / n;
    GeoRect::new(
        input_mbr.x1 + f64::from(coord.x) * w,
        input_mbr.y1 + f64::from(coord.y) * h,
        input_mbr.x1 + f64::from(coord.x + 1) * w,
        input_mbr.y1 + f64::from(coord.y + 1) * h,
    )
}

/// The range of tiles at `zoom` whose cells intersect `query`, by linear
/// mapping of the query corners into tile-index space (floor on the low
/// corner, ceiling on the exclusive high corner) and clamping to the grid.
///
/// Returns `None` when the query lies outside the input MBR, or when the
/// query degenerates onto a cell boundary and covers no cell interior.
#[must_use]
#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn tile_range(input_mbr: &GeoRect, query: &GeoRect, zoom: u8) -> Option<TileRect> {
    assert!(zoom <= MAX_LEVEL);
    let (w, h) = (input_mbr.width(), input_mbr.height());
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let n = f64::from(1u32 << zoom);
    let x1 = (((query.x1 - input_mbr.x1) / w * n).floor()).max(0.0);
    let x2 = (((query.x2 - input_mbr.x1) / w * n).ceil()).min(n);
    let y1 = (((query.y1 - input_mbr.y1) / h * n).floor()).max(0.0);
    let y2 = (((query.y2 - input_mbr.y1) / h * n).ceil()).min(n);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(TileRect::new(
        zoom,
        x1 as u32,
        y1 as u32,
        x2 as u32 - 1,
        y2 as u32 - 1,
    ))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_georect_parse_roundtrip() {
        let r: GeoRect = "0,0,100,50".parse().unwrap();
        assert_eq!(r, GeoRect::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(r.to_string().parse::<GeoRect>().unwrap(), r);
    }

    #[rstest]
    #[case("1,2,3")]
    #[case("a,0,1,1")]
    #[case("5,0,1,1")]
    #[case("0,5,1,1")]
    fn test_georect_parse_errors(#[case] s: &str) {
        assert!(s.parse::<GeoRect>().is_err());
    }

    #[rstest]
    #[case(GeoRect::new(0.0, 0.0, 100.0, 40.0), GeoRect::new(0.0, -30.0, 100.0, 70.0))]
    #[case(GeoRect::new(0.0, 0.0, 20.0, 100.0), GeoRect::new(-40.0, 0.0, 60.0, 100.0))]
    #[case(GeoRect::new(3.0, 4.0, 5.0, 6.0), GeoRect::new(3.0, 4.0, 5.0, 6.0))]
    fn test_expand_to_square(#[case] input: GeoRect, #[case] expected: GeoRect) {
        let squared = input.expand_to_square();
        assert_eq!(squared, expected);
        assert_relative_eq!(squared.width(), squared.height());
    }

    #[test]
    fn test_tile_rect_subdivision() {
        let mbr = GeoRect::new(0.0, 0.0, 100.0, 100.0);
        let whole = tile_rect(&mbr, TileCoord { z: 0, x: 0, y: 0 });
        assert_eq!(whole, mbr);

        let cell = tile_rect(&mbr, TileCoord { z: 2, x: 1, y: 3 });
        assert_relative_eq!(cell.x1, 25.0);
        assert_relative_eq!(cell.x2, 50.0);
        assert_relative_eq!(cell.y1, 75.0);
        assert_relative_eq!(cell.y2, 100.0);
    }

    #[rstest]
    // whole MBR covers the whole grid
    #[case(GeoRect::new(0.0, 0.0, 100.0, 100.0), 2, Some((0, 0, 3, 3)))]
    // small box in the lower-left corner
    #[case(GeoRect::new(10.0, 10.0, 20.0, 20.0), 2, Some((0, 0, 0, 0)))]
    // straddles the center lines
    #[case(GeoRect::new(40.0, 40.0, 60.0, 60.0), 1, Some((0, 0, 1, 1)))]
    // entirely outside
    #[case(GeoRect::new(200.0, 200.0, 300.0, 300.0), 3, None)]
    #[case(GeoRect::new(-50.0, 10.0, -10.0, 20.0), 3, None)]
    // degenerate query exactly on a cell boundary covers nothing; a shape
    // in this position at the deepest level never enters the pyramid
    #[case(GeoRect::new(50.0, 50.0, 50.0, 50.0), 1, None)]
    // degenerate query inside a cell covers that cell
    #[case(GeoRect::new(30.0, 30.0, 30.0, 30.0), 1, Some((0, 0, 0, 0)))]
    fn test_tile_range(
        #[case] query: GeoRect,
        #[case] zoom: u8,
        #[case] expected: Option<(u32, u32, u32, u32)>,
    ) {
        let mbr = GeoRect::new(0.0, 0.0, 100.0, 100.0);
        let range = tile_range(&mbr, &query, zoom);
        let expected =
            expected.map(|(min_x, min_y, max_x, max_y)| TileRect::new(zoom, min_x, min_y, max_x, max_y));
        assert_eq!(range, expected);
    }

    #[test]
    fn test_tile_range_clips_partial_overlap() {
        let mbr = GeoRect::new(0.0, 0.0, 100.0, 100.0);
        let query = GeoRect::new(-50.0, 60.0, 30.0, 150.0);
        let range = tile_range(&mbr, &query, 2).unwrap();
        assert_eq!(range, TileRect::new(2, 0, 2, 1, 3));
    }
}
