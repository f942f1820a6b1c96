//! The multilevel tile-pyramid engine.
//!
//! A [`SubPyramid`] bounds the region of the pyramid one task works on; the
//! overlap computation maps a shape's bounding box to the tiles it touches
//! at every level in range, finest level first, coarsening by halving
//! between levels. [`create_tiles`] drives that walk and rasterizes shapes
//! into lazily created per-tile canvases.

use giza_tile_utils::{GeoRect, MAX_LEVEL, TileCoord, TileId, TileRect, tile_range, tile_rect};

use crate::PlotResult;
use crate::geometry::Geometry;
use crate::plotter::Plotter;

mod exec;
mod output;
mod partition;
mod plot;
mod store;

pub use exec::Progress;
pub use output::write_output;
pub use partition::Partitioning;
pub use plot::{Levels, PlotOptions, PlotSummary, plot};
pub use store::CanvasStore;

/// A bounded region of the pyramid: a level range plus a tile range
/// expressed at the deepest level.
///
/// Created once per job or sub-job and read-only thereafter. The column and
/// row bounds use an exclusive max corner.
#[derive(Debug, Clone, Copy)]
pub struct SubPyramid {
    input_mbr: GeoRect,
    min_level: u8,
    max_level: u8,
    c1: u32,
    r1: u32,
    c2: u32,
    r2: u32,
}

impl SubPyramid {
    /// Creates a sub-pyramid over an explicit tile range at `max_level`.
    ///
    /// # Panics
    ///
    /// Panics when the level range is inverted, deeper than [`MAX_LEVEL`],
    /// or the tile range is empty or outside the `2^max_level` grid.
    #[must_use]
    pub fn new(
        input_mbr: GeoRect,
        min_level: u8,
        max_level: u8,
        c1: u32,
        r1: u32,
        c2: u32,
        r2: u32,
    ) -> Self {
        assert!(min_level <= max_level);
        assert!(max_level <= MAX_LEVEL);
        assert!(c1 < c2 && u64::from(c2) <= (1u64 << max_level));
        assert!(r1 < r2 && u64::from(r2) <= (1u64 << max_level));
        SubPyramid {
            input_mbr,
            min_level,
            max_level,
            c1,
            r1,
            c2,
            r2,
        }
    }

    /// The sub-pyramid spanning every tile of the given level range.
    #[must_use]
    pub fn full(input_mbr: GeoRect, min_level: u8, max_level: u8) -> Self {
        let n = 1u32 << max_level;
        Self::new(input_mbr, min_level, max_level, 0, 0, n, n)
    }

    /// The local sub-pyramid a reducer rebuilds around one boundary tile:
    /// the tile itself plus up to `levels - 1` levels beneath it, capped at
    /// `cap_level`.
    #[must_use]
    pub fn for_tile(input_mbr: GeoRect, tile: TileCoord, levels: u8, cap_level: u8) -> Self {
        debug_assert!(levels >= 1);
        let max_level = cap_level.min(tile.z + levels - 1);
        let down = max_level - tile.z;
        Self::new(
            input_mbr,
            tile.z,
            max_level,
            tile.x << down,
            tile.y << down,
            (tile.x + 1) << down,
            (tile.y + 1) << down,
        )
    }

    #[must_use]
    pub fn input_mbr(&self) -> GeoRect {
        self.input_mbr
    }

    #[must_use]
    pub fn min_level(&self) -> u8 {
        self.min_level
    }

    #[must_use]
    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    /// The tiles at `max_level` that `mbr` overlaps, clamped to this
    /// sub-pyramid's own tile range. `None` when there is no overlap.
    ///
    /// Coarser levels are derived from this range with
    /// [`TileRect::coarsen`], never recomputed from geography, so rounding
    /// can never make a shape miss a coarse tile it covers at a fine one.
    #[must_use]
    pub fn overlapping_tiles(&self, mbr: &GeoRect) -> Option<TileRect> {
        let range = tile_range(&self.input_mbr, mbr, self.max_level)?;
        let own = TileRect::new(
            self.max_level,
            self.c1,
            self.r1,
            self.c2 - 1,
            self.r2 - 1,
        );
        range.intersect(&own)
    }
}

/// Rasterizes `shapes` into every tile of `sub` they overlap, accumulating
/// canvases in `tiles`.
///
/// Canvases are created on first shape overlap only, so memory stays
/// bounded by the number of distinct tiles touched, not by pyramid size.
///
/// A zero-extent shape sitting exactly on a cell boundary of the deepest
/// level covers no cell interior there, so it has no range to coarsen from
/// and is dropped at every level, including coarser ones where its position
/// falls inside a cell. Such shapes cover zero pixels anyway.
pub fn create_tiles(
    shapes: &[Geometry],
    sub: &SubPyramid,
    tile_width: u32,
    tile_height: u32,
    plotter: &dyn Plotter,
    tiles: &mut CanvasStore,
) -> PlotResult<()> {
    let input_mbr = sub.input_mbr();
    for shape in shapes {
        let Some(mbr) = shape.mbr() else { continue };
        let Some(mut range) = sub.overlapping_tiles(&mbr) else {
            continue;
        };
        loop {
            for coord in range.tiles() {
                let id = TileId::new(coord)?;
                let canvas = tiles.get_or_insert_with(id, || {
                    plotter.create_canvas(tile_width, tile_height, tile_rect(&input_mbr, coord))
                });
                plotter.plot(canvas, shape);
            }
            if range.zoom == sub.min_level() {
                break;
            }
            range = range.coarsen(1);
        }
    }
    Ok(())
}
