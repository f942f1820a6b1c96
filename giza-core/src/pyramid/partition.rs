//! The two work-distribution strategies.
//!
//! Flat partitioning lets every map task rasterize its own shapes across
//! the whole level range and merges per-tile canvases in reduce; pyramid
//! partitioning replicates shapes to coarse boundary tiles and lets each
//! reduce task solve the k levels beneath its tile locally, bounding
//! reducer fan-in to `4^k` tiles regardless of pyramid depth.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use giza_tile_utils::{GeoRect, TileId, tile_rect};
use tracing::debug;

use crate::PlotResult;
use crate::error::PlotError;
use crate::geometry::Geometry;
use crate::plotter::{Canvas, Plotter};
use crate::pyramid::store::CanvasStore;
use crate::pyramid::{SubPyramid, create_tiles, exec};

/// Which distribution strategy a phase runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partitioning {
    /// Every partition computes all levels; reduce merges per tile.
    Flat,
    /// Shapes replicate to boundary tiles; reduce refines k levels locally.
    Pyramid,
}

impl FromStr for Partitioning {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Partitioning::Flat),
            "pyramid" => Ok(Partitioning::Pyramid),
            _ => Err(PlotError::UnknownPartitioning(s.to_string())),
        }
    }
}

impl Display for Partitioning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Partitioning::Flat => f.write_str("flat"),
            Partitioning::Pyramid => f.write_str("pyramid"),
        }
    }
}

/// Everything one phase of the job needs; the level range is the phase's
/// own slice of the requested range.
pub(crate) struct Phase<'a> {
    pub input_mbr: GeoRect,
    pub min_level: u8,
    pub max_level: u8,
    pub tile_width: u32,
    pub tile_height: u32,
    pub levels_per_reducer: u8,
    pub plotter: &'a dyn Plotter,
}

impl Phase<'_> {
    fn smoothed(&self, shapes: Vec<Geometry>) -> Vec<Geometry> {
        if self.plotter.supports_smooth() {
            self.plotter.smooth(shapes)
        } else {
            shapes
        }
    }
}

/// Flat partitioning: map rasterizes each partition's shapes across the
/// whole level range into local canvases; reduce merges the partial
/// canvases of each tile in deterministic order.
pub(crate) fn run_flat(
    phase: &Phase<'_>,
    partitions: Vec<Vec<Geometry>>,
) -> PlotResult<CanvasStore> {
    let sub = SubPyramid::full(phase.input_mbr, phase.min_level, phase.max_level);
    debug!(
        "flat partitioning over {} partitions, levels {}..{}",
        partitions.len(),
        phase.min_level,
        phase.max_level
    );
    let merged = exec::map_reduce(
        partitions,
        |shapes| {
            let shapes = phase.smoothed(shapes);
            let mut local = CanvasStore::default();
            create_tiles(
                &shapes,
                &sub,
                phase.tile_width,
                phase.tile_height,
                phase.plotter,
                &mut local,
            )?;
            Ok(local.into_entries())
        },
        |id: TileId, partials: Vec<Canvas>| {
            let geo = tile_rect(&phase.input_mbr, id.decode());
            let mut merged = phase
                .plotter
                .create_canvas(phase.tile_width, phase.tile_height, geo);
            for partial in partials {
                phase.plotter.merge(&mut merged, partial);
            }
            Ok((id, merged))
        },
    )?;
    Ok(merged.into_iter().collect())
}

/// Pyramid partitioning: map emits `(boundary tile, shape)` pairs at every
/// k-th level below the adjusted max; reduce rebuilds the local sub-pyramid
/// under its tile and rasterizes there.
pub(crate) fn run_pyramid(
    phase: &Phase<'_>,
    partitions: Vec<Vec<Geometry>>,
) -> PlotResult<CanvasStore> {
    let k = phase.levels_per_reducer.max(1);
    // align the deepest boundary level so that stepping down by k lands
    // exactly on min_level
    let adjusted_max = phase.max_level - (phase.max_level - phase.min_level) % k;
    let sub = SubPyramid::full(phase.input_mbr, phase.min_level, adjusted_max);
    debug!(
        "pyramid partitioning with k={k}, boundary levels {}..{} step {k}",
        phase.min_level, adjusted_max
    );

    let produced = exec::map_reduce(
        partitions,
        |shapes: Vec<Geometry>| {
            let mut out = Vec::new();
            for shape in &shapes {
                let Some(mbr) = shape.mbr() else { continue };
                let Some(mut range) = sub.overlapping_tiles(&mbr) else {
                    continue;
                };
                loop {
                    for coord in range.tiles() {
                        out.push((TileId::new(coord)?, shape.clone()));
                    }
                    if range.zoom == phase.min_level {
                        break;
                    }
                    range = range.coarsen(k);
                }
            }
            Ok(out)
        },
        |id: TileId, shapes: Vec<Geometry>| {
            let local = SubPyramid::for_tile(phase.input_mbr, id.decode(), k, phase.max_level);
            let shapes = phase.smoothed(shapes);
            let mut store = CanvasStore::default();
            create_tiles(
                &shapes,
                &local,
                phase.tile_width,
                phase.tile_height,
                phase.plotter,
                &mut store,
            )?;
            Ok(store.into_entries())
        },
    )?;
    Ok(produced.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use giza_tile_utils::TileCoord;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::plotter::plotter_by_name;

    fn phase(plotter: &dyn Plotter, min: u8, max: u8, k: u8) -> Phase<'_> {
        Phase {
            input_mbr: GeoRect::new(0.0, 0.0, 100.0, 100.0),
            min_level: min,
            max_level: max,
            tile_width: 32,
            tile_height: 32,
            levels_per_reducer: k,
            plotter,
        }
    }

    fn sample_shapes() -> Vec<Vec<Geometry>> {
        vec![
            vec![
                Geometry::Rect(GeoRect::new(10.0, 10.0, 20.0, 20.0)),
                Geometry::Point { x: 55.0, y: 60.0 },
            ],
            vec![
                Geometry::Rect(GeoRect::new(5.0, 70.0, 95.0, 90.0)),
                Geometry::Point { x: 11.0, y: 11.0 },
            ],
            vec![Geometry::Rect(GeoRect::new(0.0, 0.0, 100.0, 100.0))],
        ]
    }

    #[test]
    fn test_unknown_technique_is_config_error() {
        assert!(matches!(
            "spiral".parse::<Partitioning>(),
            Err(PlotError::UnknownPartitioning(_))
        ));
        assert_eq!("Flat".parse::<Partitioning>().unwrap(), Partitioning::Flat);
        assert_eq!(
            "PYRAMID".parse::<Partitioning>().unwrap(),
            Partitioning::Pyramid
        );
    }

    /// Strategy choice must not be observable in the output: same tiles,
    /// pixel-identical content.
    #[rstest]
    #[case(0, 5, 2)]
    #[case(0, 6, 3)]
    #[case(2, 6, 3)]
    #[case(1, 4, 5)] // k larger than the range collapses to one stage
    fn test_strategies_are_equivalent(#[case] min: u8, #[case] max: u8, #[case] k: u8) {
        let plotter = plotter_by_name("geometric").unwrap();
        let phase = phase(plotter.as_ref(), min, max, k);

        let flat = run_flat(&phase, sample_shapes()).unwrap();
        let pyramid = run_pyramid(&phase, sample_shapes()).unwrap();

        assert_eq!(flat.tile_ids(), pyramid.tile_ids());
        for (id, canvas) in flat.into_entries() {
            let other = pyramid.get(id).unwrap();
            assert_eq!(canvas.geo(), other.geo(), "geo mismatch for {id}");
            assert!(canvas.image() == other.image(), "pixel mismatch for {id}");
        }
    }

    /// A shape covering the whole MBR yields one tile at level 0 and four
    /// at level 1, for any k.
    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    fn test_full_mbr_shape_tile_counts(#[case] k: u8) {
        let plotter = plotter_by_name("geometric").unwrap();
        let phase = phase(plotter.as_ref(), 0, 1, k);
        let shapes = vec![vec![Geometry::Rect(GeoRect::new(0.0, 0.0, 100.0, 100.0))]];

        let store = run_pyramid(&phase, shapes).unwrap();
        let per_level: Vec<u8> = store.tile_ids().iter().map(|t| t.zoom()).collect();
        assert_eq!(per_level.iter().filter(|z| **z == 0).count(), 1);
        assert_eq!(per_level.iter().filter(|z| **z == 1).count(), 4);
    }

    #[test]
    fn test_shape_outside_mbr_produces_no_tiles() {
        let plotter = plotter_by_name("geometric").unwrap();
        let phase = phase(plotter.as_ref(), 0, 4, 2);
        let shapes = vec![vec![Geometry::Rect(GeoRect::new(500.0, 500.0, 600.0, 600.0))]];
        assert!(run_flat(&phase, shapes.clone()).unwrap().is_empty());
        assert!(run_pyramid(&phase, shapes).unwrap().is_empty());
    }

    /// Every level of the requested range is produced exactly once even
    /// when the range is not a multiple of k.
    #[test]
    fn test_pyramid_covers_uneven_ranges() {
        let plotter = plotter_by_name("geometric").unwrap();
        let phase = phase(plotter.as_ref(), 0, 5, 3);
        let shapes = vec![vec![Geometry::Rect(GeoRect::new(0.0, 0.0, 100.0, 100.0))]];
        let store = run_pyramid(&phase, shapes).unwrap();

        for z in 0..=5u8 {
            let count = store.tile_ids().iter().filter(|id| id.zoom() == z).count();
            assert_eq!(count as u64, 1u64 << (2 * u32::from(z)), "level {z}");
        }
    }

    #[test]
    fn test_pyramid_map_replicates_to_boundary_levels_only() {
        let plotter = plotter_by_name("geometric").unwrap();
        // range 0..4 with k=2: boundary levels are 4, 2, 0
        let phase = phase(plotter.as_ref(), 0, 4, 2);
        let shapes = vec![vec![Geometry::Point { x: 55.0, y: 60.0 }]];
        let store = run_pyramid(&phase, shapes).unwrap();
        // all five levels still come out of the reducers
        let zooms: Vec<u8> = store.tile_ids().iter().map(|t| t.zoom()).collect();
        assert_eq!(zooms, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pyramid_equals_coord_check() {
        let plotter = plotter_by_name("geometric").unwrap();
        let phase = phase(plotter.as_ref(), 0, 2, 3);
        let shapes = vec![vec![Geometry::Rect(GeoRect::new(10.0, 10.0, 20.0, 20.0))]];
        let store = run_pyramid(&phase, shapes).unwrap();
        let coords: Vec<TileCoord> = store.tile_ids().iter().map(|id| id.decode()).collect();
        assert_eq!(
            coords,
            vec![
                TileCoord { z: 0, x: 0, y: 0 },
                TileCoord { z: 1, x: 0, y: 0 },
                TileCoord { z: 2, x: 0, y: 0 },
            ]
        );
    }
}
