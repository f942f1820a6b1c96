//! The job driver: level-range handling, MBR derivation, strategy choice,
//! and the local single-scan path.

use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use giza_tile_utils::{GeoRect, MAX_LEVEL, TileIdError};
use rayon::ThreadPoolBuilder;
use tracing::info;

use crate::PlotResult;
use crate::error::PlotError;
use crate::geometry::{Geometry, make_partitions};
use crate::plotter::Plotter;
use crate::pyramid::exec::{HEARTBEAT_EVERY, Progress};
use crate::pyramid::partition::{Partitioning, Phase, run_flat, run_pyramid};
use crate::pyramid::store::CanvasStore;
use crate::pyramid::{SubPyramid, create_tiles, output};

/// An inclusive zoom-level range.
///
/// Parses from `"N"` (meaning N levels, `0..=N-1`) or `"min..max"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Levels {
    pub min: u8,
    pub max: u8,
}

impl Levels {
    /// Creates a range, validating it fits the encodable pyramid depth.
    pub fn new(min: u8, max: u8) -> PlotResult<Self> {
        if min > max {
            return Err(PlotError::InvalidLevels(format!("{min}..{max}")));
        }
        if max > MAX_LEVEL {
            return Err(TileIdError::LevelTooDeep(max).into());
        }
        Ok(Levels { min, max })
    }
}

impl FromStr for Levels {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PlotError::InvalidLevels(s.to_string());
        if let Some((min, max)) = s.split_once("..") {
            let min: u8 = min.trim().parse().map_err(|_| invalid())?;
            let max: u8 = max.trim().parse().map_err(|_| invalid())?;
            if min > max {
                return Err(invalid());
            }
            Levels::new(min, max)
        } else {
            let count: u8 = s.trim().parse().map_err(|_| invalid())?;
            if count == 0 {
                return Err(invalid());
            }
            Levels::new(0, count - 1)
        }
    }
}

impl Display for Levels {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// Configuration surface of one plot job.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Zoom-level range to generate.
    pub levels: Levels,
    /// Tile pixel width.
    pub tile_width: u32,
    /// Tile pixel height.
    pub tile_height: u32,
    /// Levels solved per reduce stage by pyramid partitioning (k).
    pub levels_per_reducer: u8,
    /// Deepest level still handled with flat partitioning.
    pub flat_threshold: u8,
    /// Flip y in the output coordinate convention.
    pub vflip: bool,
    /// Square the input MBR so levels subdivide evenly.
    pub keep_ratio: bool,
    /// Explicit input MBR; derived from the shapes when absent.
    pub mbr: Option<GeoRect>,
    /// Force one technique for the whole range instead of the two-phase
    /// threshold split.
    pub partition: Option<Partitioning>,
    /// Small-job signal: scan once and skip the map/reduce machinery.
    pub local: bool,
    /// Worker count for the map/reduce stages and output writing; defaults
    /// to the number of CPUs.
    pub parallelism: Option<usize>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            levels: Levels { min: 0, max: 6 },
            tile_width: 256,
            tile_height: 256,
            levels_per_reducer: 3,
            flat_threshold: 4,
            vflip: true,
            keep_ratio: true,
            mbr: None,
            partition: None,
            local: false,
            parallelism: None,
        }
    }
}

impl PlotOptions {
    fn workers(&self) -> usize {
        self.parallelism.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// What a finished job produced.
#[derive(Debug, Clone, Copy)]
pub struct PlotSummary {
    pub tiles_written: u64,
    pub levels: Levels,
    pub input_mbr: GeoRect,
}

impl Display for PlotSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} tiles over levels {} of ({})",
            self.tiles_written, self.levels, self.input_mbr
        )
    }
}

/// Runs one whole plot job: derives the input MBR, generates every tile of
/// the requested level range, and writes the output directory.
///
/// All configuration errors surface before any tile work starts. Partial
/// output after a failure must not be served.
pub fn plot(
    shapes: Vec<Geometry>,
    out_dir: &Path,
    plotter: &dyn Plotter,
    opts: &PlotOptions,
) -> PlotResult<PlotSummary> {
    let levels = Levels::new(opts.levels.min, opts.levels.max)?;

    let input_mbr = match opts.mbr {
        Some(mbr) => mbr,
        None => derive_mbr(&shapes).ok_or(PlotError::EmptyInput)?,
    };
    let input_mbr = if opts.keep_ratio {
        input_mbr.expand_to_square()
    } else {
        input_mbr
    };

    info!(
        "plotting {} shapes over levels {levels} of ({input_mbr})",
        shapes.len()
    );

    // all data-parallel work runs on one pool sized to the requested
    // worker count, not the global CPU-count pool
    let pool = ThreadPoolBuilder::new()
        .num_threads(opts.workers())
        .build()?;
    let tiles = if opts.local {
        plot_local(shapes, input_mbr, plotter, opts, levels)?
    } else {
        pool.install(|| run_phases(shapes, input_mbr, plotter, opts, levels))?
    };

    info!("generated {} tiles, writing output", tiles.len());
    let tiles_written =
        pool.install(|| output::write_output(tiles, out_dir, plotter, opts, levels))?;

    Ok(PlotSummary {
        tiles_written,
        levels,
        input_mbr,
    })
}

/// Union of all shape MBRs; `None` when no shape has one.
fn derive_mbr(shapes: &[Geometry]) -> Option<GeoRect> {
    shapes
        .iter()
        .filter_map(Geometry::mbr)
        .reduce(|acc, mbr| acc.union(&mbr))
}

/// Single-machine path: one scan of all shapes into one store, no shuffle.
fn plot_local(
    shapes: Vec<Geometry>,
    input_mbr: GeoRect,
    plotter: &dyn Plotter,
    opts: &PlotOptions,
    levels: Levels,
) -> PlotResult<CanvasStore> {
    let sub = SubPyramid::full(input_mbr, levels.min, levels.max);
    let shapes = if plotter.supports_smooth() {
        plotter.smooth(shapes)
    } else {
        shapes
    };
    let progress = Progress::new(shapes.len() as u64);
    let mut tiles = CanvasStore::default();
    for shape in &shapes {
        create_tiles(
            std::slice::from_ref(shape),
            &sub,
            opts.tile_width,
            opts.tile_height,
            plotter,
            &mut tiles,
        )?;
        if progress.inc() % HEARTBEAT_EVERY == 0 {
            info!("{progress}");
        }
    }
    Ok(tiles)
}

/// Distributed-style path: split the level range at the flat/pyramid
/// threshold and run each slice as its own map/reduce job. The two phases
/// land in disjoint tile-id spaces, so collecting them is a plain union.
fn run_phases(
    shapes: Vec<Geometry>,
    input_mbr: GeoRect,
    plotter: &dyn Plotter,
    opts: &PlotOptions,
    levels: Levels,
) -> PlotResult<CanvasStore> {
    let phase = |min_level: u8, max_level: u8| Phase {
        input_mbr,
        min_level,
        max_level,
        tile_width: opts.tile_width,
        tile_height: opts.tile_height,
        levels_per_reducer: opts.levels_per_reducer,
        plotter,
    };
    let partitions = make_partitions(shapes, opts.workers());

    if let Some(technique) = opts.partition {
        info!("forcing {technique} partitioning for levels {levels}");
        return match technique {
            Partitioning::Flat => run_flat(&phase(levels.min, levels.max), partitions),
            Partitioning::Pyramid => run_pyramid(&phase(levels.min, levels.max), partitions),
        };
    }

    let mut tiles = CanvasStore::default();
    if levels.min <= opts.flat_threshold {
        let flat_max = opts.flat_threshold.min(levels.max);
        info!("using flat partitioning in levels {}..{flat_max}", levels.min);
        tiles.absorb(
            run_flat(&phase(levels.min, flat_max), partitions.clone())?,
            plotter,
        );
    }
    if levels.max > opts.flat_threshold {
        let pyramid_min = levels.min.max(opts.flat_threshold + 1);
        info!(
            "using pyramid partitioning in levels {pyramid_min}..{}",
            levels.max
        );
        tiles.absorb(
            run_pyramid(&phase(pyramid_min, levels.max), partitions)?,
            plotter,
        );
    }
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("7", Levels { min: 0, max: 6 })]
    #[case("1", Levels { min: 0, max: 0 })]
    #[case("0..2", Levels { min: 0, max: 2 })]
    #[case("3..10", Levels { min: 3, max: 10 })]
    #[case(" 2 .. 4 ", Levels { min: 2, max: 4 })]
    fn test_levels_parse(#[case] s: &str, #[case] expected: Levels) {
        assert_eq!(s.parse::<Levels>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("0")]
    #[case("5..2")]
    #[case("a..b")]
    #[case("1..2..3")]
    fn test_levels_parse_errors(#[case] s: &str) {
        assert!(matches!(
            s.parse::<Levels>(),
            Err(PlotError::InvalidLevels(_))
        ));
    }

    #[test]
    fn test_levels_too_deep_is_config_error() {
        assert!(matches!(
            "28..31".parse::<Levels>(),
            Err(PlotError::TileId(TileIdError::LevelTooDeep(31)))
        ));
    }

    #[test]
    fn test_levels_roundtrip_display() {
        let levels: Levels = "2..5".parse().unwrap();
        assert_eq!(levels.to_string().parse::<Levels>().unwrap(), levels);
    }

    #[test]
    fn test_derive_mbr_unions_shapes() {
        let shapes = [
            Geometry::Point { x: 10.0, y: 50.0 },
            Geometry::Rect(GeoRect::new(20.0, 0.0, 30.0, 5.0)),
        ];
        assert_eq!(derive_mbr(&shapes), Some(GeoRect::new(10.0, 0.0, 30.0, 50.0)));
        assert_eq!(derive_mbr(&[]), None);
    }
}
