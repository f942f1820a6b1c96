use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use giza_core::PlotError;
use giza_core::geometry::read_geometries;
use giza_core::plotter::plotter_by_name;
use giza_core::pyramid::{Levels, Partitioning, PlotOptions, plot};
use giza_tile_utils::GeoRect;
use tracing::{error, info};

use crate::logging::{default_filter, init_tracing};

mod logging;

/// Defines the styles used for the CLI help output.
const HELP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug, PartialEq)]
#[command(
    about = "A tool to render geometric data as a multilevel pyramid of raster tiles",
    version,
    after_help = "Use RUST_LOG environment variable to control logging level, e.g. RUST_LOG=debug or RUST_LOG=giza=debug.\nUse GIZA_FORMAT environment variable to control output format: compact (default), full, pretty, or json.\nSee https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html for more information.",
    styles = HELP_STYLES
)]
pub struct PlotArgs {
    /// Input files with one shape per line: `x,y` for a point or `x1,y1,x2,y2` for a box.
    #[arg(required = true)]
    pub input: Vec<PathBuf>,
    /// Directory to write the tile images and viewer into.
    #[arg(short, long)]
    pub output: PathBuf,
    /// Levels to generate: a count like `7` (levels 0 to 6), or an inclusive range like `2..5`.
    #[arg(short, long, default_value = "7")]
    pub levels: Levels,
    /// Rasterizer to plot shapes with.
    #[arg(long, default_value = "geometric")]
    pub plotter: String,
    /// Force one partitioning technique (flat or pyramid) for the whole level range.
    ///
    /// If omitted, shallow levels use flat partitioning and deep levels use
    /// pyramid partitioning, split at the flat threshold.
    #[arg(long, value_name = "TECHNIQUE")]
    pub partition: Option<Partitioning>,
    /// Tile width in pixels.
    #[arg(long, alias = "tilewidth", default_value = "256")]
    pub tile_width: u32,
    /// Tile height in pixels.
    #[arg(long, alias = "tileheight", default_value = "256")]
    pub tile_height: u32,
    /// Number of levels each reduce task of pyramid partitioning solves locally.
    #[arg(short = 'k', long, default_value = "3")]
    pub levels_per_reducer: u8,
    /// Deepest level still handled with flat partitioning when no technique is forced.
    #[arg(long, default_value = "4")]
    pub flat_threshold: u8,
    /// Plot area as `x1,y1,x2,y2`. Derived from the input shapes when omitted.
    #[arg(long)]
    pub mbr: Option<GeoRect>,
    /// Keep the y axis pointing up instead of flipping to the screen-oriented convention.
    #[arg(long)]
    pub no_vflip: bool,
    /// Use the plot area as-is instead of expanding it to a square.
    #[arg(long)]
    pub no_keep_ratio: bool,
    /// Process everything in one scan, skipping the partitioned pipeline.
    #[arg(long)]
    pub local: bool,
    /// Number of parallel workers. [DEFAULT: number of CPUs]
    #[arg(long)]
    pub parallel: Option<NonZeroUsize>,
}

#[derive(thiserror::Error, Debug)]
enum GizaError {
    #[error(transparent)]
    Plot(#[from] PlotError),
    #[error("unable to read {1}: {0}")]
    ReadInput(#[source] std::io::Error, PathBuf),
}

fn run(args: PlotArgs) -> Result<(), GizaError> {
    let mut shapes = Vec::new();
    for path in &args.input {
        let file = File::open(path).map_err(|e| GizaError::ReadInput(e, path.clone()))?;
        let mut read = read_geometries(BufReader::new(file))
            .map_err(|e| GizaError::ReadInput(e, path.clone()))?;
        info!("read {} shapes from {}", read.len(), path.display());
        shapes.append(&mut read);
    }

    let plotter = plotter_by_name(&args.plotter)?;
    let opts = PlotOptions {
        levels: args.levels,
        tile_width: args.tile_width,
        tile_height: args.tile_height,
        levels_per_reducer: args.levels_per_reducer,
        flat_threshold: args.flat_threshold,
        vflip: !args.no_vflip,
        keep_ratio: !args.no_keep_ratio,
        mbr: args.mbr,
        partition: args.partition,
        local: args.local,
        parallelism: args.parallel.map(NonZeroUsize::get),
    };

    let summary = plot(shapes, &args.output, plotter.as_ref(), &opts)?;
    info!("wrote {summary} into {}", args.output.display());
    Ok(())
}

fn main() {
    let filter = default_filter(std::env::var("RUST_LOG").ok());
    init_tracing(&filter, std::env::var("GIZA_FORMAT").ok());

    let args = PlotArgs::parse();
    if let Err(e) = run(args) {
        error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;

    use super::*;

    fn parse(args: &[&str]) -> PlotArgs {
        PlotArgs::try_parse_from(
            std::iter::once("giza").chain(args.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["points.txt", "-o", "out"]);
        assert_eq!(args.levels, Levels { min: 0, max: 6 });
        assert_eq!(args.plotter, "geometric");
        assert_eq!(args.partition, None);
        assert_eq!(args.tile_width, 256);
        assert_eq!(args.tile_height, 256);
        assert_eq!(args.levels_per_reducer, 3);
        assert_eq!(args.flat_threshold, 4);
        assert!(!args.no_vflip && !args.no_keep_ratio && !args.local);
    }

    #[rstest]
    #[case(&["-l", "2..5"], Levels { min: 2, max: 5 })]
    #[case(&["--levels", "3"], Levels { min: 0, max: 2 })]
    fn test_levels_arg(#[case] extra: &[&str], #[case] expected: Levels) {
        let mut argv = vec!["a.txt", "-o", "out"];
        argv.extend_from_slice(extra);
        assert_eq!(parse(&argv).levels, expected);
    }

    #[test]
    fn test_technique_and_mbr_args() {
        let args = parse(&[
            "a.txt",
            "b.txt",
            "-o",
            "out",
            "--partition",
            "pyramid",
            "-k",
            "2",
            "--mbr",
            "0,0,100,100",
            "--tilewidth",
            "128",
        ]);
        assert_eq!(args.input.len(), 2);
        assert_eq!(args.partition, Some(Partitioning::Pyramid));
        assert_eq!(args.levels_per_reducer, 2);
        assert_eq!(args.mbr, Some(GeoRect::new(0.0, 0.0, 100.0, 100.0)));
        assert_eq!(args.tile_width, 128);
    }

    #[rstest]
    #[case(&["-o", "out"])] // no input
    #[case(&["a.txt", "-o", "out", "-l", "5..2"])]
    #[case(&["a.txt", "-o", "out", "--partition", "spiral"])]
    fn test_rejected_args(#[case] argv: &[&str]) {
        assert!(
            PlotArgs::try_parse_from(std::iter::once("giza").chain(argv.iter().copied())).is_err()
        );
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("shapes.txt");
        fs::write(&input, "10,10,20,20\n55,60\n").unwrap();
        let out = dir.path().join("pyramid");

        let args = parse(&[
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-l",
            "0..2",
            "--mbr",
            "0,0,100,100",
            "--local",
        ]);
        run(args).unwrap();

        assert!(out.join("tile-0-0-0.png").exists());
        assert!(out.join("default.png").exists());
        assert!(out.join("index.html").exists());
    }

    #[test]
    fn test_run_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = parse(&[
            "no-such-file.txt",
            "-o",
            dir.path().to_str().unwrap(),
        ]);
        assert!(matches!(run(args), Err(GizaError::ReadInput(_, _))));
    }
}
