//! The output stage: encode finished canvases into an image-per-tile
//! directory alongside a ready-to-open HTML viewer.

use std::fs::{self, File};
use std::io::{BufWriter, Write as _};
use std::path::Path;

use giza_tile_utils::{GeoRect, TileCoord};
use rayon::prelude::*;
use tracing::info;

use crate::PlotResult;
use crate::error::PlotError;
use crate::plotter::Plotter;
use crate::pyramid::exec::{HEARTBEAT_EVERY, Progress};
use crate::pyramid::plot::{Levels, PlotOptions};
use crate::pyramid::store::CanvasStore;

const VIEWER_TEMPLATE: &str = include_str!("zoom_view.html");
const TILE_URL: &str = "tile-{z}-{x}-{y}.png";

/// Output file name for one tile, applying the vertical-flip naming
/// convention when requested.
fn tile_file_name(coord: TileCoord, vflip: bool) -> String {
    let y = if vflip {
        (1u32 << coord.z) - 1 - coord.y
    } else {
        coord.y
    };
    format!("tile-{}-{}-{y}.png", coord.z, coord.x)
}

/// Writes every canvas of the store into `out_dir` as
/// `tile-{z}-{x}-{y}.png`, plus `default.png` for empty tiles and an
/// `index.html` viewer. Returns the number of tile images written.
///
/// Tiles land in independent files, so workers write concurrently over
/// disjoint slices of the sorted entries.
pub fn write_output(
    tiles: CanvasStore,
    out_dir: &Path,
    plotter: &dyn Plotter,
    opts: &PlotOptions,
    levels: Levels,
) -> PlotResult<u64> {
    fs::create_dir_all(out_dir).map_err(|e| PlotError::WriteError(e, out_dir.to_path_buf()))?;

    write_default_tile(out_dir, plotter, opts)?;
    write_viewer(out_dir, opts, levels)?;

    let entries = tiles.into_entries();
    let total = entries.len() as u64;
    let progress = Progress::new(total);

    entries.into_par_iter().try_for_each(|(id, canvas)| {
        let path = out_dir.join(tile_file_name(id.decode(), opts.vflip));
        let file = File::create(&path).map_err(|e| PlotError::WriteError(e, path.clone()))?;
        let mut out = BufWriter::new(file);
        plotter.write_image(&canvas, &mut out, opts.vflip)?;
        out.flush().map_err(|e| PlotError::WriteError(e, path))?;

        if progress.inc() % HEARTBEAT_EVERY == 0 {
            info!("{progress}");
        }
        Ok::<(), PlotError>(())
    })?;

    info!("{progress}");
    Ok(total)
}

/// The image served for tiles the pyramid never produced.
fn write_default_tile(
    out_dir: &Path,
    plotter: &dyn Plotter,
    opts: &PlotOptions,
) -> PlotResult<()> {
    let blank = plotter.create_canvas(
        opts.tile_width,
        opts.tile_height,
        GeoRect::new(0.0, 0.0, 1.0, 1.0),
    );
    let path = out_dir.join("default.png");
    let file = File::create(&path).map_err(|e| PlotError::WriteError(e, path.clone()))?;
    let mut out = BufWriter::new(file);
    plotter.write_image(&blank, &mut out, false)?;
    out.flush().map_err(|e| PlotError::WriteError(e, path))?;
    Ok(())
}

/// Instantiates the bundled viewer template for this pyramid's dimensions.
fn write_viewer(out_dir: &Path, opts: &PlotOptions, levels: Levels) -> PlotResult<()> {
    let html = VIEWER_TEMPLATE
        .replace("#{TILE_WIDTH}", &opts.tile_width.to_string())
        .replace("#{TILE_HEIGHT}", &opts.tile_height.to_string())
        .replace("#{MIN_ZOOM}", &levels.min.to_string())
        .replace("#{MAX_ZOOM}", &levels.max.to_string())
        .replace("#{TILE_URL}", TILE_URL);
    let path = out_dir.join("index.html");
    fs::write(&path, html).map_err(|e| PlotError::WriteError(e, path))?;
    Ok(())
}
