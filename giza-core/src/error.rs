use std::io;
use std::path::PathBuf;

use giza_tile_utils::TileIdError;

/// A convenience [`Result`] for the giza-core crate.
pub type PlotResult<T> = Result<T, PlotError>;

/// Errors of the pyramid engine.
///
/// Configuration errors (`InvalidLevels`, `UnknownPartitioning`,
/// `UnknownPlotter`, `TileId`) are raised before any work starts; the rest
/// surface from individual tasks and fail the whole job.
#[derive(thiserror::Error, Debug)]
pub enum PlotError {
    #[error("invalid level range '{0}': expected a single level count or 'min..max'")]
    InvalidLevels(String),

    #[error("unknown partitioning technique '{0}': expected 'flat' or 'pyramid'")]
    UnknownPartitioning(String),

    #[error("unknown plotter '{0}'")]
    UnknownPlotter(String),

    #[error("no input geometries and no explicit MBR to derive the plot area from")]
    EmptyInput,

    #[error(transparent)]
    TileId(#[from] TileIdError),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("unable to write {1}: {0}")]
    WriteError(#[source] io::Error, PathBuf),

    #[error(transparent)]
    ImageError(#[from] image::ImageError),

    #[error(transparent)]
    IoError(#[from] io::Error),
}
