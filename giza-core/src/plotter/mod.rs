//! The pluggable rasterization capability.
//!
//! A [`Plotter`] turns shapes into pixels on per-tile canvases and merges
//! partial canvases into final ones. The engine drives it through this
//! trait only; concrete plotters are selected by name at startup.

use std::fmt::{Debug, Formatter};
use std::io::{Cursor, Write};

use giza_tile_utils::GeoRect;
use image::{ImageFormat, RgbaImage};

use crate::PlotResult;
use crate::error::PlotError;
use crate::geometry::Geometry;

mod geometric;

pub use geometric::GeometricPlotter;

/// An in-progress raster for one tile.
///
/// A canvas is created lazily on first shape overlap, owned by the worker
/// that created it until merge time, and destroyed after being written or
/// merged into a final result.
#[derive(Clone, PartialEq)]
pub struct Canvas {
    geo: GeoRect,
    image: RgbaImage,
}

impl Canvas {
    #[must_use]
    pub fn new(width: u32, height: u32, geo: GeoRect) -> Self {
        Canvas {
            geo,
            image: RgbaImage::new(width, height),
        }
    }

    /// The geographic rectangle this canvas covers.
    #[must_use]
    pub fn geo(&self) -> GeoRect {
        self.geo
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }
}

impl Debug for Canvas {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Canvas {}x{} @ ({})",
            self.width(),
            self.height(),
            self.geo
        )
    }
}

/// Rasterization capability set consumed by the pyramid engine.
///
/// `merge` must be commutative and associative with respect to the final
/// pixel output: partial canvases arrive in unspecified order from
/// unspecified workers.
pub trait Plotter: Send + Sync + Debug {
    /// Creates an empty canvas covering `geo`.
    fn create_canvas(&self, width: u32, height: u32, geo: GeoRect) -> Canvas {
        Canvas::new(width, height, geo)
    }

    /// Rasterizes one shape onto the canvas, clipped to the canvas extent.
    fn plot(&self, canvas: &mut Canvas, shape: &Geometry);

    /// Folds a partial canvas for the same tile into `target`.
    fn merge(&self, target: &mut Canvas, other: Canvas);

    /// Whether [`Plotter::smooth`] does anything for this plotter.
    fn supports_smooth(&self) -> bool {
        false
    }

    /// Optional preprocessing pass over the shapes of one task.
    fn smooth(&self, shapes: Vec<Geometry>) -> Vec<Geometry> {
        shapes
    }

    /// Encodes the canvas as a PNG image, optionally flipped vertically for
    /// screen-oriented coordinate conventions.
    fn write_image(&self, canvas: &Canvas, out: &mut dyn Write, vflip: bool) -> PlotResult<()> {
        let mut encoded = Cursor::new(Vec::new());
        if vflip {
            image::imageops::flip_vertical(canvas.image())
                .write_to(&mut encoded, ImageFormat::Png)?;
        } else {
            canvas.image().write_to(&mut encoded, ImageFormat::Png)?;
        }
        out.write_all(encoded.get_ref())?;
        Ok(())
    }

    /// Creates a boxed clone for trait object storage.
    fn clone_plotter(&self) -> BoxedPlotter;
}

/// Boxed plotter trait object, one per job.
pub type BoxedPlotter = Box<dyn Plotter>;

impl Clone for BoxedPlotter {
    fn clone(&self) -> Self {
        self.clone_plotter()
    }
}

/// Resolves a plotter by its configured name.
///
/// An unknown name is a fatal configuration error, reported before any work
/// starts.
pub fn plotter_by_name(name: &str) -> PlotResult<BoxedPlotter> {
    match name.to_ascii_lowercase().as_str() {
        "geometric" | "gplot" => Ok(Box::new(GeometricPlotter::default())),
        _ => Err(PlotError::UnknownPlotter(name.to_string())),
    }
}
