//! Input shapes and their text representation.
//!
//! The engine never looks inside a shape; it only asks for the bounding
//! rectangle and hands the shape to the configured plotter.

use std::io::BufRead;

use giza_tile_utils::GeoRect;
use tracing::warn;

/// A geometric object to be rendered into the pyramid.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A single position.
    Point { x: f64, y: f64 },
    /// An axis-aligned box.
    Rect(GeoRect),
}

impl Geometry {
    /// Minimum bounding rectangle, or `None` for empty geometry.
    ///
    /// Shapes without an MBR are skipped by the engine, silently.
    #[must_use]
    pub fn mbr(&self) -> Option<GeoRect> {
        match *self {
            Geometry::Point { x, y } => {
                (x.is_finite() && y.is_finite()).then(|| GeoRect::new(x, y, x, y))
            }
            Geometry::Rect(r) => Some(r),
        }
    }
}

/// Parses one line of input: `x,y` for a point, `x1,y1,x2,y2` for a box
/// (corners in any order). Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<Geometry>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let nums: Result<Vec<f64>, _> = line
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}")))
        .collect();
    let nums = nums.map_err(|e| format!("bad coordinate {e}"))?;
    match nums.as_slice() {
        &[x, y] => Ok(Some(Geometry::Point { x, y })),
        &[x1, y1, x2, y2] => Ok(Some(Geometry::Rect(GeoRect::new(
            x1.min(x2),
            y1.min(y2),
            x1.max(x2),
            y1.max(y2),
        )))),
        _ => Err(format!("expected 2 or 4 coordinates, got {}", nums.len())),
    }
}

/// Reads geometries from line-oriented input.
///
/// Malformed lines are skipped with a warning; only I/O failures abort.
pub fn read_geometries(reader: impl BufRead) -> std::io::Result<Vec<Geometry>> {
    let mut shapes = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        match parse_line(&line?) {
            Ok(Some(shape)) => shapes.push(shape),
            Ok(None) => {}
            Err(e) => warn!("skipping line {}: {e}", idx + 1),
        }
    }
    Ok(shapes)
}

/// Splits shapes into at most `parts` contiguous chunks of similar size,
/// the local stand-in for the execution engine's input splits.
#[must_use]
pub fn make_partitions(shapes: Vec<Geometry>, parts: usize) -> Vec<Vec<Geometry>> {
    let parts = parts.max(1);
    if shapes.is_empty() {
        return Vec::new();
    }
    let chunk = shapes.len().div_ceil(parts);
    let mut partitions = Vec::with_capacity(parts);
    let mut rest = shapes;
    while rest.len() > chunk {
        let tail = rest.split_off(chunk);
        partitions.push(rest);
        rest = tail;
    }
    partitions.push(rest);
    partitions
}
