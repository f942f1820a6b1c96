#![doc = include_str!("../README.md")]
#![warn(missing_debug_implementations)]

mod error;
pub mod geometry;
pub mod plotter;
pub mod pyramid;

pub use error::{PlotError, PlotResult};
