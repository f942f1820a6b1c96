//! Simple geometric rendering: points as single pixels, boxes as outlines.

use image::Rgba;

use crate::geometry::Geometry;
use crate::plotter::{BoxedPlotter, Canvas, Plotter};

/// Default plotter: draws each shape's geometry in a fixed color.
///
/// Compositing uses a per-channel maximum, which is commutative,
/// associative, and idempotent, so merge order can never change the final
/// pixels.
#[derive(Debug, Clone)]
pub struct GeometricPlotter {
    color: Rgba<u8>,
}

impl Default for GeometricPlotter {
    fn default() -> Self {
        GeometricPlotter {
            color: Rgba([16, 32, 160, 255]),
        }
    }
}

impl GeometricPlotter {
    #[must_use]
    pub fn with_color(color: Rgba<u8>) -> Self {
        GeometricPlotter { color }
    }

    fn put(&self, canvas: &mut Canvas, x: i64, y: i64) {
        if x < 0 || y < 0 || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height()) {
            return;
        }
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let px = canvas.image_mut().get_pixel_mut(x as u32, y as u32);
        for (channel, new) in px.0.iter_mut().zip(self.color.0) {
            *channel = (*channel).max(new);
        }
    }

    fn hline(&self, canvas: &mut Canvas, x1: i64, x2: i64, y: i64) {
        let lo = x1.max(0);
        let hi = x2.min(i64::from(canvas.width()) - 1);
        for x in lo..=hi {
            self.put(canvas, x, y);
        }
    }

    fn vline(&self, canvas: &mut Canvas, x: i64, y1: i64, y2: i64) {
        let lo = y1.max(0);
        let hi = y2.min(i64::from(canvas.height()) - 1);
        for y in lo..=hi {
            self.put(canvas, x, y);
        }
    }
}

/// Geographic x to pixel column within the canvas extent.
#[expect(clippy::cast_possible_truncation)]
fn px_x(canvas: &Canvas, gx: f64) -> i64 {
    let geo = canvas.geo();
    ((gx - geo.x1) / geo.width() * f64::from(canvas.width())).floor() as i64
}

#[expect(clippy::cast_possible_truncation)]
fn px_y(canvas: &Canvas, gy: f64) -> i64 {
    let geo = canvas.geo();
    ((gy - geo.y1) / geo.height() * f64::from(canvas.height())).floor() as i64
}

impl Plotter for GeometricPlotter {
    fn plot(&self, canvas: &mut Canvas, shape: &Geometry) {
        match *shape {
            Geometry::Point { x, y } => {
                self.put(canvas, px_x(canvas, x), px_y(canvas, y));
            }
            Geometry::Rect(r) => {
                let (x1, x2) = (px_x(canvas, r.x1), px_x(canvas, r.x2));
                let (y1, y2) = (px_y(canvas, r.y1), px_y(canvas, r.y2));
                self.hline(canvas, x1, x2, y1);
                self.hline(canvas, x1, x2, y2);
                self.vline(canvas, x1, y1, y2);
                self.vline(canvas, x2, y1, y2);
            }
        }
    }

    fn merge(&self, target: &mut Canvas, other: Canvas) {
        debug_assert_eq!(target.geo(), other.geo());
        debug_assert_eq!(target.width(), other.width());
        debug_assert_eq!(target.height(), other.height());
        for (dst, src) in target
            .image_mut()
            .pixels_mut()
            .zip(other.image().pixels())
        {
            for (channel, new) in dst.0.iter_mut().zip(src.0) {
                *channel = (*channel).max(new);
            }
        }
    }

    fn clone_plotter(&self) -> BoxedPlotter {
        Box::new(self.clone())
    }
}
