//! Affine mapping between a pixel rectangle and a data rectangle.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Bijective map between widget pixels and data coordinates.
///
/// Pixel y grows downward while data y grows upward, so the y axis is
/// inverted by default (the chart convention). Incoming pixel points are
/// clamped into the pixel bounds before inversion, which is what turns an
/// out-of-bounds pointer into the nearest in-range value.
///
/// A collapsed axis (zero-width data or pixel range) degenerates to a
/// constant midpoint map instead of dividing by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxesMapping {
    /// Pixel bounds: x0/y0 is the left/top edge, x1/y1 the right/bottom.
    pub pixel: Rect,
    /// Data range along x: (min, max).
    pub x_bounds: (f64, f64),
    /// Data range along y: (min, max).
    pub y_bounds: (f64, f64),
    /// Whether data y grows upward (screen-inverted). Defaults to true.
    pub y_up: bool,
}

impl AxesMapping {
    /// Create a mapping with the chart convention (data y up).
    pub fn new(pixel: Rect, x_bounds: (f64, f64), y_bounds: (f64, f64)) -> Self {
        Self {
            pixel,
            x_bounds,
            y_bounds,
            y_up: true,
        }
    }

    /// Create a mapping whose data y grows downward, matching screen y.
    pub fn screen_aligned(pixel: Rect, x_bounds: (f64, f64), y_bounds: (f64, f64)) -> Self {
        Self {
            pixel,
            x_bounds,
            y_bounds,
            y_up: false,
        }
    }

    /// Convert a pixel position to data coordinates.
    pub fn pixel_to_data(&self, p: Point) -> Point {
        let px = clamp_range(p.x, self.pixel.x0, self.pixel.x1);
        let py = clamp_range(p.y, self.pixel.y0, self.pixel.y1);

        let x = invert_axis(px, self.pixel.x0, self.pixel.x1, self.x_bounds);
        let y = if self.y_up {
            // Measure from the bottom pixel edge so data y grows upward.
            invert_axis(self.pixel.y1 - (py - self.pixel.y0), self.pixel.y0, self.pixel.y1, self.y_bounds)
        } else {
            invert_axis(py, self.pixel.y0, self.pixel.y1, self.y_bounds)
        };
        Point::new(x, y)
    }

    /// Convert data coordinates to a pixel position.
    pub fn data_to_pixel(&self, d: Point) -> Point {
        let px = project_axis(d.x, self.x_bounds, self.pixel.x0, self.pixel.x1);
        let py = if self.y_up {
            let from_top = project_axis(d.y, self.y_bounds, self.pixel.y0, self.pixel.y1);
            self.pixel.y1 - (from_top - self.pixel.y0)
        } else {
            project_axis(d.y, self.y_bounds, self.pixel.y0, self.pixel.y1)
        };
        Point::new(px, py)
    }
}

fn clamp_range(v: f64, lo: f64, hi: f64) -> f64 {
    if lo <= hi { v.clamp(lo, hi) } else { v.clamp(hi, lo) }
}

/// Map a pixel coordinate into a data range. Degenerate spans collapse to
/// the data midpoint.
fn invert_axis(p: f64, pixel_lo: f64, pixel_hi: f64, data: (f64, f64)) -> f64 {
    let span = pixel_hi - pixel_lo;
    if span == 0.0 || data.1 == data.0 {
        return (data.0 + data.1) / 2.0;
    }
    data.0 + (p - pixel_lo) / span * (data.1 - data.0)
}

/// Map a data coordinate into a pixel range. Degenerate spans collapse to
/// the pixel midpoint.
fn project_axis(d: f64, data: (f64, f64), pixel_lo: f64, pixel_hi: f64) -> f64 {
    let span = data.1 - data.0;
    if span == 0.0 || pixel_hi == pixel_lo {
        return (pixel_lo + pixel_hi) / 2.0;
    }
    pixel_lo + (d - data.0) / span * (pixel_hi - pixel_lo)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_mapping() -> AxesMapping {
        AxesMapping::new(
            Rect::new(10.0, 10.0, 210.0, 110.0),
            (0.0, 100.0),
            (0.0, 50.0),
        )
    }

    #[test]
    fn test_midpoint_maps_to_midpoint() {
        let mapping = chart_mapping();
        let data = mapping.pixel_to_data(Point::new(110.0, 60.0));
        assert!((data.x - 50.0).abs() < f64::EPSILON);
        assert!((data.y - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_y_axis_is_inverted() {
        let mapping = chart_mapping();
        // Top pixel edge is data-y max.
        let top = mapping.pixel_to_data(Point::new(10.0, 10.0));
        assert!((top.y - 50.0).abs() < f64::EPSILON);
        let bottom = mapping.pixel_to_data(Point::new(10.0, 110.0));
        assert!(bottom.y.abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_aligned_y() {
        let mapping =
            AxesMapping::screen_aligned(Rect::new(0.0, 0.0, 100.0, 100.0), (0.0, 1.0), (0.0, 1.0));
        let top = mapping.pixel_to_data(Point::new(0.0, 0.0));
        assert!(top.y.abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_interior_points() {
        let mapping = chart_mapping();
        for &(px, py) in &[(11.0, 11.0), (57.0, 42.0), (110.0, 60.0), (209.0, 109.0)] {
            let p = Point::new(px, py);
            let back = mapping.data_to_pixel(mapping.pixel_to_data(p));
            assert!((back.x - p.x).abs() < 1e-9, "x roundtrip failed at {px}");
            assert!((back.y - p.y).abs() < 1e-9, "y roundtrip failed at {py}");
        }
    }

    #[test]
    fn test_out_of_bounds_pixels_clamp() {
        let mapping = chart_mapping();
        let data = mapping.pixel_to_data(Point::new(-50.0, 500.0));
        assert!(data.x.abs() < f64::EPSILON);
        assert!(data.y.abs() < f64::EPSILON);

        let data = mapping.pixel_to_data(Point::new(1000.0, -1000.0));
        assert!((data.x - 100.0).abs() < f64::EPSILON);
        assert!((data.y - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degenerate_data_range_maps_to_midpoint() {
        let mapping = AxesMapping::new(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            (5.0, 5.0),
            (0.0, 1.0),
        );
        let data = mapping.pixel_to_data(Point::new(30.0, 50.0));
        assert!((data.x - 5.0).abs() < f64::EPSILON);

        let pixel = mapping.data_to_pixel(Point::new(5.0, 0.5));
        assert!((pixel.x - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degenerate_pixel_range_maps_to_midpoint() {
        let mapping = AxesMapping::new(Rect::new(40.0, 0.0, 40.0, 100.0), (0.0, 10.0), (0.0, 1.0));
        let data = mapping.pixel_to_data(Point::new(123.0, 50.0));
        assert!((data.x - 5.0).abs() < f64::EPSILON);
    }
}
