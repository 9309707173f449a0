//! Web-Mercator tile math with continuous zoom.
//!
//! The standard slippy-map transform: longitude/latitude to tile coordinates
//! at a given zoom. Zoom is fractional; tiles are addressed at the integer
//! zoom below and drawn scaled by `2^fraction`.

use crate::tiles::TileKey;
use kurbo::Rect;
use std::f64::consts::PI;

/// Tile edge length in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Zoom range served by the tile pyramid.
pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 19.0;

/// Latitude limit of the projection.
pub const LAT_LIMIT: f64 = 85.0;

/// Longitude to tile-x at a (fractional) zoom.
pub fn lon_to_tile_x(lon: f64, zoom: f64) -> f64 {
    (lon + 180.0) / 360.0 * 2f64.powf(zoom)
}

/// Latitude to tile-y at a (fractional) zoom.
pub fn lat_to_tile_y(lat: f64, zoom: f64) -> f64 {
    let rad = lat.to_radians();
    (1.0 - (rad.tan() + 1.0 / rad.cos()).ln() / PI) / 2.0 * 2f64.powf(zoom)
}

/// Tile-x back to longitude.
pub fn tile_x_to_lon(x: f64, zoom: f64) -> f64 {
    x / 2f64.powf(zoom) * 360.0 - 180.0
}

/// Tile-y back to latitude.
pub fn tile_y_to_lat(y: f64, zoom: f64) -> f64 {
    let n = PI - 2.0 * PI * y / 2f64.powf(zoom);
    (0.5 * (n.exp() - (-n).exp())).atan().to_degrees()
}

/// Clamp a latitude into the projectable range.
pub fn clamp_lat(lat: f64) -> f64 {
    lat.clamp(-LAT_LIMIT, LAT_LIMIT)
}

/// Wrap a longitude into [-180, 180).
pub fn wrap_lon(lon: f64) -> f64 {
    ((lon + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
}

/// Continuous zoom with a per-frame lerp toward a target.
///
/// Wheel zoom jumps instantly; double-click zoom animates. One frame moves
/// a tenth of the remaining distance, snapping once the gap drops under the
/// threshold.
#[derive(Debug, Clone)]
pub struct ZoomAnimator {
    zoom: f64,
    target: f64,
}

/// Fraction of the remaining zoom gap covered per frame.
pub const ZOOM_LERP: f64 = 0.1;
const ZOOM_SNAP: f64 = 0.001;

impl ZoomAnimator {
    /// Create an animator at rest at `zoom`.
    pub fn new(zoom: f64) -> Self {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Self { zoom, target: zoom }
    }

    /// Current (possibly mid-animation) zoom.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Animation target.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Set the target; subsequent [`ZoomAnimator::step`] calls animate to it.
    pub fn animate_to(&mut self, target: f64) {
        self.target = target.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Jump both zoom and target, ending any animation.
    pub fn jump_to(&mut self, zoom: f64) {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.zoom = zoom;
        self.target = zoom;
    }

    /// Advance one frame. Returns true when the zoom moved, including the
    /// final snap onto the target.
    pub fn step(&mut self) -> bool {
        let diff = self.target - self.zoom;
        if diff == 0.0 {
            return false;
        }
        if diff.abs() > ZOOM_SNAP {
            self.zoom += diff * ZOOM_LERP;
        } else {
            self.zoom = self.target;
        }
        true
    }

    /// Whether a step would still move the zoom.
    pub fn is_animating(&self) -> bool {
        self.target != self.zoom
    }
}

/// One tile to draw: its key at integer zoom and its destination rectangle
/// in viewport pixels, already scaled for the fractional zoom part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub key: TileKey,
    pub dst: Rect,
}

/// Tiles covering a viewport centered on `(lat, lon)` at a continuous zoom.
///
/// X wraps around the antimeridian; rows outside the pyramid are skipped.
pub fn visible_tiles(lat: f64, lon: f64, zoom: f64, width: f64, height: f64) -> Vec<TilePlacement> {
    if width <= 0.0 || height <= 0.0 {
        return Vec::new();
    }

    let int_zoom = zoom.floor();
    let scale = 2f64.powf(zoom - int_zoom);
    let displayed = TILE_SIZE * scale;
    let max_tiles = 2f64.powf(int_zoom) as i64;

    let center_px = lon_to_tile_x(lon, int_zoom) * displayed;
    let center_py = lat_to_tile_y(lat, int_zoom) * displayed;
    let left = center_px - width / 2.0;
    let top = center_py - height / 2.0;

    let start_col = (left / displayed).floor() as i64;
    let end_col = ((left + width) / displayed).floor() as i64 + 1;
    let start_row = (top / displayed).floor() as i64;
    let end_row = ((top + height) / displayed).floor() as i64 + 1;

    let mut placements = Vec::new();
    for x in start_col..end_col {
        for y in start_row..end_row {
            if y < 0 || y >= max_tiles {
                continue;
            }
            let wrapped_x = ((x % max_tiles) + max_tiles) % max_tiles;
            let dst_x = x as f64 * displayed - left;
            let dst_y = y as f64 * displayed - top;
            placements.push(TilePlacement {
                key: TileKey {
                    z: int_zoom as u8,
                    x: wrapped_x as u32,
                    y: y as u32,
                },
                dst: Rect::new(dst_x, dst_y, dst_x + displayed, dst_y + displayed),
            });
        }
    }
    placements
}

/// Geographic bounds of a viewport: `[west, south, east, north]`.
pub fn bbox(lat: f64, lon: f64, zoom: f64, width: f64, height: f64) -> [f64; 4] {
    let center_x = lon_to_tile_x(lon, zoom);
    let center_y = lat_to_tile_y(lat, zoom);
    let tiles_per_pixel = 1.0 / TILE_SIZE;

    let west_tile = center_x - width / 2.0 * tiles_per_pixel;
    let east_tile = center_x + width / 2.0 * tiles_per_pixel;
    let north_tile = center_y - height / 2.0 * tiles_per_pixel;
    let south_tile = center_y + height / 2.0 * tiles_per_pixel;

    [
        tile_x_to_lon(west_tile, zoom),
        tile_y_to_lat(south_tile, zoom),
        tile_x_to_lon(east_tile, zoom),
        tile_y_to_lat(north_tile, zoom),
    ]
}
