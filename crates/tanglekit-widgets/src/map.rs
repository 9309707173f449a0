//! Pan/zoom tile map for picking geographic coordinates.

use crate::{Instant, Widget, WidgetError};
use kurbo::{Point, Rect};
use std::rc::Rc;
use tanglekit_core::debounce::Debouncer;
use tanglekit_core::mercator::{
    self, TILE_SIZE, TilePlacement, ZoomAnimator, clamp_lat, wrap_lon,
};
use tanglekit_core::model::{FieldBinding, ModelHandle, Value};
use tanglekit_core::pointer::{ClickTracker, MouseButton, PointerEvent};
use tanglekit_core::tiles::{TileCache, TileKey, TileSource};

/// Wheel zoom sensitivity per notch.
const WHEEL_ZOOM_STEP: f64 = 0.1;

/// Default viewport before the host reports a size.
const DEFAULT_VIEWPORT: (f64, f64) = (400.0, 300.0);

/// One tile ready to be painted.
#[derive(Debug, Clone)]
pub struct TileDraw {
    pub key: TileKey,
    /// Destination rectangle in viewport pixels.
    pub dst: Rect,
    /// Encoded image bytes; `None` draws a placeholder.
    pub bytes: Option<Rc<Vec<u8>>>,
}

/// Snapshot of everything the host needs to paint one frame.
#[derive(Debug, Clone)]
pub struct MapScene {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
    pub tiles: Vec<TileDraw>,
    pub show_marker: bool,
    pub marker_color: String,
}

/// Interactive tile map centered on a picked coordinate.
///
/// Dragging pans the center; the wheel zooms instantly in tenth-level
/// increments; a double-click zooms one whole level with an animated lerp
/// (shift inverts the direction). The synced fields are `lat`, `lon`,
/// `zoom`, and the derived `bbox`. Pan rebases from the previous pointer
/// position on every move, matching how a grabbed map follows the hand.
pub struct MapPicker {
    model: ModelHandle,
    lat: f64,
    lon: f64,
    zoom: ZoomAnimator,
    viewport: (f64, f64),
    cache: TileCache,
    dragging: bool,
    last_pointer: Point,
    clicks: ClickTracker,
    commit: Debouncer,
    bind_lat: FieldBinding,
    bind_lon: FieldBinding,
    bind_zoom: FieldBinding,
    bind_show_marker: FieldBinding,
    bind_marker_color: FieldBinding,
    show_marker: bool,
    marker_color: String,
    status: Option<String>,
    dirty: bool,
}

impl MapPicker {
    /// Mount a map picker on a host model. Fails fast when the host never
    /// initialized the coordinate fields.
    pub fn mount(model: ModelHandle, source: Rc<dyn TileSource>) -> Result<Self, WidgetError> {
        model.ensure_fields(&["lat", "lon", "zoom"])?;
        let lat = clamp_lat(model.f64("lat")?);
        let lon = wrap_lon(model.f64("lon")?);
        let zoom = ZoomAnimator::new(model.f64("zoom")?);

        let bind_lat = model.bind("lat");
        let bind_lon = model.bind("lon");
        let bind_zoom = model.bind("zoom");
        let bind_show_marker = model.bind("show_marker");
        let bind_marker_color = model.bind("marker_color");
        log::debug!("map picker mounted at ({lat}, {lon}) z{}", zoom.zoom());
        Ok(Self {
            show_marker: model.bool_or("show_marker", false),
            marker_color: model.string_or("marker_color", "#3b82f6"),
            model,
            lat,
            lon,
            zoom,
            viewport: DEFAULT_VIEWPORT,
            cache: TileCache::new(source),
            dragging: false,
            last_pointer: Point::ZERO,
            clicks: ClickTracker::new(),
            commit: Debouncer::default(),
            bind_lat,
            bind_lon,
            bind_zoom,
            bind_show_marker,
            bind_marker_color,
            status: None,
            dirty: true,
        })
    }

    /// Current center.
    pub fn center(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// Current (possibly mid-animation) zoom.
    pub fn zoom(&self) -> f64 {
        self.zoom.zoom()
    }

    /// Whether a pan gesture is active.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Viewport bounds as `[west, south, east, north]`.
    pub fn bbox(&self) -> [f64; 4] {
        let (width, height) = self.viewport;
        mercator::bbox(self.lat, self.lon, self.zoom.zoom(), width, height)
    }

    /// The host reports a new viewport size; the bbox changes with it.
    pub fn resize(&mut self, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.viewport = (width, height);
        self.dirty = true;
        self.stage_view();
        self.model.save_changes();
        self.commit.cancel();
    }

    /// Build the tile set for the current frame, initiating fetches for
    /// tiles seen for the first time.
    pub fn scene(&mut self) -> MapScene {
        let (width, height) = self.viewport;
        let placements: Vec<TilePlacement> =
            mercator::visible_tiles(self.lat, self.lon, self.zoom.zoom(), width, height);
        let tiles = placements
            .into_iter()
            .map(|placement| {
                self.cache.request(placement.key);
                TileDraw {
                    key: placement.key,
                    dst: placement.dst,
                    bytes: self.cache.bytes(placement.key),
                }
            })
            .collect();
        MapScene {
            lat: self.lat,
            lon: self.lon,
            zoom: self.zoom.zoom(),
            tiles,
            show_marker: self.show_marker,
            marker_color: self.marker_color.clone(),
        }
    }

    /// Resolve a tile fetch started via [`MapPicker::scene`].
    pub fn complete_tile(
        &mut self,
        key: TileKey,
        result: Result<Vec<u8>, tanglekit_core::tiles::TileError>,
    ) {
        self.cache.complete(key, result);
        self.dirty = true;
    }

    /// Forget failed tiles so the next frame fetches them again.
    pub fn retry_failed_tiles(&mut self) {
        self.cache.retry_failed();
        self.dirty = true;
    }

    /// Move the center so the map follows a pointer delta.
    fn pan(&mut self, delta_x: f64, delta_y: f64) {
        let zoom = self.zoom.zoom();
        let tile_x = mercator::lon_to_tile_x(self.lon, zoom) - delta_x / TILE_SIZE;
        let tile_y = mercator::lat_to_tile_y(self.lat, zoom) - delta_y / TILE_SIZE;
        self.lon = wrap_lon(mercator::tile_x_to_lon(tile_x, zoom));
        self.lat = clamp_lat(mercator::tile_y_to_lat(tile_y, zoom));
    }

    /// Stage the full synced view: center, zoom, derived bbox.
    fn stage_view(&self) {
        self.model.set("lat", Value::from(self.lat));
        self.model.set("lon", Value::from(self.lon));
        self.model.set("zoom", Value::from(self.zoom.zoom()));
        self.model.set("bbox", Value::from(self.bbox().to_vec()));
    }
}

impl Widget for MapPicker {
    fn pointer(&mut self, event: PointerEvent, now: Instant) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                modifiers,
            } => {
                if self.clicks.click(position, now) {
                    // Double-click: animated whole-level zoom.
                    let direction = if modifiers.shift { -1.0 } else { 1.0 };
                    self.zoom.animate_to(self.zoom.target() + direction);
                    self.dragging = false;
                    self.stage_view();
                    self.commit.schedule(now);
                    self.dirty = true;
                } else {
                    self.dragging = true;
                    self.last_pointer = position;
                }
            }
            PointerEvent::Move { position } => {
                if self.dragging {
                    let delta = position - self.last_pointer;
                    self.pan(delta.x, delta.y);
                    self.last_pointer = position;
                    self.dirty = true;
                    self.stage_view();
                    self.commit.schedule(now);
                }
            }
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            } => {
                if self.dragging {
                    self.dragging = false;
                    self.stage_view();
                    self.model.save_changes();
                    self.commit.cancel();
                }
            }
            PointerEvent::Scroll { delta, .. } => {
                // Wheel zoom is instantaneous.
                let direction = if delta.y < 0.0 { 1.0 } else { -1.0 };
                self.zoom
                    .jump_to(self.zoom.target() + direction * WHEEL_ZOOM_STEP);
                self.dirty = true;
                self.stage_view();
                self.commit.schedule(now);
            }
            _ => {}
        }
    }

    fn tick(&mut self, now: Instant) {
        if self.zoom.step() {
            self.dirty = true;
            self.stage_view();
            self.commit.schedule(now);
        }
        if self.commit.fire_due(now) {
            self.model.save_changes();
        }

        if !self.dragging {
            if let Some(v) = self.bind_lat.take().as_ref().and_then(Value::as_f64) {
                self.lat = clamp_lat(v);
                self.dirty = true;
            }
            if let Some(v) = self.bind_lon.take().as_ref().and_then(Value::as_f64) {
                self.lon = wrap_lon(v);
                self.dirty = true;
            }
            if let Some(v) = self.bind_zoom.take().as_ref().and_then(Value::as_f64) {
                self.zoom.jump_to(v);
                self.dirty = true;
            }
        }
        if let Some(v) = self.bind_show_marker.take().as_ref().and_then(Value::as_bool) {
            self.show_marker = v;
            self.dirty = true;
        }
        if let Some(v) = self.bind_marker_color.take() {
            if let Some(color) = v.as_str() {
                self.marker_color = color.to_string();
                self.dirty = true;
            }
        }

        self.status = match self.cache.failed_count() {
            0 => None,
            n => Some(format!("{n} map tiles failed to load")),
        };
    }

    fn needs_redraw(&self) -> bool {
        self.dirty
    }

    fn clear_redraw(&mut self) {
        self.dirty = false;
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tanglekit_core::model::{MemoryModel, Model};
    use tanglekit_core::pointer::Modifiers;
    use tanglekit_core::tiles::{NullTileSource, TileError};

    fn host_model() -> Rc<MemoryModel> {
        let model = Rc::new(MemoryModel::new());
        model.seed("lat", json!(52.52));
        model.seed("lon", json!(13.405));
        model.seed("zoom", json!(10.0));
        model
    }

    fn mounted(model: &Rc<MemoryModel>) -> MapPicker {
        let handle = ModelHandle::attach(Rc::clone(model) as Rc<dyn Model>);
        MapPicker::mount(handle, Rc::new(NullTileSource)).unwrap()
    }

    fn double_click(map: &mut MapPicker, position: Point, shift: bool, now: Instant) {
        let modifiers = Modifiers {
            shift,
            ..Modifiers::default()
        };
        for offset in [0, 100] {
            map.pointer(
                PointerEvent::Down {
                    position,
                    button: MouseButton::Left,
                    modifiers,
                },
                now + Duration::from_millis(offset),
            );
            map.pointer(PointerEvent::left_up(position), now + Duration::from_millis(offset));
        }
    }

    #[test]
    fn test_mount_requires_coordinates() {
        let model = Rc::new(MemoryModel::new());
        model.seed("lat", json!(0.0));
        let handle = ModelHandle::attach(model as Rc<dyn Model>);
        assert!(MapPicker::mount(handle, Rc::new(NullTileSource)).is_err());
    }

    #[test]
    fn test_pan_moves_center() {
        let model = host_model();
        let mut map = mounted(&model);
        let now = Instant::now();
        let (lat0, lon0) = map.center();

        map.pointer(PointerEvent::left_down(Point::new(200.0, 150.0)), now);
        map.pointer(
            PointerEvent::Move {
                position: Point::new(150.0, 180.0),
            },
            now,
        );

        let (lat, lon) = map.center();
        // Dragging the map left moves the center east; dragging down moves it north.
        assert!(lon > lon0);
        assert!(lat > lat0);
    }

    #[test]
    fn test_pan_clamps_latitude() {
        let model = host_model();
        model.seed("lat", json!(84.9));
        model.seed("zoom", json!(2.0));
        let mut map = mounted(&model);
        let now = Instant::now();

        map.pointer(PointerEvent::left_down(Point::new(200.0, 150.0)), now);
        map.pointer(
            PointerEvent::Move {
                position: Point::new(200.0, 5000.0),
            },
            now,
        );

        assert!(map.center().0 <= mercator::LAT_LIMIT);
    }

    #[test]
    fn test_release_commits_view() {
        let model = host_model();
        let mut map = mounted(&model);
        let now = Instant::now();

        map.pointer(PointerEvent::left_down(Point::new(200.0, 150.0)), now);
        map.pointer(
            PointerEvent::Move {
                position: Point::new(180.0, 150.0),
            },
            now,
        );
        map.pointer(PointerEvent::left_up(Point::new(180.0, 150.0)), now);

        let committed_lon = model.get("lon").unwrap().as_f64().unwrap();
        assert!((committed_lon - map.center().1).abs() < 1e-12);
        let bbox = model.get("bbox").unwrap();
        assert_eq!(bbox.as_array().unwrap().len(), 4);

        // The abandoned debounce timer must not fire again.
        map.tick(now + Duration::from_secs(1));
    }

    #[test]
    fn test_wheel_zoom_is_instant() {
        let model = host_model();
        let mut map = mounted(&model);
        let now = Instant::now();

        map.pointer(
            PointerEvent::Scroll {
                position: Point::new(200.0, 150.0),
                delta: kurbo::Vec2::new(0.0, -120.0),
            },
            now,
        );
        assert!((map.zoom() - 10.1).abs() < 1e-12);

        map.pointer(
            PointerEvent::Scroll {
                position: Point::new(200.0, 150.0),
                delta: kurbo::Vec2::new(0.0, 120.0),
            },
            now,
        );
        assert!((map.zoom() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_double_click_zoom_animates() {
        let model = host_model();
        let mut map = mounted(&model);
        let now = Instant::now();

        double_click(&mut map, Point::new(200.0, 150.0), false, now);
        // Target moved a whole level; the zoom itself has not jumped.
        assert!((map.zoom() - 10.0).abs() < 1e-12);

        // One frame covers a tenth of the gap: 10 -> 10.1.
        map.tick(now + Duration::from_millis(16));
        assert!((map.zoom() - 10.1).abs() < 1e-12);
    }

    #[test]
    fn test_shift_double_click_zooms_out() {
        let model = host_model();
        let mut map = mounted(&model);
        let now = Instant::now();

        double_click(&mut map, Point::new(200.0, 150.0), true, now);
        let mut frames = 0;
        loop {
            map.tick(now + Duration::from_millis(16 * frames));
            frames += 1;
            if !map.zoom.is_animating() {
                break;
            }
            assert!(frames < 1000, "zoom failed to converge");
        }
        assert!((map.zoom() - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_animation_commits_final_value() {
        let model = host_model();
        let mut map = mounted(&model);
        let now = Instant::now();

        double_click(&mut map, Point::new(200.0, 150.0), false, now);
        let mut t = now;
        for _ in 0..200 {
            t += Duration::from_millis(16);
            map.tick(t);
        }
        // Let the trailing debounce fire.
        map.tick(t + Duration::from_millis(150));

        let committed = model.get("zoom").unwrap().as_f64().unwrap();
        assert!((committed - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_host_push_ignored_while_dragging() {
        let model = host_model();
        let mut map = mounted(&model);
        let host = ModelHandle::attach(Rc::clone(&model) as Rc<dyn Model>);
        let now = Instant::now();

        map.pointer(PointerEvent::left_down(Point::new(200.0, 150.0)), now);
        host.set("lat", json!(0.0));
        host.save_changes();
        map.tick(now);
        assert!((map.center().0 - 52.52).abs() < f64::EPSILON);

        // After release, the pending push has been superseded by the drag's
        // own committed state, but a fresh push applies.
        map.pointer(PointerEvent::left_up(Point::new(200.0, 150.0)), now);
        host.set("lat", json!(10.0));
        host.save_changes();
        map.tick(now);
        assert!((map.center().0 - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_marker_bindings() {
        let model = host_model();
        let mut map = mounted(&model);
        let host = ModelHandle::attach(Rc::clone(&model) as Rc<dyn Model>);
        let now = Instant::now();

        host.set("show_marker", json!(true));
        host.set("marker_color", json!("#ff0000"));
        host.save_changes();
        map.tick(now);

        let scene = map.scene();
        assert!(scene.show_marker);
        assert_eq!(scene.marker_color, "#ff0000");
    }

    #[test]
    fn test_scene_requests_tiles_and_draws_ready_ones() {
        let model = host_model();
        let mut map = mounted(&model);

        let scene = map.scene();
        assert!(!scene.tiles.is_empty());
        assert!(scene.tiles.iter().all(|t| t.bytes.is_none()));

        let key = scene.tiles[0].key;
        map.complete_tile(key, Ok(vec![0xff]));
        let scene = map.scene();
        let drawn = scene.tiles.iter().find(|t| t.key == key).unwrap();
        assert_eq!(drawn.bytes.as_ref().unwrap().as_slice(), &[0xff]);
    }

    #[test]
    fn test_failed_tiles_surface_as_status() {
        let model = host_model();
        let mut map = mounted(&model);
        let now = Instant::now();

        let scene = map.scene();
        let key = scene.tiles[0].key;
        map.complete_tile(key, Err(TileError::Fetch("timeout".into())));
        map.tick(now);
        assert!(map.status().unwrap().contains("1 map tiles failed"));

        map.retry_failed_tiles();
        map.tick(now);
        assert!(map.status().is_none());
    }

    #[test]
    fn test_resize_updates_bbox_and_commits() {
        let model = host_model();
        let mut map = mounted(&model);

        map.resize(800.0, 600.0);
        let [west, south, east, north] = map.bbox();
        assert!(west < east && south < north);

        let committed = model.get("bbox").unwrap();
        assert_eq!(committed.as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_drop_unsubscribes_from_model() {
        let model = host_model();
        let map = mounted(&model);
        assert_eq!(model.subscription_count(), 5);
        drop(map);
        assert_eq!(model.subscription_count(), 0);
    }
}
