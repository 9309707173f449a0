//! Draggable 2-D puck over a chart image.

use crate::{Instant, Widget, WidgetError};
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Point, Rect};
use std::rc::Rc;
use tanglekit_core::debounce::Debouncer;
use tanglekit_core::drag::{DragController, DragUpdate};
use tanglekit_core::model::{FieldBinding, ModelHandle, Value};
use tanglekit_core::pointer::{MouseButton, PointerEvent};
use tanglekit_core::viewport::AxesMapping;

/// Draggable marker tracked in data coordinates.
///
/// The press warps the puck to the pointer; moves follow it, with positions
/// outside the axes rectangle clamped onto its edge. The background is a
/// base64-encoded chart image supplied by the host; a malformed payload
/// becomes a status message rather than an error, so the puck keeps working
/// over a blank background.
pub struct ChartPuck {
    model: ModelHandle,
    mapping: AxesMapping,
    x: f64,
    y: f64,
    puck_radius: f64,
    puck_color: String,
    image: Option<Rc<Vec<u8>>>,
    drag: DragController,
    commit: Debouncer,
    bind_x: FieldBinding,
    bind_y: FieldBinding,
    bind_radius: FieldBinding,
    bind_color: FieldBinding,
    bind_chart: FieldBinding,
    status: Option<String>,
    dirty: bool,
}

impl ChartPuck {
    /// Mount a puck on a host model. Fails fast when the host never
    /// initialized the position fields.
    pub fn mount(model: ModelHandle) -> Result<Self, WidgetError> {
        model.ensure_fields(&["x", "y"])?;
        let x_bounds = model.pair_or("x_bounds", (0.0, 1.0));
        let y_bounds = model.pair_or("y_bounds", (0.0, 1.0));
        let [left, top, right, bottom] = model.quad_or("axes_pixel_bounds", [0.0, 0.0, 100.0, 100.0]);
        let mapping = AxesMapping::new(Rect::new(left, top, right, bottom), x_bounds, y_bounds);

        let mut status = None;
        let image = match decode_chart(&model.string_or("chart_base64", "")) {
            Ok(image) => image,
            Err(message) => {
                status = Some(message);
                None
            }
        };

        let x = model.f64("x")?;
        let y = model.f64("y")?;
        let bind_x = model.bind("x");
        let bind_y = model.bind("y");
        let bind_radius = model.bind("puck_radius");
        let bind_color = model.bind("puck_color");
        let bind_chart = model.bind("chart_base64");
        log::debug!("chart puck mounted at ({x}, {y})");
        Ok(Self {
            puck_radius: model.f64_or("puck_radius", 10.0),
            puck_color: model.string_or("puck_color", "#e63946"),
            drag: DragController::absolute(mapping.clone()),
            model,
            mapping,
            x,
            y,
            image,
            commit: Debouncer::default(),
            bind_x,
            bind_y,
            bind_radius,
            bind_color,
            bind_chart,
            status,
            dirty: true,
        })
    }

    /// Puck position in data coordinates.
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Puck position in widget pixels.
    pub fn puck_pixel(&self) -> Point {
        self.mapping.data_to_pixel(Point::new(self.x, self.y))
    }

    /// Puck radius in pixels.
    pub fn puck_radius(&self) -> f64 {
        self.puck_radius
    }

    /// Puck color as a CSS color string.
    pub fn puck_color(&self) -> &str {
        &self.puck_color
    }

    /// Decoded background image bytes, if any.
    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref().map(Vec::as_slice)
    }

    /// Whether a drag gesture is active.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    fn apply(&mut self, update: DragUpdate, now: Instant) {
        self.x = update.x;
        self.y = update.y.unwrap_or(self.y);
        self.dirty = true;
        self.model.set("x", Value::from(self.x));
        self.model.set("y", Value::from(self.y));
        self.commit.schedule(now);
    }

    fn finish_drag(&mut self, update: DragUpdate) {
        self.x = update.x;
        self.y = update.y.unwrap_or(self.y);
        self.dirty = true;
        self.model.set("x", Value::from(self.x));
        self.model.set("y", Value::from(self.y));
        self.model.save_changes();
        self.commit.cancel();
    }

    fn set_chart(&mut self, payload: &str) {
        match decode_chart(payload) {
            Ok(image) => {
                self.image = image;
                self.status = None;
            }
            Err(message) => {
                self.image = None;
                self.status = Some(message);
            }
        }
        self.dirty = true;
    }
}

impl Widget for ChartPuck {
    fn pointer(&mut self, event: PointerEvent, now: Instant) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                ..
            } => {
                let current = DragUpdate::xy(self.x, self.y);
                if let Some(update) = self.drag.pointer_down(position, current) {
                    self.apply(update, now);
                }
            }
            PointerEvent::Move { position } => {
                if let Some(update) = self.drag.pointer_move(position) {
                    self.apply(update, now);
                }
            }
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => {
                if let Some(update) = self.drag.pointer_up(position) {
                    self.finish_drag(update);
                }
            }
            _ => {}
        }
    }

    fn tick(&mut self, now: Instant) {
        if self.commit.fire_due(now) {
            self.model.save_changes();
        }
        if !self.drag.is_dragging() {
            if let Some(v) = self.bind_x.take().as_ref().and_then(Value::as_f64) {
                self.x = v;
                self.dirty = true;
            }
            if let Some(v) = self.bind_y.take().as_ref().and_then(Value::as_f64) {
                self.y = v;
                self.dirty = true;
            }
        }
        if let Some(v) = self.bind_radius.take().as_ref().and_then(Value::as_f64) {
            self.puck_radius = v;
            self.dirty = true;
        }
        if let Some(v) = self.bind_color.take() {
            if let Some(color) = v.as_str() {
                self.puck_color = color.to_string();
                self.dirty = true;
            }
        }
        if let Some(v) = self.bind_chart.take() {
            let payload = v.as_str().unwrap_or_default().to_string();
            self.set_chart(&payload);
        }
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

/// Decode a `data:image/...;base64,` payload (or bare base64) into bytes.
/// An empty payload is simply no image.
fn decode_chart(payload: &str) -> Result<Option<Rc<Vec<u8>>>, String> {
    if payload.is_empty() {
        return Ok(None);
    }
    let encoded = match payload.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => payload,
    };
    STANDARD
        .decode(encoded)
        .map(|bytes| Some(Rc::new(bytes)))
        .map_err(|err| format!("chart image is not valid base64: {err}"))
}
