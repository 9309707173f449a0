//! Pointer events for unified mouse/touch handling.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Pointer event type.
///
/// Positions are in widget-local pixels. Hosts must deliver Move and Up at
/// the document level while a button is held, so a drag survives the pointer
/// leaving the widget's box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        modifiers: Modifiers,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    Scroll {
        position: Point,
        delta: Vec2,
    },
}

impl PointerEvent {
    /// Convenience constructor for an unmodified left-button press.
    pub fn left_down(position: Point) -> Self {
        Self::Down {
            position,
            button: MouseButton::Left,
            modifiers: Modifiers::default(),
        }
    }

    /// Convenience constructor for a left-button release.
    pub fn left_up(position: Point) -> Self {
        Self::Up {
            position,
            button: MouseButton::Left,
        }
    }
}

/// Double-click detection constants.
const DOUBLE_CLICK_TIME_MS: u128 = 500;
const DOUBLE_CLICK_DISTANCE: f64 = 5.0;

/// Detects double-clicks from a stream of button presses.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    last_click: Option<(Instant, Point)>,
}

impl ClickTracker {
    /// Create a new tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press; returns true when it completes a double-click.
    ///
    /// A detected double-click resets the tracker so a triple-click is not
    /// reported as a second double-click.
    pub fn click(&mut self, position: Point, now: Instant) -> bool {
        if let Some((last_time, last_pos)) = self.last_click {
            let elapsed = now.duration_since(last_time).as_millis();
            let distance = ((position.x - last_pos.x).powi(2)
                + (position.y - last_pos.y).powi(2))
            .sqrt();
            if elapsed < DOUBLE_CLICK_TIME_MS && distance < DOUBLE_CLICK_DISTANCE {
                self.last_click = None;
                return true;
            }
        }
        self.last_click = Some((now, position));
        false
    }
}
