//! Drag controller: pointer gestures to bounded, steppable data values.
//!
//! Pure numeric state machine with no presentation calls. Every intermediate
//! move recomputes the candidate value from the session's start pixel and
//! start value, never from incremental deltas, so rounding cannot drift.

use crate::viewport::AxesMapping;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Rounding rule for converting a pixel delta into whole steps.
///
/// The choice is visible: with `pixels_per_step = 2`, a +7 px drag is +3
/// steps under `Floor` and +4 under `Nearest`. One rule is applied uniformly
/// per controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundingMode {
    /// Round toward negative infinity.
    #[default]
    Floor,
    /// Round to the nearest step, ties away from zero.
    Nearest,
}

/// Conversion from pixel distance to value offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepRule {
    /// Value increment per step.
    pub step: f64,
    /// Pixels of pointer travel per step.
    pub pixels_per_step: f64,
    /// Rounding rule for partial steps.
    pub rounding: RoundingMode,
}

impl StepRule {
    /// Create a rule with the default `Floor` rounding.
    pub fn new(step: f64, pixels_per_step: f64) -> Self {
        Self {
            step,
            pixels_per_step,
            rounding: RoundingMode::Floor,
        }
    }

    /// Apply a pixel delta to a start value, unclamped.
    pub fn apply(&self, start: f64, delta_px: f64) -> f64 {
        if self.pixels_per_step <= 0.0 || self.step == 0.0 {
            return start;
        }
        let steps = delta_px / self.pixels_per_step;
        let steps = match self.rounding {
            RoundingMode::Floor => steps.floor(),
            RoundingMode::Nearest => steps.round(),
        };
        start + steps * self.step
    }
}

/// One bounded axis of a relative drag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AxisRule {
    pub min: f64,
    pub max: f64,
    pub step: StepRule,
}

impl AxisRule {
    /// Create an axis rule.
    pub fn new(min: f64, max: f64, step: StepRule) -> Self {
        Self { min, max, step }
    }

    /// Clamp a value into this axis' bounds. A collapsed axis is the
    /// constant `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if self.max <= self.min {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    /// Stepped, clamped candidate for a pixel delta from a start value.
    pub fn apply(&self, start: f64, delta_px: f64) -> f64 {
        self.clamp(self.step.apply(start, delta_px))
    }
}

/// How pointer positions become values.
#[derive(Debug, Clone)]
pub enum DragMode {
    /// Value = stepped offset from the value captured at pointer-down.
    /// The slider and matrix style.
    Relative {
        x: AxisRule,
        y: Option<AxisRule>,
    },
    /// Value = inverse-mapped current pointer position. The puck style;
    /// pointer-down warps the value to the pointer.
    Absolute { mapping: AxesMapping },
}

/// Candidate values produced by a drag step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragUpdate {
    pub x: f64,
    pub y: Option<f64>,
}

impl DragUpdate {
    /// A one-axis update.
    pub fn x(x: f64) -> Self {
        Self { x, y: None }
    }

    /// A two-axis update.
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y: Some(y) }
    }
}

/// Ephemeral state of one pointer gesture.
#[derive(Debug, Clone)]
struct DragSession {
    start_pixel: Point,
    start: DragUpdate,
}

/// Converts a pointer-drag gesture into bounded, stepped data values.
///
/// Single active session: a second pointer-down while dragging is ignored
/// until the first gesture ends.
#[derive(Debug, Clone)]
pub struct DragController {
    mode: DragMode,
    session: Option<DragSession>,
}

impl DragController {
    /// Relative drag along the pixel x axis.
    pub fn relative_x(x: AxisRule) -> Self {
        Self {
            mode: DragMode::Relative { x, y: None },
            session: None,
        }
    }

    /// Relative drag on both pixel axes.
    pub fn relative_xy(x: AxisRule, y: AxisRule) -> Self {
        Self {
            mode: DragMode::Relative { x, y: Some(y) },
            session: None,
        }
    }

    /// Absolute drag through a pixel/data mapping.
    pub fn absolute(mapping: AxesMapping) -> Self {
        Self {
            mode: DragMode::Absolute { mapping },
            session: None,
        }
    }

    /// Whether a session is active.
    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a gesture at `pos`, with the widget's current value(s).
    ///
    /// Returns the initial candidate when the press itself already moves the
    /// value (absolute mode warps to the pointer); `None` when nothing
    /// changes on press or when a session is already active.
    pub fn pointer_down(&mut self, pos: Point, current: DragUpdate) -> Option<DragUpdate> {
        if self.session.is_some() {
            return None;
        }
        match &self.mode {
            DragMode::Relative { .. } => {
                self.session = Some(DragSession {
                    start_pixel: pos,
                    start: current,
                });
                None
            }
            DragMode::Absolute { mapping } => {
                let warped = mapping.pixel_to_data(pos);
                let start = DragUpdate::xy(warped.x, warped.y);
                self.session = Some(DragSession {
                    start_pixel: pos,
                    start,
                });
                Some(start)
            }
        }
    }

    /// Recompute the candidate for the current pointer position.
    pub fn pointer_move(&mut self, pos: Point) -> Option<DragUpdate> {
        let session = self.session.as_ref()?;
        Some(self.candidate(session, pos))
    }

    /// End the gesture, returning the final candidate.
    pub fn pointer_up(&mut self, pos: Point) -> Option<DragUpdate> {
        let session = self.session.take()?;
        Some(self.candidate(&session, pos))
    }

    /// Abandon the session without producing a value.
    pub fn cancel(&mut self) {
        self.session = None;
    }

    fn candidate(&self, session: &DragSession, pos: Point) -> DragUpdate {
        match &self.mode {
            DragMode::Relative { x, y } => {
                let dx = pos.x - session.start_pixel.x;
                let out_x = x.apply(session.start.x, dx);
                let out_y = match (y, session.start.y) {
                    (Some(rule), Some(start_y)) => {
                        let dy = pos.y - session.start_pixel.y;
                        Some(rule.apply(start_y, dy))
                    }
                    _ => None,
                };
                DragUpdate { x: out_x, y: out_y }
            }
            DragMode::Absolute { mapping } => {
                let data = mapping.pixel_to_data(pos);
                DragUpdate::xy(data.x, data.y)
            }
        }
    }
}

/// Round a value to a fixed number of decimal digits, ties away from zero.
/// Keeps float jitter from producing redundant staged writes.
pub fn round_digits(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
