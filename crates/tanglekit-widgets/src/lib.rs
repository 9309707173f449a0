//! Interactive value widgets bound to a shared model.
//!
//! This crate provides the widget implementations built on the tanglekit
//! core contracts:
//!
//! - **Slider**: inline 1-D value scrubber
//! - **Matrix**: N×M numeric grid editor with optional symmetry
//! - **ChartPuck**: draggable 2-D marker over a chart image
//! - **MapPicker**: pan/zoom tile map for picking coordinates
//!
//! Widgets are pure state machines. They consume pointer events and model
//! change notifications, stage values back through their model handle,
//! and expose a view-state snapshot; painting belongs to the embedding
//! host. Every widget redraws optimistically on local input and commits on
//! a debounced schedule, with a forced commit when the gesture ends.

pub mod map;
pub mod matrix;
pub mod puck;
pub mod slider;

pub use map::{MapPicker, MapScene, TileDraw};
pub use matrix::Matrix;
pub use puck::ChartPuck;
pub use slider::Slider;

use tanglekit_core::model::ModelError;
use tanglekit_core::pointer::PointerEvent;
use thiserror::Error;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
pub use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::Instant;

/// Widget construction and runtime errors.
///
/// Failures during interaction never surface here; they become status text
/// on the widget so one misbehaving widget cannot take down its neighbors.
#[derive(Debug, Error)]
pub enum WidgetError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
}

/// The runtime surface shared by every widget.
///
/// The host forwards pointer events (document-level while a drag is active)
/// and calls [`Widget::tick`] once per frame; `tick` drains model-change
/// notifications, fires due commits, and steps animations. Dropping a
/// widget is its teardown: subscriptions are removed and pending commits
/// discarded, so no callback runs into a disposed widget.
pub trait Widget {
    /// Feed one pointer event.
    fn pointer(&mut self, event: PointerEvent, now: Instant);

    /// Advance timers, animations, and host-pushed state.
    fn tick(&mut self, now: Instant);

    /// Whether the view-state changed since the last [`Widget::clear_redraw`].
    fn needs_redraw(&self) -> bool;

    /// Acknowledge a redraw.
    fn clear_redraw(&mut self);

    /// User-visible status line, if something went wrong locally.
    fn status(&self) -> Option<&str> {
        None
    }
}
