//! Tanglekit Core Library
//!
//! Host-agnostic contracts shared by all tanglekit widgets: the model
//! synchronization protocol, pointer events, the drag controller, debounced
//! commits, and the pixel/data coordinate mappings.

pub mod debounce;
pub mod drag;
pub mod mercator;
pub mod model;
pub mod pointer;
pub mod tiles;
pub mod viewport;

pub use debounce::Debouncer;
pub use drag::{AxisRule, DragController, DragMode, DragUpdate, RoundingMode, StepRule, round_digits};
pub use mercator::{TilePlacement, ZoomAnimator};
pub use model::{ClientId, FieldBinding, MemoryModel, Model, ModelError, ModelHandle, SubscriptionId, Value};
pub use pointer::{ClickTracker, Modifiers, MouseButton, PointerEvent};
pub use tiles::{NullTileSource, TileCache, TileError, TileKey, TileSource, TileState};
pub use viewport::AxesMapping;
