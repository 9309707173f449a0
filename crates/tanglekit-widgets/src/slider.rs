//! Inline 1-D slider: scrub a number by dragging horizontally.

use crate::{Instant, Widget, WidgetError};
use tanglekit_core::debounce::Debouncer;
use tanglekit_core::drag::{AxisRule, DragController, DragUpdate, RoundingMode, StepRule, round_digits};
use tanglekit_core::model::{FieldBinding, ModelHandle, Value};
use tanglekit_core::pointer::{MouseButton, PointerEvent};

/// Model field holding the slider value.
const VALUE_FIELD: &str = "amount";

/// Slider configuration, read from the model at mount with local defaults.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SliderConfig {
    pub min_value: f64,
    pub max_value: f64,
    pub step: f64,
    pub pixels_per_step: f64,
    pub prefix: String,
    pub suffix: String,
    pub digits: i32,
    pub rounding: RoundingMode,
}

impl SliderConfig {
    fn from_model(model: &ModelHandle) -> Self {
        Self {
            min_value: model.f64_or("min_value", -100.0),
            max_value: model.f64_or("max_value", 100.0),
            step: model.f64_or("step", 1.0),
            pixels_per_step: model.f64_or("pixels_per_step", 2.0),
            prefix: model.string_or("prefix", ""),
            suffix: model.string_or("suffix", ""),
            digits: model.i64_or("digits", 1) as i32,
            rounding: RoundingMode::default(),
        }
    }

    fn axis(&self) -> AxisRule {
        AxisRule::new(
            self.min_value,
            self.max_value,
            StepRule {
                step: self.step,
                pixels_per_step: self.pixels_per_step,
                rounding: self.rounding,
            },
        )
    }
}

/// Inline value scrubber.
///
/// Dragging left/right steps the value by `step` per `pixels_per_step`
/// pixels, clamped to the configured bounds. The displayed text updates on
/// every move; the model commit is debounced, with a forced commit on
/// release.
pub struct Slider {
    model: ModelHandle,
    config: SliderConfig,
    value: f64,
    drag: DragController,
    commit: Debouncer,
    binding: FieldBinding,
    dirty: bool,
}

impl Slider {
    /// Mount a slider on a host model. Fails fast when the host never
    /// initialized the value field.
    pub fn mount(model: ModelHandle) -> Result<Self, WidgetError> {
        model.ensure_fields(&[VALUE_FIELD])?;
        let config = SliderConfig::from_model(&model);
        let value = round_digits(model.f64(VALUE_FIELD)?, config.digits);
        let drag = DragController::relative_x(config.axis());
        let binding = model.bind(VALUE_FIELD);
        log::debug!("slider mounted: value={value}");
        Ok(Self {
            model,
            config,
            value,
            drag,
            commit: Debouncer::default(),
            binding,
            dirty: true,
        })
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The configuration in effect.
    pub fn config(&self) -> &SliderConfig {
        &self.config
    }

    /// Whether a drag gesture is active.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Display text: prefix, value at the configured precision, suffix.
    pub fn text(&self) -> String {
        format!(
            "{}{:.*}{}",
            self.config.prefix,
            self.config.digits.max(0) as usize,
            self.value,
            self.config.suffix
        )
    }

    /// Apply a drag candidate: redraw now, commit later.
    fn apply_move(&mut self, candidate: f64, now: Instant) {
        let candidate = round_digits(candidate, self.config.digits);
        if (candidate - self.value).abs() < f64::EPSILON {
            return;
        }
        self.value = candidate;
        self.dirty = true;
        self.model.set(VALUE_FIELD, Value::from(candidate));
        self.commit.schedule(now);
    }

    /// Finish the gesture: the committed value must match the visual one.
    fn finish_drag(&mut self, candidate: f64) {
        self.value = round_digits(candidate, self.config.digits);
        self.dirty = true;
        self.model.set(VALUE_FIELD, Value::from(self.value));
        self.model.save_changes();
        self.commit.cancel();
    }
}

impl Widget for Slider {
    fn pointer(&mut self, event: PointerEvent, now: Instant) {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                ..
            } => {
                self.drag.pointer_down(position, DragUpdate::x(self.value));
            }
            PointerEvent::Move { position } => {
                if let Some(update) = self.drag.pointer_move(position) {
                    self.apply_move(update.x, now);
                }
            }
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => {
                if let Some(update) = self.drag.pointer_up(position) {
                    self.finish_drag(update.x);
                }
            }
            _ => {}
        }
    }

    fn tick(&mut self, now: Instant) {
        if self.commit.fire_due(now) {
            self.model.save_changes();
        }
        if let Some(value) = self.binding.take() {
            if !self.drag.is_dragging() {
                if let Some(v) = value.as_f64() {
                    self.value = round_digits(v, self.config.digits);
                    self.dirty = true;
                }
            }
        }
    }

    fn needs_redraw(&self) -> bool {
        self.dirty
    }

    fn clear_redraw(&mut self) {
        self.dirty = false;
    }
}
