//! N×M numeric grid editor with per-cell drag scrubbing.

use crate::{Instant, Widget, WidgetError};
use kurbo::{Point, Rect};
use tanglekit_core::debounce::Debouncer;
use tanglekit_core::drag::{AxisRule, DragController, DragUpdate, RoundingMode, StepRule, round_digits};
use tanglekit_core::model::{FieldBinding, ModelHandle, Value};
use tanglekit_core::pointer::{MouseButton, PointerEvent};

/// Model field holding the cell values, row-major.
const MATRIX_FIELD: &str = "matrix";

/// Cell footprint in pixels.
pub const CELL_WIDTH: f64 = 64.0;
pub const CELL_HEIGHT: f64 = 28.0;

/// Matrix configuration, read from the model at mount with local defaults.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MatrixConfig {
    pub min_value: f64,
    pub max_value: f64,
    pub mirror: bool,
    pub step: f64,
    pub pixels_per_step: f64,
    pub digits: i32,
    pub row_names: Vec<String>,
    pub col_names: Vec<String>,
    pub is_static: bool,
    pub rounding: RoundingMode,
}

impl MatrixConfig {
    fn from_model(model: &ModelHandle) -> Self {
        Self {
            min_value: model.f64_or("min_value", -100.0),
            max_value: model.f64_or("max_value", 100.0),
            mirror: model.bool_or("mirror", false),
            step: model.f64_or("step", 1.0),
            pixels_per_step: model.f64_or("pixels_per_step", 2.0),
            digits: model.i64_or("digits", 1) as i32,
            row_names: model.strings_or_empty("row_names"),
            col_names: model.strings_or_empty("col_names"),
            is_static: model.bool_or("static", false),
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

/// Grid editor; each cell scrubs horizontally like an inline slider.
///
/// With `mirror` enabled the grid behaves as a symmetric matrix: writing
/// cell (r, c) with r≠c also writes (c, r) whenever the transposed index is
/// in range, so rectangular grids stay well-defined. The whole grid is one
/// model field; every mutation stages a fresh deep copy.
pub struct Matrix {
    model: ModelHandle,
    config: MatrixConfig,
    cells: Vec<Vec<f64>>,
    drag: DragController,
    active_cell: Option<(usize, usize)>,
    commit: Debouncer,
    binding: FieldBinding,
    dirty: bool,
}

impl Matrix {
    /// Mount a matrix editor on a host model. Fails fast when the host
    /// never initialized the grid.
    pub fn mount(model: ModelHandle) -> Result<Self, WidgetError> {
        model.ensure_fields(&[MATRIX_FIELD])?;
        let config = MatrixConfig::from_model(&model);
        let cells = parse_cells(&model.get(MATRIX_FIELD)?).ok_or_else(|| {
            tanglekit_core::model::ModelError::TypeMismatch {
                field: MATRIX_FIELD.to_string(),
                expected: "array of arrays of numbers",
            }
        })?;
        let drag = DragController::relative_x(config.axis());
        let binding = model.bind(MATRIX_FIELD);
        log::debug!("matrix mounted: {}x{}", cells.len(), cells.first().map_or(0, Vec::len));
        Ok(Self {
            model,
            config,
            cells,
            drag,
            active_cell: None,
            commit: Debouncer::default(),
            binding,
            dirty: true,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    /// Cell value, if the index is in range.
    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// The configuration in effect.
    pub fn config(&self) -> &MatrixConfig {
        &self.config
    }

    /// Whether a cell scrub is active.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Cells formatted at the configured precision, row-major.
    pub fn formatted_cells(&self) -> Vec<Vec<String>> {
        let digits = self.config.digits.max(0) as usize;
        self.cells
            .iter()
            .map(|row| row.iter().map(|v| format!("{v:.digits$}")).collect())
            .collect()
    }

    /// Pixel rectangle of a cell, offset past any label row/column.
    pub fn cell_rect(&self, row: usize, col: usize) -> Rect {
        let x0 = (col + self.label_cols()) as f64 * CELL_WIDTH;
        let y0 = (row + self.header_rows()) as f64 * CELL_HEIGHT;
        Rect::new(x0, y0, x0 + CELL_WIDTH, y0 + CELL_HEIGHT)
    }

    /// Cell under a pixel position, if any.
    pub fn cell_at(&self, position: Point) -> Option<(usize, usize)> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let col = (position.x / CELL_WIDTH).floor() as usize;
        let row = (position.y / CELL_HEIGHT).floor() as usize;
        let col = col.checked_sub(self.label_cols())?;
        let row = row.checked_sub(self.header_rows())?;
        (row < self.rows() && col < self.cols()).then_some((row, col))
    }

    fn label_cols(&self) -> usize {
        usize::from(!self.config.row_names.is_empty())
    }

    fn header_rows(&self) -> usize {
        usize::from(!self.config.col_names.is_empty())
    }

    /// Write a cell, mirroring across the diagonal when configured.
    fn set_cell(&mut self, row: usize, col: usize, value: f64) {
        let value = round_digits(value, self.config.digits);
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
        if self.config.mirror && row != col {
            if let Some(cell) = self.cells.get_mut(col).and_then(|r| r.get_mut(row)) {
                *cell = value;
            }
        }
    }

    fn stage_cells(&self) {
        self.model.set(MATRIX_FIELD, Value::from(self.cells.clone()));
    }

    fn apply_move(&mut self, candidate: f64, now: Instant) {
        let Some((row, col)) = self.active_cell else {
            return;
        };
        self.set_cell(row, col, candidate);
        self.dirty = true;
        self.stage_cells();
        self.commit.schedule(now);
    }

    fn finish_drag(&mut self, candidate: f64) {
        if let Some((row, col)) = self.active_cell.take() {
            self.set_cell(row, col, candidate);
            self.dirty = true;
            self.stage_cells();
            self.model.save_changes();
            self.commit.cancel();
        }
    }
}

impl Widget for Matrix {
    fn pointer(&mut self, event: PointerEvent, now: Instant) {
        if self.config.is_static {
            return;
        }
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                ..
            } => {
                if self.drag.is_dragging() {
                    return;
                }
                if let Some((row, col)) = self.cell_at(position) {
                    let start = self.cell(row, col).unwrap_or_default();
                    self.drag.pointer_down(position, DragUpdate::x(start));
                    self.active_cell = Some((row, col));
                }
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
                if let Some(cells) = parse_cells(&value) {
                    self.cells = cells;
                    self.dirty = true;
                } else {
                    log::warn!("host pushed a malformed matrix value, ignoring");
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

/// Parse a row-major grid of numbers from a model value.
fn parse_cells(value: &Value) -> Option<Vec<Vec<f64>>> {
    let rows = value.as_array()?;
    rows.iter()
        .map(|row| {
            row.as_array()?
                .iter()
                .map(Value::as_f64)
                .collect::<Option<Vec<f64>>>()
        })
        .collect()
}
