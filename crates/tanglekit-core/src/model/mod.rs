//! Model synchronization contract between widgets and the host.
//!
//! The host owns a key/value state container with staged-write semantics:
//! `stage` mutates a pending value without notifying anyone, `commit`
//! finalizes all pending values and notifies subscribers. Each attachment
//! (a widget, or the host side itself) holds its own [`ClientId`]; a commit
//! never notifies the client that staged the value, because that client
//! already updated its own view before committing.

mod binding;
mod memory;

pub use binding::FieldBinding;
pub use memory::MemoryModel;

use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use uuid::Uuid;

/// Model field values: numbers, strings, booleans, arrays, nested objects.
pub type Value = serde_json::Value;

/// Change callback invoked on commit with the field name and committed value.
pub type ChangeCallback = Rc<RefCell<dyn FnMut(&str, &Value)>>;

/// Identity of one model attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a fresh client identity.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Identity of one subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Model contract errors.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("field {field} has unexpected type, expected {expected}")]
    TypeMismatch { field: String, expected: &'static str },
    #[error("model contract violation: {0}")]
    ContractViolation(String),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// The synchronization contract every widget depends on.
///
/// Reads return the last committed value; staged values stay invisible until
/// [`Model::commit`]. Staging the same field twice before a commit overwrites
/// the pending value (last write wins). Commit notifies, per staged field,
/// every subscriber of that field except the staging client, in subscription
/// order, exactly once per commit.
pub trait Model {
    /// Return the last committed value of a field.
    fn get(&self, field: &str) -> ModelResult<Value>;

    /// Stage a value on behalf of `origin`. Notifies nobody.
    fn stage(&self, origin: ClientId, field: &str, value: Value);

    /// Commit all staged values and notify subscribers of other clients.
    fn commit(&self);

    /// Register a change observer for a field.
    fn subscribe(&self, field: &str, client: ClientId, callback: ChangeCallback) -> SubscriptionId;

    /// Remove a previously registered observer.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// A widget's view of the model: a shared model plus this attachment's
/// [`ClientId`], injected into every staged write so commits can skip
/// notifying the writer.
#[derive(Clone)]
pub struct ModelHandle {
    model: Rc<dyn Model>,
    client: ClientId,
}

impl ModelHandle {
    /// Attach to a model with a fresh client identity.
    pub fn attach(model: Rc<dyn Model>) -> Self {
        Self {
            model,
            client: ClientId::fresh(),
        }
    }

    /// This attachment's identity.
    pub fn client(&self) -> ClientId {
        self.client
    }

    /// Read the last committed value of a field.
    pub fn get(&self, field: &str) -> ModelResult<Value> {
        self.model.get(field)
    }

    /// Stage a value; no observers fire until [`ModelHandle::save_changes`].
    pub fn set(&self, field: &str, value: Value) {
        self.model.stage(self.client, field, value);
    }

    /// Commit all staged values.
    pub fn save_changes(&self) {
        self.model.commit();
    }

    /// Subscribe to committed changes of a field via a pull-style binding.
    pub fn bind(&self, field: &str) -> FieldBinding {
        FieldBinding::new(Rc::clone(&self.model), self.client, field)
    }

    /// Fail fast when the host did not initialize the fields a widget
    /// cannot function without.
    pub fn ensure_fields(&self, required: &[&str]) -> ModelResult<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|field| self.model.get(field).is_err())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ModelError::ContractViolation(format!(
                "host model is missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// Read a numeric field.
    pub fn f64(&self, field: &str) -> ModelResult<f64> {
        self.get(field)?.as_f64().ok_or(ModelError::TypeMismatch {
            field: field.to_string(),
            expected: "number",
        })
    }

    /// Read a numeric field, falling back to a widget-local default when the
    /// host never initialized it or initialized it with the wrong shape.
    pub fn f64_or(&self, field: &str, default: f64) -> f64 {
        self.f64(field).unwrap_or(default)
    }

    /// Read a boolean field with a local default.
    pub fn bool_or(&self, field: &str, default: bool) -> bool {
        self.get(field)
            .ok()
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Read a string field with a local default.
    pub fn string_or(&self, field: &str, default: &str) -> String {
        self.get(field)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    /// Read an integer field with a local default.
    pub fn i64_or(&self, field: &str, default: i64) -> i64 {
        self.get(field)
            .ok()
            .and_then(|v| v.as_i64())
            .unwrap_or(default)
    }

    /// Read a `[min, max]` pair with a local default.
    pub fn pair_or(&self, field: &str, default: (f64, f64)) -> (f64, f64) {
        match self.get(field).ok().as_ref().and_then(Value::as_array) {
            Some(items) if items.len() == 2 => {
                let a = items[0].as_f64();
                let b = items[1].as_f64();
                match (a, b) {
                    (Some(a), Some(b)) => (a, b),
                    _ => default,
                }
            }
            _ => default,
        }
    }

    /// Read a `[left, top, right, bottom]` quad with a local default.
    pub fn quad_or(&self, field: &str, default: [f64; 4]) -> [f64; 4] {
        match self.get(field).ok().as_ref().and_then(Value::as_array) {
            Some(items) if items.len() == 4 => {
                let mut out = default;
                for (slot, item) in out.iter_mut().zip(items) {
                    match item.as_f64() {
                        Some(v) => *slot = v,
                        None => return default,
                    }
                }
                out
            }
            _ => default,
        }
    }

    /// Read a list of strings with an empty default.
    pub fn strings_or_empty(&self, field: &str) -> Vec<String> {
        self.get(field)
            .ok()
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
