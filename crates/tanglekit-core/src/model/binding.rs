//! Field bindings: pull-style subscriptions from a widget to one model field.

use super::{ClientId, Model, SubscriptionId, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// A named subscription from a widget to one model field.
///
/// The change callback only fills a slot; the widget drains it from its own
/// `tick`, which keeps redraws out of the notification path and makes the
/// re-entry order explicit. Consecutive commits before a drain coalesce to
/// the latest value. Dropping the binding unsubscribes.
pub struct FieldBinding {
    model: Rc<dyn Model>,
    id: SubscriptionId,
    field: String,
    slot: Rc<RefCell<Option<Value>>>,
    last_seen: Option<Value>,
}

impl FieldBinding {
    pub(super) fn new(model: Rc<dyn Model>, client: ClientId, field: &str) -> Self {
        let slot: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&slot);
        let id = model.subscribe(
            field,
            client,
            Rc::new(RefCell::new(move |_field: &str, value: &Value| {
                *sink.borrow_mut() = Some(value.clone());
            })),
        );
        Self {
            model,
            id,
            field: field.to_string(),
            slot,
            last_seen: None,
        }
    }

    /// The bound field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Take the most recent committed value, at most once per commit.
    ///
    /// The returned value may equal the previously seen one; consumers are
    /// expected to redraw idempotently.
    pub fn take(&mut self) -> Option<Value> {
        let value = self.slot.borrow_mut().take()?;
        self.last_seen = Some(value.clone());
        Some(value)
    }

    /// The last value taken from this binding.
    pub fn last_seen(&self) -> Option<&Value> {
        self.last_seen.as_ref()
    }
}

impl Drop for FieldBinding {
    fn drop(&mut self) {
        self.model.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryModel, ModelHandle};
    use serde_json::json;

    fn setup() -> (Rc<MemoryModel>, ModelHandle, ModelHandle) {
        let model = Rc::new(MemoryModel::new());
        model.seed("x", json!(0.0));
        let widget = ModelHandle::attach(Rc::clone(&model) as Rc<dyn Model>);
        let host = ModelHandle::attach(Rc::clone(&model) as Rc<dyn Model>);
        (model, widget, host)
    }

    #[test]
    fn test_take_returns_committed_value_once() {
        let (_model, widget, host) = setup();
        let mut binding = widget.bind("x");

        host.set("x", json!(1.5));
        host.save_changes();

        assert_eq!(binding.take(), Some(json!(1.5)));
        assert_eq!(binding.take(), None);
    }

    #[test]
    fn test_rapid_commits_coalesce_to_latest() {
        let (_model, widget, host) = setup();
        let mut binding = widget.bind("x");

        for v in [1.0, 2.0, 3.0] {
            host.set("x", json!(v));
            host.save_changes();
        }

        assert_eq!(binding.take(), Some(json!(3.0)));
        assert_eq!(binding.take(), None);
    }

    #[test]
    fn test_own_writes_do_not_fill_the_slot() {
        let (_model, widget, _host) = setup();
        let mut binding = widget.bind("x");

        widget.set("x", json!(9.0));
        widget.save_changes();

        assert_eq!(binding.take(), None);
    }

    #[test]
    fn test_last_seen_tracks_taken_values() {
        let (_model, widget, host) = setup();
        let mut binding = widget.bind("x");
        assert!(binding.last_seen().is_none());

        host.set("x", json!(2.0));
        host.save_changes();
        binding.take();

        assert_eq!(binding.last_seen(), Some(&json!(2.0)));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let (model, widget, host) = setup();
        let binding = widget.bind("x");
        assert_eq!(model.subscription_count(), 1);

        drop(binding);
        assert_eq!(model.subscription_count(), 0);

        // A commit after disposal reaches no widget callback.
        host.set("x", json!(4.0));
        host.save_changes();
    }
}
