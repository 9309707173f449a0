//! In-process model implementation.

use super::{ChangeCallback, ClientId, Model, ModelError, ModelResult, SubscriptionId, Value};
use std::cell::RefCell;
use std::collections::HashMap;

/// One staged write. Kept in first-staging order; re-staging the same field
/// overwrites the value and origin in place.
struct StagedEntry {
    field: String,
    value: Value,
    origin: ClientId,
}

struct Subscription {
    id: SubscriptionId,
    field: String,
    client: ClientId,
    callback: ChangeCallback,
}

struct Inner {
    committed: HashMap<String, Value>,
    staged: Vec<StagedEntry>,
    subscriptions: Vec<Subscription>,
}

/// In-memory model for tests and kernel-less embedding.
///
/// The host side of the contract: committed state, a staged-write buffer,
/// and an ordered subscriber list. Single-threaded by design; interleaved
/// callbacks are the only form of concurrency.
pub struct MemoryModel {
    inner: RefCell<Inner>,
}

impl MemoryModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner {
                committed: HashMap::new(),
                staged: Vec::new(),
                subscriptions: Vec::new(),
            }),
        }
    }

    /// Initialize a field directly into committed state, without notification.
    /// This is the host populating the model before any widget attaches.
    pub fn seed(&self, field: &str, value: Value) {
        self.inner
            .borrow_mut()
            .committed
            .insert(field.to_string(), value);
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.borrow().subscriptions.len()
    }
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self::new()
    }
}

impl Model for MemoryModel {
    fn get(&self, field: &str) -> ModelResult<Value> {
        self.inner
            .borrow()
            .committed
            .get(field)
            .cloned()
            .ok_or_else(|| ModelError::UnknownField(field.to_string()))
    }

    fn stage(&self, origin: ClientId, field: &str, value: Value) {
        let mut inner = self.inner.borrow_mut();
        if let Some(entry) = inner.staged.iter_mut().find(|e| e.field == field) {
            entry.value = value;
            entry.origin = origin;
        } else {
            inner.staged.push(StagedEntry {
                field: field.to_string(),
                value,
                origin,
            });
        }
    }

    fn commit(&self) {
        // Collect the callbacks to run while holding the borrow, then release
        // it before invoking them: a callback may re-enter get/stage/subscribe.
        let pending: Vec<(String, Value, Vec<ChangeCallback>)> = {
            let mut inner = self.inner.borrow_mut();
            let staged = std::mem::take(&mut inner.staged);
            let mut pending = Vec::with_capacity(staged.len());
            for entry in staged {
                inner
                    .committed
                    .insert(entry.field.clone(), entry.value.clone());
                let callbacks: Vec<ChangeCallback> = inner
                    .subscriptions
                    .iter()
                    .filter(|sub| sub.field == entry.field && sub.client != entry.origin)
                    .map(|sub| std::rc::Rc::clone(&sub.callback))
                    .collect();
                pending.push((entry.field, entry.value, callbacks));
            }
            pending
        };

        for (field, value, callbacks) in pending {
            log::debug!("commit: {field}");
            for callback in callbacks {
                (callback.borrow_mut())(&field, &value);
            }
        }
    }

    fn subscribe(&self, field: &str, client: ClientId, callback: ChangeCallback) -> SubscriptionId {
        let id = SubscriptionId::fresh();
        self.inner.borrow_mut().subscriptions.push(Subscription {
            id,
            field: field.to_string(),
            client,
            callback,
        });
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner
            .borrow_mut()
            .subscriptions
            .retain(|sub| sub.id != id);
    }
}
