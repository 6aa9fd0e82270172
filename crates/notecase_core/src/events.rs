//! Backend change notifications.
//!
//! # Responsibility
//! - Let UI components subscribe to storage changes explicitly.
//! - Fan out typed `BackendEvent`s to registered listeners.
//!
//! # Invariants
//! - Listeners are called in subscription order.
//! - Listeners are invoked outside the registry lock, so a listener may
//!   subscribe or unsubscribe without deadlocking.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Change emitted by a note backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// Inventory was replaced by a full rescan.
    Refreshed { categories: usize },
    NoteSaved { category: String, index: usize },
    NoteCreated { category: String, index: usize },
    CategoryCreated { name: String },
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&BackendEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<SubscriptionId, Listener>,
}

/// Thread-safe listener registry.
#[derive(Default)]
pub struct Subscribers {
    inner: Mutex<Registry>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&BackendEvent) + Send + Sync + 'static,
    {
        let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(listener));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        registry.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        let registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        registry.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, event: &BackendEvent) {
        let listeners = {
            let registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            registry.listeners.values().cloned().collect::<Vec<_>>()
        };
        for listener in listeners {
            listener(event);
        }
    }
}
