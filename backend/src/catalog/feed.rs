//! Change notifications for the `objects` collection.
//!
//! Listeners register a data callback and an error callback and get a `Subscription` back;
//! dropping the subscription unregisters them. Callbacks run synchronously on the publishing
//! thread, in subscription order, outside the feed's lock.

use crate::store::StoreError;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    /// Records were created, updated or deleted.
    Records,
    /// The field configuration record was replaced.
    Configuration,
}

type DataCallback = Box<dyn Fn(ChangeEvent) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&StoreError) + Send + Sync>;

struct Listener {
    on_data: DataCallback,
    on_error: ErrorCallback,
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Arc<Listener>>,
}

#[derive(Clone, Default)]
pub struct ChangeFeed {
    listeners: Arc<Mutex<Listeners>>,
}

fn lock(listeners: &Mutex<Listeners>) -> MutexGuard<'_, Listeners> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChangeFeed {
    pub fn new() -> Self {
        ChangeFeed::default()
    }

    pub fn subscribe(
        &self,
        on_data: impl Fn(ChangeEvent) + Send + Sync + 'static,
        on_error: impl Fn(&StoreError) + Send + Sync + 'static,
    ) -> Subscription {
        let mut listeners = lock(&self.listeners);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(
            id,
            Arc::new(Listener {
                on_data: Box::new(on_data),
                on_error: Box::new(on_error),
            }),
        );
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            id,
        }
    }

    pub fn publish(&self, event: ChangeEvent) {
        for listener in self.snapshot() {
            (listener.on_data)(event);
        }
    }

    pub fn publish_error(&self, error: &StoreError) {
        for listener in self.snapshot() {
            (listener.on_error)(error);
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.listeners).entries.len()
    }

    fn snapshot(&self) -> Vec<Arc<Listener>> {
        lock(&self.listeners).entries.values().cloned().collect()
    }
}

/// Handle returned by `ChangeFeed::subscribe`. Unsubscribes when dropped.
pub struct Subscription {
    listeners: Weak<Mutex<Listeners>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).entries.remove(&self.id);
        }
    }
}
