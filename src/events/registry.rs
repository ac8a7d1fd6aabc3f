//! Listener registry for push events.
//!
//! Maps an [`EventFilter`] to the set of callbacks registered under it and
//! fans incoming events out to exact-type and wildcard listeners. The
//! registry outlives individual connections; it is the single owner of
//! subscription state.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use super::{Event, EventFilter};

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

struct Entry {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<EventFilter, Vec<Entry>>>,
}

impl Inner {
    fn remove(&self, filter: &EventFilter, id: u64) {
        let mut listeners = self.listeners.lock();
        if let Some(entries) = listeners.get_mut(filter) {
            entries.retain(|entry| entry.id != id);
            // A filter with no listeners must not linger in the map.
            if entries.is_empty() {
                listeners.remove(filter);
            }
        }
    }
}

/// Shared listener table, cloned between the client facade and the socket task.
#[derive(Clone, Default)]
pub(crate) struct ListenerRegistry {
    inner: Arc<Inner>,
}

impl ListenerRegistry {
    /// Registers `callback` under `filter` and returns its removal handle.
    pub(crate) fn add<F>(&self, filter: EventFilter, callback: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .entry(filter.clone())
            .or_default()
            .push(Entry {
                id,
                callback: Arc::new(callback),
            });
        Subscription {
            registry: Arc::downgrade(&self.inner),
            filter,
            id,
        }
    }

    /// Delivers `event` to every exact-type and wildcard listener.
    ///
    /// The callback list is snapshotted before invocation, so a listener may
    /// unsubscribe itself or others mid-dispatch without disturbing the
    /// iteration. A panicking listener is contained and does not stop
    /// delivery to the remaining listeners.
    pub(crate) fn dispatch(&self, event: &Event) {
        let callbacks: Vec<Callback> = {
            let listeners = self.inner.listeners.lock();
            let exact = listeners
                .get(&EventFilter::Type(event.kind.clone()))
                .into_iter()
                .flatten();
            let wildcard = listeners.get(&EventFilter::Any).into_iter().flatten();
            exact
                .chain(wildcard)
                .map(|entry| Arc::clone(&entry.callback))
                .collect()
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(kind = %event.kind, "event listener panicked");
            }
        }
    }

    /// Whether any listener is registered under `filter`.
    #[cfg(test)]
    pub(crate) fn has_listeners(&self, filter: &EventFilter) -> bool {
        self.inner.listeners.lock().contains_key(filter)
    }
}

/// Handle for removing a listener registered with
/// [`Client::on_event`](crate::Client::on_event).
///
/// The subscription stays active until [`unsubscribe`](Subscription::unsubscribe)
/// is called; dropping the handle does not remove the listener.
pub struct Subscription {
    registry: Weak<Inner>,
    filter: EventFilter,
    id: u64,
}

impl Subscription {
    /// Removes the listener from the registry.
    ///
    /// Idempotent: calling this more than once, or after the listener has
    /// already been removed, has no effect. Safe to call from within a
    /// listener callback.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.registry.upgrade() {
            inner.remove(&self.filter, self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("filter", &self.filter)
            .field("id", &self.id)
            .finish()
    }
}
