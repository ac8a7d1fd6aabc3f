//! Connection lifecycle and one-shot event waits.
//!
//! [`EventHub`] ties the listener registry to the push socket: it owns the
//! single connection slot, decodes inbound frames, and builds the
//! `wait_for_event` primitive on top of a transient subscription.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;
use url::Url;

use super::registry::{ListenerRegistry, Subscription};
use super::socket::PushSocket;
use super::{Event, EventFilter};
use crate::{Error, Result};

/// Wait bound applied when the caller does not pick one.
pub(crate) const DEFAULT_EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry plus connection slot; one per [`Client`](crate::Client).
pub(crate) struct EventHub {
    registry: ListenerRegistry,
    socket: Mutex<Option<PushSocket>>,
    ws_url: Url,
    auth_header: Option<String>,
}

impl EventHub {
    pub(crate) fn new(ws_url: Url, auth_header: Option<String>) -> Self {
        Self {
            registry: ListenerRegistry::default(),
            socket: Mutex::new(None),
            ws_url,
            auth_header,
        }
    }

    pub(crate) fn on_event<F>(&self, filter: EventFilter, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.registry.add(filter, listener)
    }

    /// Opens the event channel unless one is already open or connecting.
    ///
    /// Repeated calls leave the existing connection untouched.
    pub(crate) fn connect(&self) {
        let mut slot = self.socket.lock();
        if slot.is_some() {
            return;
        }
        *slot = Some(PushSocket::spawn(
            self.ws_url.clone(),
            self.auth_header.clone(),
            self.registry.clone(),
        ));
    }

    /// Closes the event channel. No-op when not connected.
    ///
    /// Registered listeners are kept and resume receiving events after the
    /// next connect.
    pub(crate) fn disconnect(&self) {
        if let Some(socket) = self.socket.lock().take() {
            socket.shutdown();
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.socket.lock().is_some()
    }

    /// Waits for the next event matching `filter`.
    ///
    /// Opens the event channel if needed. `timeout: None` waits indefinitely;
    /// otherwise the wait settles with [`Error::EventTimeout`] once the bound
    /// elapses. The transient listener is removed on every path, including
    /// cancellation of the returned future.
    pub(crate) async fn wait_for_event(
        &self,
        filter: EventFilter,
        timeout: Option<Duration>,
    ) -> Result<Event> {
        self.connect();

        let (event_tx, event_rx) = oneshot::channel();
        // Single-fire latch: the first matching event takes the sender,
        // every later one becomes a no-op.
        let latch = Mutex::new(Some(event_tx));
        let transient = TransientListener(self.registry.add(filter.clone(), move |event| {
            if let Some(event_tx) = latch.lock().take() {
                let _ = event_tx.send(event.clone());
            }
        }));

        let received = match timeout {
            Some(bound) => match tokio::time::timeout(bound, event_rx).await {
                Ok(result) => result.ok(),
                Err(_) => None,
            },
            None => event_rx.await.ok(),
        };

        // Disarm the listener before settling so a late event has nowhere
        // to land.
        drop(transient);

        received.ok_or_else(|| Error::EventTimeout {
            event_type: filter.to_string(),
        })
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("ws_url", &self.ws_url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Removes the wait's listener when the wait settles or is cancelled.
struct TransientListener(Subscription);

impl Drop for TransientListener {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

/// Decodes one inbound frame and dispatches it.
///
/// Frames that are not valid JSON, or not `{Type, Data}` shaped, are dropped
/// without reaching any listener.
pub(crate) fn decode_frame(registry: &ListenerRegistry, raw: &str) {
    match serde_json::from_str::<Event>(raw) {
        Ok(event) => registry.dispatch(&event),
        Err(error) => debug!(%error, "discarding unparseable event frame"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::events::EventType;

    // Nothing listens on the discard port; the socket task just retries in
    // the background, which is exactly the "channel not yet up" situation.
    fn hub() -> EventHub {
        EventHub::new(Url::parse("ws://127.0.0.1:9/api/events").unwrap(), None)
    }

    fn new_event() -> Event {
        Event {
            kind: EventType::New,
            data: json!({"ID": "x"}),
        }
    }

    #[tokio::test]
    async fn wait_times_out_with_the_requested_type_in_the_message() {
        let hub = hub();
        let started = tokio::time::Instant::now();
        let result = hub
            .wait_for_event(EventFilter::from("new"), Some(Duration::from_millis(50)))
            .await;

        let error = result.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Timeout waiting for event of type \"new\""
        );
        assert!(started.elapsed() >= Duration::from_millis(50));
        // The transient listener must be gone after the timeout.
        assert!(!hub.registry.has_listeners(&EventFilter::from("new")));
        hub.disconnect();
    }

    #[tokio::test]
    async fn wait_resolves_with_the_dispatched_event() {
        let hub = hub();
        let registry = hub.registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            registry.dispatch(&new_event());
        });

        let event = hub
            .wait_for_event(EventFilter::from("new"), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(event, new_event());
        assert!(!hub.registry.has_listeners(&EventFilter::from("new")));
        hub.disconnect();
    }

    #[tokio::test]
    async fn wait_without_timeout_only_settles_on_a_matching_event() {
        let hub = hub();
        let registry = hub.registry.clone();

        let wait = hub.wait_for_event(EventFilter::from("new"), None);
        tokio::pin!(wait);

        // Well past any default bound: the wait must still be pending.
        let raced = tokio::time::timeout(Duration::from_millis(200), &mut wait).await;
        assert!(raced.is_err());

        registry.dispatch(&new_event());
        let event = wait.await.unwrap();
        assert_eq!(event.kind, EventType::New);
        hub.disconnect();
    }

    #[tokio::test]
    async fn wait_ignores_events_of_other_types() {
        let hub = hub();
        let registry = hub.registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            registry.dispatch(&Event {
                kind: EventType::Stats,
                data: json!({}),
            });
        });

        let result = hub
            .wait_for_event(EventFilter::from("new"), Some(Duration::from_millis(100)))
            .await;
        assert!(result.is_err());
        hub.disconnect();
    }

    #[tokio::test]
    async fn wildcard_wait_accepts_any_type() {
        let hub = hub();
        let registry = hub.registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            registry.dispatch(&Event {
                kind: EventType::Other("purge".to_string()),
                data: json!(null),
            });
        });

        let event = hub
            .wait_for_event(EventFilter::Any, Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(event.kind, EventType::Other("purge".to_string()));
        hub.disconnect();
    }

    #[tokio::test]
    async fn only_the_first_matching_event_settles_the_wait() {
        let hub = hub();
        let registry = hub.registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            registry.dispatch(&Event {
                kind: EventType::New,
                data: json!({"ID": "first"}),
            });
            registry.dispatch(&Event {
                kind: EventType::New,
                data: json!({"ID": "second"}),
            });
        });

        let event = hub
            .wait_for_event(EventFilter::from("new"), Some(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(event.data, json!({"ID": "first"}));
        hub.disconnect();
    }

    #[tokio::test]
    async fn cancelled_wait_removes_its_listener() {
        let hub = hub();
        {
            let wait = hub.wait_for_event(EventFilter::from("new"), None);
            tokio::pin!(wait);
            let _ = tokio::time::timeout(Duration::from_millis(20), &mut wait).await;
        }
        assert!(!hub.registry.has_listeners(&EventFilter::from("new")));
        hub.disconnect();
    }

    #[tokio::test]
    async fn connect_and_disconnect_are_idempotent() {
        let hub = hub();
        assert!(!hub.is_connected());

        hub.connect();
        hub.connect();
        assert!(hub.is_connected());

        hub.disconnect();
        hub.disconnect();
        assert!(!hub.is_connected());
    }

    #[test]
    fn malformed_frames_reach_no_listener() {
        let registry = ListenerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        registry.add(EventFilter::Any, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        decode_frame(&registry, "not json at all");
        decode_frame(&registry, r#"{"Data": 1}"#);
        decode_frame(&registry, r#""just a string""#);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        decode_frame(&registry, r#"{"Type":"new","Data":{"ID":"x"}}"#);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
