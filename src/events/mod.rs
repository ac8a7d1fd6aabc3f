//! Real-time events pushed by the Mailpit server.
//!
//! Mailpit notifies connected clients about mailbox activity over a
//! persistent WebSocket channel. Frames are JSON objects of the shape
//! `{"Type": <string>, "Data": <any>}`; the channel is receive-only.
//!
//! Subscriptions are held in a registry owned by the
//! [`Client`](crate::Client), independent of the connection itself, so they
//! survive reconnects and explicit disconnect/connect cycles.

pub(crate) mod hub;
mod registry;
mod socket;

pub(crate) use hub::EventHub;
pub use registry::Subscription;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The type tag of a server push notification.
///
/// Treated as an open enum: the server may introduce new event types at any
/// time, and those decode as [`EventType::Other`] rather than failing.
/// Conversions normalize known tags, so `Other` never aliases a known type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// A new message was received.
    New,
    /// An existing message changed (read status, tags).
    Update,
    /// One or more messages were deleted.
    Delete,
    /// The mailbox was truncated.
    Truncate,
    /// Mailbox statistics changed.
    Stats,
    /// An event type this client version does not know about.
    Other(String),
}

impl EventType {
    /// The wire tag for this event type.
    pub fn as_str(&self) -> &str {
        match self {
            EventType::New => "new",
            EventType::Update => "update",
            EventType::Delete => "delete",
            EventType::Truncate => "truncate",
            EventType::Stats => "stats",
            EventType::Other(tag) => tag,
        }
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        match tag {
            "new" => EventType::New,
            "update" => EventType::Update,
            "delete" => EventType::Delete,
            "truncate" => EventType::Truncate,
            "stats" => EventType::Stats,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        EventType::from(tag.as_str())
    }
}

impl From<EventType> for String {
    fn from(kind: EventType) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A push notification decoded from the event channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type tag.
    #[serde(rename = "Type")]
    pub kind: EventType,
    /// Type-dependent payload, passed through as-is.
    #[serde(rename = "Data", default)]
    pub data: Value,
}

/// Selects which events a listener receives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventFilter {
    /// Every event, regardless of type.
    Any,
    /// Only events of one type.
    Type(EventType),
}

impl From<EventType> for EventFilter {
    fn from(kind: EventType) -> Self {
        EventFilter::Type(kind)
    }
}

impl From<&str> for EventFilter {
    fn from(tag: &str) -> Self {
        match tag {
            "*" => EventFilter::Any,
            other => EventFilter::Type(EventType::from(other)),
        }
    }
}

impl std::fmt::Display for EventFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventFilter::Any => f.write_str("*"),
            EventFilter::Type(kind) => f.write_str(kind.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_type_normalizes_known_tags() {
        assert_eq!(EventType::from("new"), EventType::New);
        assert_eq!(EventType::from("stats"), EventType::Stats);
        assert_eq!(
            EventType::from("purge"),
            EventType::Other("purge".to_string())
        );
        assert_eq!(EventType::from("truncate").as_str(), "truncate");
    }

    #[test]
    fn decodes_known_event() {
        let event: Event =
            serde_json::from_str(r#"{"Type":"new","Data":{"ID":"x"}}"#).unwrap();
        assert_eq!(event.kind, EventType::New);
        assert_eq!(event.data, json!({"ID": "x"}));
    }

    #[test]
    fn decodes_unknown_event_type() {
        let event: Event =
            serde_json::from_str(r#"{"Type":"purge","Data":42}"#).unwrap();
        assert_eq!(event.kind, EventType::Other("purge".to_string()));
        assert_eq!(event.data, json!(42));
    }

    #[test]
    fn missing_data_defaults_to_null() {
        let event: Event = serde_json::from_str(r#"{"Type":"truncate"}"#).unwrap();
        assert_eq!(event.data, Value::Null);
    }

    #[test]
    fn rejects_frames_without_a_type_tag() {
        assert!(serde_json::from_str::<Event>(r#"{"Data":{}}"#).is_err());
        assert!(serde_json::from_str::<Event>(r#"{"Type":5,"Data":{}}"#).is_err());
        assert!(serde_json::from_str::<Event>(r#"[1,2,3]"#).is_err());
    }

    #[test]
    fn wildcard_filter_from_str() {
        assert_eq!(EventFilter::from("*"), EventFilter::Any);
        assert_eq!(
            EventFilter::from("delete"),
            EventFilter::Type(EventType::Delete)
        );
        assert_eq!(EventFilter::Any.to_string(), "*");
        assert_eq!(EventFilter::from("new").to_string(), "new");
    }
}
