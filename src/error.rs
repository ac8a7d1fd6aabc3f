//! Error types for the Mailpit client.

use thiserror::Error;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be sent or the response body could not be read.
    #[error("Mailpit request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-200 status.
    #[error("Mailpit API error: {status} at {method} {url}: {body}")]
    Api {
        /// HTTP status code returned by the server.
        status: u16,
        /// HTTP method of the failed request.
        method: String,
        /// Full request URL.
        url: String,
        /// Response body, as text.
        body: String,
    },

    /// A response body did not match the expected JSON shape.
    #[error("failed to decode Mailpit response: {0}")]
    Json(#[from] serde_json::Error),

    /// The configured base URL could not be parsed or used as a base.
    #[error("invalid base URL: {0}")]
    BaseUrl(String),

    /// No matching event arrived within the wait bound.
    ///
    /// Raised only by [`Client::wait_for_event`](crate::Client::wait_for_event)
    /// and [`Client::wait_for_event_timeout`](crate::Client::wait_for_event_timeout).
    #[error("Timeout waiting for event of type \"{event_type}\"")]
    EventTimeout {
        /// The event type (or `*`) the caller was waiting for.
        event_type: String,
    },
}
