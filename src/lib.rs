//! # Mailpit Client
//! Asynchronous client for the [Mailpit](https://mailpit.axllent.org/) email testing server, covering the HTTP API and the real-time WebSocket event channel from Rust using [`Client`] and [`ClientBuilder`].
//!
//! ## Audience and uses
//! For Rust developers who assert on email delivery in integration tests, demos, or automation scripts against a Mailpit instance: send or trigger messages, list and search the mailbox ([`MessageList`](models::MessageList)), inspect message content and attachments, and react to server push events ([`Event`]) with persistent listeners ([`Client::on_event`]) or one-shot waits ([`Client::wait_for_event`]).
//!
//! ## Runtime requirements
//! Async-only; run inside a Tokio (v1) runtime. HTTP calls use `reqwest` and the event channel uses `tokio-tungstenite`, so ensure the chosen Tokio features (`rt-multi-thread` or `current_thread`) are available in your application.
//!
//! ## Out of scope
//! Not an SMTP sender or a general-purpose mail client. It only drives the Mailpit API and inherits that server's behavior; dropped event-channel connections are re-dialed automatically, but REST calls are not retried.
//!
//! ## Errors
//! All REST calls surface transport failures as [`Error::Request`], non-200 statuses as [`Error::Api`], and shape issues as [`Error::Json`]. Waiting for a push event that never arrives yields [`Error::EventTimeout`]. The crate-wide [`Result`] alias wraps these errors.
//!
//! ## Example
//! ```no_run
//! use mailpit_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mailpit_client::Error> {
//!     let client = Client::new("http://localhost:8025")?;
//!
//!     let wait = client.wait_for_event("new");
//!     // ... deliver a message to Mailpit via SMTP or the send API ...
//!     let event = wait.await?;
//!     println!("Received: {}", event.data);
//!
//!     let messages = client.list_messages(0, 50).await?;
//!     for msg in messages.messages {
//!         println!("From: {}, Subject: {}", msg.from.address, msg.subject);
//!     }
//!
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod events;
pub mod models;

pub use client::{Client, ClientBuilder};
pub use error::Error;
pub use events::{Event, EventFilter, EventType, Subscription};
pub use models::{SearchParams, SendAddress, SendRequest};

/// Result type alias for Mailpit operations.
///
/// This is equivalent to `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
