//! Mailpit async client implementation.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::events::hub::DEFAULT_EVENT_TIMEOUT;
use crate::events::{Event, EventFilter, EventHub, Subscription};
use crate::models::{
    AttachmentData, ChaosTriggers, HtmlCheck, Info, LinkCheck, MessageHeaders, MessageList,
    MessageSummary, ReadStatusRequest, RelayRecipients, SearchParams, SendConfirmation,
    SendRequest, SetChaosTriggersRequest, SetTagsRequest, SpamAssassinCheck, UiConfiguration,
};
use crate::{Error, Result};

/// Async client for the Mailpit API.
///
/// One instance covers both the REST endpoints and the real-time event
/// channel. Use [`Client::new`] for defaults or [`Client::builder`] for
/// custom settings like basic authentication and request timeouts.
#[derive(Debug)]
pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    auth: Option<(String, String)>,
    events: EventHub,
}

impl Client {
    /// Create a builder for configuring the client.
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(base_url)
    }

    /// Create a new Mailpit client for the given base URL.
    ///
    /// No network request is made; the server is first contacted by the API
    /// calls themselves.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailpit_client::Client;
    /// # fn main() -> Result<(), mailpit_client::Error> {
    /// let client = Client::new("http://localhost:8025")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        ClientBuilder::new(base_url).build()
    }

    // ------------------------------------------------------------------
    // Instance and configuration
    // ------------------------------------------------------------------

    /// Retrieve information about the Mailpit instance.
    ///
    /// # Returns
    /// Basic runtime information, message totals and latest release version.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailpit_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailpit_client::Error> {
    /// let client = Client::new("http://localhost:8025")?;
    /// let info = client.get_info().await?;
    /// println!("{} messages, version {}", info.messages, info.version);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_info(&self) -> Result<Info> {
        self.fetch_json(self.get(&["api", "v1", "info"])).await
    }

    /// Retrieve the web UI configuration.
    pub async fn get_configuration(&self) -> Result<UiConfiguration> {
        self.fetch_json(self.get(&["api", "v1", "webui"])).await
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Retrieve the summary of a message and mark it as read.
    ///
    /// # Arguments
    /// * `id` - The message database ID, or `latest` for the newest message
    pub async fn get_message_summary(&self, id: &str) -> Result<MessageSummary> {
        self.fetch_json(self.get(&["api", "v1", "message", id]))
            .await
    }

    /// Retrieve the headers of a message, keyed by header name.
    ///
    /// # Arguments
    /// * `id` - The message database ID, or `latest` for the newest message
    pub async fn get_message_headers(&self, id: &str) -> Result<MessageHeaders> {
        self.fetch_json(self.get(&["api", "v1", "message", id, "headers"]))
            .await
    }

    /// Retrieve a specific attachment from a message.
    ///
    /// # Arguments
    /// * `id` - The message database ID, or `latest`
    /// * `part_id` - The attachment part ID
    ///
    /// # Examples
    /// ```no_run
    /// # use mailpit_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailpit_client::Error> {
    /// let client = Client::new("http://localhost:8025")?;
    /// let message = client.get_message_summary("latest").await?;
    /// if let Some(attachment) = message.attachments.first() {
    ///     let data = client
    ///         .get_message_attachment(&message.id, &attachment.part_id)
    ///         .await?;
    ///     println!("{} bytes of {}", data.data.len(), data.content_type);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get_message_attachment(&self, id: &str, part_id: &str) -> Result<AttachmentData> {
        self.fetch_bytes(self.get(&["api", "v1", "message", id, "part", part_id]))
            .await
    }

    /// Generate a cropped 180x120 JPEG thumbnail of an image attachment.
    ///
    /// If the attachment is not an image a blank image is returned.
    pub async fn get_attachment_thumbnail(&self, id: &str, part_id: &str) -> Result<AttachmentData> {
        self.fetch_bytes(self.get(&["api", "v1", "message", id, "part", part_id, "thumb"]))
            .await
    }

    /// Retrieve the full message source as plain text.
    pub async fn get_message_source(&self, id: &str) -> Result<String> {
        self.fetch_text(self.get(&["api", "v1", "message", id, "raw"]))
            .await
    }

    /// Release a message via the pre-configured external SMTP server.
    ///
    /// Only enabled if message relaying has been configured on the server.
    ///
    /// # Arguments
    /// * `id` - The message database ID, or `latest`
    /// * `to` - Email addresses to relay the message to
    pub async fn release_message(&self, id: &str, to: &[String]) -> Result<String> {
        let body = RelayRecipients { to: to.to_vec() };
        self.fetch_text(
            self.request(Method::POST, &["api", "v1", "message", id, "release"])
                .json(&body),
        )
        .await
    }

    /// Send a message through the server.
    ///
    /// # Returns
    /// The database ID of the stored message.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailpit_client::{Client, SendAddress, SendRequest};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailpit_client::Error> {
    /// let client = Client::new("http://localhost:8025")?;
    /// let confirmation = client
    ///     .send_message(&SendRequest {
    ///         from: SendAddress::named("sender@example.test", "Sender"),
    ///         to: vec![SendAddress::new("recipient@example.test")],
    ///         subject: Some("Test email".to_string()),
    ///         text: Some("Hello from mailpit-client".to_string()),
    ///         attachments: None,
    ///         bcc: None,
    ///         cc: None,
    ///         html: None,
    ///         headers: None,
    ///         reply_to: None,
    ///         tags: None,
    ///     })
    ///     .await?;
    /// println!("stored as {}", confirmation.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send_message(&self, message: &SendRequest) -> Result<SendConfirmation> {
        self.fetch_json(self.request(Method::POST, &["api", "v1", "send"]).json(message))
            .await
    }

    /// Retrieve a page of message summaries, newest first.
    ///
    /// # Arguments
    /// * `start` - The pagination offset
    /// * `limit` - The number of messages to retrieve
    pub async fn list_messages(&self, start: u64, limit: u64) -> Result<MessageList> {
        self.fetch_json(
            self.get(&["api", "v1", "messages"])
                .query(&[("start", start), ("limit", limit)]),
        )
        .await
    }

    /// Set the read status of messages.
    ///
    /// Select messages with `ids` **or** `search` in the request; with
    /// neither set, all messages are updated. The optional `tz` only applies
    /// to `before:` and `after:` search filters.
    pub async fn set_read_status(
        &self,
        request: &ReadStatusRequest,
        tz: Option<&str>,
    ) -> Result<String> {
        let mut builder = self
            .request(Method::PUT, &["api", "v1", "messages"])
            .json(request);
        if let Some(tz) = tz {
            builder = builder.query(&[("tz", tz)]);
        }
        self.fetch_text(builder).await
    }

    /// Delete individual or all messages.
    ///
    /// # Arguments
    /// * `ids` - Message database IDs to delete; `None` deletes all messages
    pub async fn delete_messages(&self, ids: Option<Vec<String>>) -> Result<String> {
        let mut builder = self.request(Method::DELETE, &["api", "v1", "messages"]);
        if let Some(ids) = ids {
            builder = builder.json(&json!({ "IDs": ids }));
        }
        self.fetch_text(builder).await
    }

    /// Retrieve messages matching a search, sorted by received date descending.
    pub async fn search_messages(&self, params: &SearchParams) -> Result<MessageList> {
        self.fetch_json(self.get(&["api", "v1", "search"]).query(params))
            .await
    }

    /// Delete all messages matching a search.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailpit_client::{Client, SearchParams};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailpit_client::Error> {
    /// let client = Client::new("http://localhost:8025")?;
    /// client
    ///     .delete_messages_by_search(&SearchParams::query("from:example.test"))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn delete_messages_by_search(&self, params: &SearchParams) -> Result<String> {
        self.fetch_text(
            self.request(Method::DELETE, &["api", "v1", "search"])
                .query(params),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Message checks
    // ------------------------------------------------------------------

    /// Run an HTML compatibility check on a message.
    pub async fn html_check(&self, id: &str) -> Result<HtmlCheck> {
        self.fetch_json(self.get(&["api", "v1", "message", id, "html-check"]))
            .await
    }

    /// Run a link check on a message.
    ///
    /// # Arguments
    /// * `id` - The message database ID, or `latest`
    /// * `follow` - Whether to follow redirects
    pub async fn link_check(&self, id: &str, follow: bool) -> Result<LinkCheck> {
        self.fetch_json(
            self.get(&["api", "v1", "message", id, "link-check"])
                .query(&[("follow", follow)]),
        )
        .await
    }

    /// Run a SpamAssassin check (if enabled on the server) on a message.
    pub async fn spam_assassin_check(&self, id: &str) -> Result<SpamAssassinCheck> {
        self.fetch_json(self.get(&["api", "v1", "message", id, "sa-check"]))
            .await
    }

    // ------------------------------------------------------------------
    // Tags
    // ------------------------------------------------------------------

    /// Retrieve all unique message tags.
    pub async fn get_tags(&self) -> Result<Vec<String>> {
        self.fetch_json(self.get(&["api", "v1", "tags"])).await
    }

    /// Set and remove tags on messages.
    ///
    /// Overwrites any existing tags for the selected message IDs; an empty
    /// or absent tag list removes all tags.
    pub async fn set_tags(&self, request: &SetTagsRequest) -> Result<String> {
        self.fetch_text(self.request(Method::PUT, &["api", "v1", "tags"]).json(request))
            .await
    }

    /// Rename an existing tag.
    pub async fn rename_tag(&self, tag: &str, new_name: &str) -> Result<String> {
        self.fetch_text(
            self.request(Method::PUT, &["api", "v1", "tags", tag])
                .json(&json!({ "Name": new_name })),
        )
        .await
    }

    /// Delete a tag from all messages. Does not delete any messages.
    pub async fn delete_tag(&self, tag: &str) -> Result<String> {
        self.fetch_text(self.request(Method::DELETE, &["api", "v1", "tags", tag]))
            .await
    }

    // ------------------------------------------------------------------
    // Chaos
    // ------------------------------------------------------------------

    /// Retrieve the current Chaos trigger configuration.
    ///
    /// Returns an API error if Chaos is not enabled at runtime.
    pub async fn get_chaos_triggers(&self) -> Result<ChaosTriggers> {
        self.fetch_json(self.get(&["api", "v1", "chaos"])).await
    }

    /// Set and/or reset the Chaos trigger configuration.
    ///
    /// Omitted triggers are reset to 0% probability.
    pub async fn set_chaos_triggers(
        &self,
        triggers: &SetChaosTriggersRequest,
    ) -> Result<ChaosTriggers> {
        self.fetch_json(self.request(Method::PUT, &["api", "v1", "chaos"]).json(triggers))
            .await
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Render the HTML part of a message, for UI integration testing.
    ///
    /// # Arguments
    /// * `id` - The message database ID, or `latest`
    /// * `embed` - Prepare the document for embedding in an iframe
    pub async fn render_message_html(&self, id: &str, embed: bool) -> Result<String> {
        let mut builder = self.get(&["view", &format!("{id}.html")]);
        if embed {
            builder = builder.query(&[("embed", 1)]);
        }
        self.fetch_text(builder).await
    }

    /// Render just the text part of a message.
    pub async fn render_message_text(&self, id: &str) -> Result<String> {
        self.fetch_text(self.get(&["view", &format!("{id}.txt")]))
            .await
    }

    // ------------------------------------------------------------------
    // Real-time events
    // ------------------------------------------------------------------

    /// Register a persistent listener for server push events.
    ///
    /// `filter` is an event type name or `"*"` for every event. The listener
    /// does not force a connection: events start arriving once the channel is
    /// opened by [`connect_websocket`](Client::connect_websocket) or
    /// implicitly by a wait. Subscriptions survive reconnects and explicit
    /// disconnect/connect cycles.
    ///
    /// # Returns
    /// A [`Subscription`] whose [`unsubscribe`](Subscription::unsubscribe)
    /// removes the listener again.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailpit_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailpit_client::Error> {
    /// let client = Client::new("http://localhost:8025")?;
    /// let subscription = client.on_event("*", |event| {
    ///     println!("{}: {}", event.kind, event.data);
    /// });
    /// client.connect_websocket();
    /// // ... exercise the server ...
    /// subscription.unsubscribe();
    /// # Ok(())
    /// # }
    /// ```
    pub fn on_event<F>(&self, filter: impl Into<EventFilter>, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events.on_event(filter.into(), listener)
    }

    /// Wait for the next event matching `filter`, with the default 5 second
    /// timeout.
    ///
    /// Opens the event channel if it is not already open. See
    /// [`wait_for_event_timeout`](Client::wait_for_event_timeout) for a
    /// custom or unbounded wait.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailpit_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), mailpit_client::Error> {
    /// let client = Client::new("http://localhost:8025")?;
    /// let wait = client.wait_for_event("new");
    /// // ... trigger a delivery ...
    /// let event = wait.await?;
    /// println!("new message: {}", event.data);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn wait_for_event(&self, filter: impl Into<EventFilter>) -> Result<Event> {
        self.events
            .wait_for_event(filter.into(), Some(DEFAULT_EVENT_TIMEOUT))
            .await
    }

    /// Wait for the next event matching `filter` with an explicit bound.
    ///
    /// `timeout: None` waits indefinitely: the future only settles when a
    /// matching event arrives. With `Some(bound)`, the wait fails with
    /// [`Error::EventTimeout`] once the bound elapses. Either way the
    /// transient listener is removed when the wait settles.
    pub async fn wait_for_event_timeout(
        &self,
        filter: impl Into<EventFilter>,
        timeout: Option<Duration>,
    ) -> Result<Event> {
        self.events.wait_for_event(filter.into(), timeout).await
    }

    /// Open the WebSocket event channel.
    ///
    /// No-op when already connected; the existing connection is left
    /// untouched. The channel re-dials dropped connections on its own with
    /// exponential backoff. Must be called within a Tokio runtime.
    pub fn connect_websocket(&self) {
        self.events.connect();
    }

    /// Close the WebSocket event channel and stop any reconnection attempts.
    ///
    /// No-op when not connected. Listeners registered with
    /// [`on_event`](Client::on_event) are kept.
    pub fn disconnect(&self) {
        self.events.disconnect();
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    /// Build the URL for an endpoint below the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .expect("base URL validated at construction");
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let mut builder = self.http.request(method, self.endpoint(segments));
        if let Some((username, password)) = &self.auth {
            builder = builder.basic_auth(username, Some(password));
        }
        builder
    }

    fn get(&self, segments: &[&str]) -> RequestBuilder {
        self.request(Method::GET, segments)
    }

    /// Send the request; any non-200 status becomes [`Error::Api`].
    async fn execute(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let request = builder.build()?;
        let method = request.method().to_string();
        let url = request.url().to_string();

        let response = self.http.execute(request).await?;
        if response.status() != StatusCode::OK {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                method,
                url,
                body,
            });
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.execute(builder).await?.text().await?;
        serde_json::from_str(&body).map_err(Into::into)
    }

    async fn fetch_text(&self, builder: RequestBuilder) -> Result<String> {
        self.execute(builder).await?.text().await.map_err(Into::into)
    }

    async fn fetch_bytes(&self, builder: RequestBuilder) -> Result<AttachmentData> {
        let response = self.execute(builder).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let data = response.bytes().await?.to_vec();
        Ok(AttachmentData { data, content_type })
    }
}

/// Builder for configuring a Mailpit client.
///
/// Start with [`Client::builder`] to override defaults.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    auth: Option<(String, String)>,
    timeout: Option<Duration>,
    danger_accept_invalid_certs: bool,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    ///
    /// Defaults:
    /// - No authentication
    /// - No request timeout
    /// - `danger_accept_invalid_certs = false`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: None,
            timeout: None,
            danger_accept_invalid_certs: false,
        }
    }

    /// Use HTTP basic authentication for all requests, including the
    /// WebSocket upgrade.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Set a total timeout for each REST request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Accept invalid TLS certificates (default: false).
    pub fn danger_accept_invalid_certs(mut self, value: bool) -> Self {
        self.danger_accept_invalid_certs = value;
        self
    }

    /// Build the client.
    ///
    /// # Examples
    /// ```no_run
    /// # use mailpit_client::Client;
    /// # fn main() -> Result<(), mailpit_client::Error> {
    /// let client = Client::builder("http://localhost:8025")
    ///     .basic_auth("admin", "supersecret")
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(self) -> Result<Client> {
        let base_url =
            Url::parse(&self.base_url).map_err(|error| Error::BaseUrl(error.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::BaseUrl(format!(
                "{} cannot be used as a base URL",
                self.base_url
            )));
        }

        let mut builder = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.danger_accept_invalid_certs);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let auth_header = self.auth.as_ref().map(|(username, password)| {
            format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
        });
        let events = EventHub::new(websocket_url(&base_url), auth_header);

        Ok(Client {
            http,
            base_url,
            auth: self.auth,
            events,
        })
    }
}

/// Derive the event channel URL from the REST base URL.
fn websocket_url(base_url: &Url) -> Url {
    let mut url = base_url.clone();
    let scheme = if base_url.scheme() == "https" {
        "wss"
    } else {
        "ws"
    };
    // http(s) and ws(s) are all "special" schemes, so the change is accepted.
    url.set_scheme(scheme)
        .expect("http(s) to ws(s) is a valid scheme change");
    {
        let mut path = url
            .path_segments_mut()
            .expect("base URL validated at construction");
        path.pop_if_empty();
        path.extend(["api", "events"]);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn websocket_url_swaps_scheme_and_appends_path() {
        let base = Url::parse("http://localhost:8025").unwrap();
        assert_eq!(
            websocket_url(&base).as_str(),
            "ws://localhost:8025/api/events"
        );

        let base = Url::parse("https://mail.example.test/mailpit").unwrap();
        assert_eq!(
            websocket_url(&base).as_str(),
            "wss://mail.example.test/mailpit/api/events"
        );
    }

    #[test]
    fn endpoint_keeps_a_base_path_prefix() {
        let client = Client::new("http://localhost:8025/mailpit").unwrap();
        assert_eq!(
            client.endpoint(&["api", "v1", "info"]).as_str(),
            "http://localhost:8025/mailpit/api/v1/info"
        );
    }

    #[test]
    fn endpoint_percent_encodes_segments() {
        let client = Client::new("http://localhost:8025").unwrap();
        assert_eq!(
            client.endpoint(&["api", "v1", "tags", "Tag One"]).as_str(),
            "http://localhost:8025/api/v1/tags/Tag%20One"
        );
    }

    #[test]
    fn rejects_an_unusable_base_url() {
        assert!(Client::new("not a url").is_err());
        assert!(Client::new("mailto:user@example.test").is_err());
    }
}
