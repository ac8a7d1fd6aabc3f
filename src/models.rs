//! Request and response shapes for the Mailpit REST API.
//!
//! Field names mirror the wire JSON exactly; most of the API uses PascalCase
//! keys, while the message-list envelope uses lowercase keys.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A name and email address as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailAddress {
    pub address: String,
    pub name: String,
}

/// A name and email address for an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendAddress {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SendAddress {
    /// Address without a display name.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: None,
        }
    }

    /// Address with a display name.
    pub fn named(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: Some(name.into()),
        }
    }
}

/// An attachment for an outgoing message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendAttachment {
    /// Base64-encoded file content.
    pub content: String,
    /// Content-ID (cid). When set the file is attached inline.
    #[serde(rename = "ContentID", skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    /// Content type; detected automatically when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub filename: String,
}

/// An attachment as returned by the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    #[serde(rename = "ContentID")]
    pub content_id: String,
    pub content_type: String,
    pub file_name: String,
    /// Part ID used with [`Client::get_message_attachment`](crate::Client::get_message_attachment).
    #[serde(rename = "PartID")]
    pub part_id: String,
    /// Size in bytes.
    pub size: u64,
}

/// Runtime statistics reported by [`Client::get_info`](crate::Client::get_info).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuntimeStats {
    /// Current memory usage in bytes.
    pub memory: u64,
    pub messages_deleted: u64,
    #[serde(rename = "SMTPAccepted")]
    pub smtp_accepted: u64,
    #[serde(rename = "SMTPAcceptedSize")]
    pub smtp_accepted_size: u64,
    #[serde(rename = "SMTPIgnored")]
    pub smtp_ignored: u64,
    #[serde(rename = "SMTPRejected")]
    pub smtp_rejected: u64,
    /// Server uptime in seconds.
    pub uptime: u64,
}

/// Information about the Mailpit instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Info {
    pub database: String,
    pub database_size: u64,
    pub latest_version: String,
    /// Total number of messages in the database.
    pub messages: u64,
    pub runtime_stats: RuntimeStats,
    /// Tag names and the total messages per tag.
    pub tags: HashMap<String, u64>,
    pub unread: u64,
    pub version: String,
}

/// Message relay settings within [`UiConfiguration`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageRelay {
    pub allowed_recipients: String,
    pub blocked_recipients: String,
    pub enabled: bool,
    pub override_from: String,
    pub return_path: String,
    #[serde(rename = "SMTPServer")]
    pub smtp_server: String,
}

/// Web UI configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UiConfiguration {
    pub chaos_enabled: bool,
    pub duplicates_ignored: bool,
    /// Label identifying this Mailpit instance.
    pub label: String,
    pub message_relay: MessageRelay,
    pub spam_assassin: bool,
}

/// List-Unsubscribe header analysis attached to a message summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ListUnsubscribe {
    pub errors: String,
    pub header: String,
    pub header_post: String,
    pub links: Vec<String>,
}

/// Full summary of a single message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageSummary {
    pub attachments: Vec<Attachment>,
    pub bcc: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    /// Message date if set, else date received. ISO format.
    pub date: String,
    pub from: EmailAddress,
    #[serde(rename = "HTML")]
    pub html: String,
    /// Database ID.
    #[serde(rename = "ID")]
    pub id: String,
    pub inline: Vec<Attachment>,
    #[serde(default)]
    pub list_unsubscribe: Option<ListUnsubscribe>,
    #[serde(rename = "MessageID")]
    pub message_id: String,
    pub reply_to: Vec<EmailAddress>,
    pub return_path: String,
    /// Message size in bytes.
    pub size: u64,
    pub subject: String,
    pub tags: Vec<String>,
    pub text: String,
    pub to: Vec<EmailAddress>,
}

/// One entry in a message listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageListItem {
    /// Number of attachments.
    pub attachments: u64,
    pub bcc: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    /// Created time, ISO format.
    pub created: String,
    pub from: EmailAddress,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "MessageID")]
    pub message_id: String,
    pub read: bool,
    pub reply_to: Vec<EmailAddress>,
    pub size: u64,
    /// Up to 250 characters of the message body.
    pub snippet: String,
    pub subject: String,
    pub tags: Vec<String>,
    pub to: Vec<EmailAddress>,
    /// SMTP username the message was accepted with, if any.
    #[serde(default)]
    pub username: Option<String>,
}

/// A page of message summaries, as returned by
/// [`Client::list_messages`](crate::Client::list_messages) and
/// [`Client::search_messages`](crate::Client::search_messages).
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub messages: Vec<MessageListItem>,
    /// Total number of messages matching the current query.
    pub messages_count: u64,
    /// Unread messages matching the current query.
    pub messages_unread: u64,
    /// Pagination offset.
    pub start: u64,
    /// All current tags.
    pub tags: Vec<String>,
    /// Total number of messages in the mailbox.
    pub total: u64,
    /// Total number of unread messages in the mailbox.
    pub unread: u64,
}

/// Message headers keyed by name. Header keys are returned alphabetically.
pub type MessageHeaders = HashMap<String, Vec<String>>;

/// An outgoing message for [`Client::send_message`](crate::Client::send_message).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<SendAttachment>>,
    /// Bcc recipients, email addresses only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<SendAddress>>,
    pub from: SendAddress,
    #[serde(rename = "HTML", skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Vec<SendAddress>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub to: Vec<SendAddress>,
}

/// Confirmation returned by [`Client::send_message`](crate::Client::send_message).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendConfirmation {
    /// Database ID of the stored message.
    #[serde(rename = "ID")]
    pub id: String,
}

/// Binary attachment data together with its MIME type.
#[derive(Debug, Clone)]
pub struct AttachmentData {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Relay recipients for [`Client::release_message`](crate::Client::release_message).
#[derive(Debug, Clone, Serialize)]
pub struct RelayRecipients {
    #[serde(rename = "To")]
    pub to: Vec<String>,
}

/// Weighted totals of an HTML compatibility check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HtmlCheckTotal {
    /// Total number of HTML nodes detected in the message.
    pub nodes: u64,
    pub partial: f64,
    pub supported: f64,
    pub tests: u64,
    pub unsupported: f64,
}

/// Per-platform result within an HTML check warning.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HtmlCheckResult {
    /// Family, eg. Outlook or Mozilla Thunderbird.
    pub family: String,
    pub name: String,
    pub note_number: String,
    /// Platform, eg. ios, android, windows.
    pub platform: String,
    /// One of `yes`, `no` or `partial`.
    pub support: String,
    pub version: String,
}

/// Score object within an HTML check warning.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HtmlCheckScore {
    /// Number of matches in the document.
    pub found: u64,
    pub partial: f64,
    pub supported: f64,
    pub unsupported: f64,
}

/// A single warning from the HTML checker.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HtmlCheckWarning {
    /// `css` or `html`.
    pub category: String,
    pub description: String,
    pub keywords: String,
    pub notes_by_number: HashMap<String, String>,
    pub results: Vec<HtmlCheckResult>,
    pub score: HtmlCheckScore,
    pub slug: String,
    pub tags: Vec<String>,
    pub title: String,
    #[serde(rename = "URL")]
    pub url: String,
}

/// HTML compatibility check results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HtmlCheck {
    /// All platforms tested, mainly for the web UI.
    pub platforms: HashMap<String, Vec<String>>,
    pub total: HtmlCheckTotal,
    pub warnings: Vec<HtmlCheckWarning>,
}

/// A tested link within [`LinkCheck`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CheckedLink {
    /// HTTP status definition.
    pub status: String,
    pub status_code: u16,
    #[serde(rename = "URL")]
    pub url: String,
}

/// Link check results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinkCheck {
    /// Total number of errors.
    pub errors: u64,
    pub links: Vec<CheckedLink>,
}

/// A triggered SpamAssassin rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpamAssassinRule {
    pub description: String,
    pub name: String,
    pub score: f64,
}

/// SpamAssassin check results.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpamAssassinCheck {
    pub errors: u64,
    pub is_spam: bool,
    pub rules: Vec<SpamAssassinRule>,
    /// Total spam score based on triggered rules.
    pub score: f64,
}

/// A single Chaos trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChaosTrigger {
    /// SMTP error code to return, 400-599.
    pub error_code: u16,
    /// Chance of triggering the error, 0-100.
    pub probability: u8,
}

/// The current Chaos trigger configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChaosTriggers {
    pub authentication: ChaosTrigger,
    pub recipient: ChaosTrigger,
    pub sender: ChaosTrigger,
}

/// Triggers for [`Client::set_chaos_triggers`](crate::Client::set_chaos_triggers).
/// Omitted triggers are reset to 0% probability.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetChaosTriggersRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<ChaosTrigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<ChaosTrigger>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<ChaosTrigger>,
}

/// Parameters for [`Client::set_read_status`](crate::Client::set_read_status).
///
/// Provide `ids` **or** `search`; with neither set, all messages are updated.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReadStatusRequest {
    #[serde(rename = "IDs", skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    /// Search filter selecting the messages to update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Parameters for [`Client::set_tags`](crate::Client::set_tags).
///
/// An empty or absent `tags` removes all tags from the selected messages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetTagsRequest {
    #[serde(rename = "IDs")]
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// Search parameters for the `/api/v1/search` endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchParams {
    /// Search query, see the Mailpit search-filter documentation.
    pub query: String,
    /// Pagination offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Limit results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Timezone identifier used only for `before:` and `after:` searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tz: Option<String>,
}

impl SearchParams {
    /// Search with just a query string.
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}
