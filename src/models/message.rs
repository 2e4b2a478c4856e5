//! Message models shared by the session client, realtime channel, and TUI.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier of a rendered message.
///
/// An optimistically echoed message carries the client-generated correlation
/// id until the server confirms it; the confirmation upgrades it in place to
/// the server-assigned id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageId {
    /// Provisional: client correlation id, not yet confirmed.
    Local(Uuid),
    /// Authoritative server-assigned id.
    Server(i64),
}

/// Delivery state of a rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Optimistically rendered, awaiting server confirmation.
    Pending,
    /// Our own send, confirmed by the server.
    Confirmed,
    /// Inbound message from another user.
    Received,
}

/// File carried by a non-text message, for display purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub size: u64,
}

/// A single message in the active chat.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub delivery: Delivery,
    pub attachment: Option<Attachment>,
}

impl ChatMessage {
    /// Whether this message is our own optimistic echo for `client_id`.
    pub fn matches_correlation(&self, client_id: Uuid) -> bool {
        self.delivery == Delivery::Pending && self.id == MessageId::Local(client_id)
    }
}

/// A file descriptor returned by `POST /api/upload_files`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    pub url: String,
}
