//! Chat data model shared by the server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque stable user identifier, issued by the authentication provider.
pub type UserId = String;

/// The container a message lives in. Exactly one of the two, always.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Container {
    Conversation { conversation_id: String },
    Channel { channel_id: String },
}

impl Container {
    /// Identity of the owning container, regardless of kind.
    pub fn id(&self) -> &str {
        match self {
            Container::Conversation { conversation_id } => conversation_id,
            Container::Channel { channel_id } => channel_id,
        }
    }
}

/// Message body variant. Text content is editable, file references are not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "messageType",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum MessagePayload {
    Text { content: String },
    File { file_url: String },
}

/// One emoji from one user. A user holds at most one reaction per message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub emoji: String,
    pub user: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: UserId,
    #[serde(flatten)]
    pub container: Container,
    #[serde(flatten)]
    pub payload: MessagePayload,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub forwarded: bool,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub read_by: Vec<UserId>,
}

impl ChatMessage {
    pub fn is_read_by(&self, user: &str) -> bool {
        self.read_by.iter().any(|u| u == user)
    }
}

/// The canonical direct-message thread between two users.
///
/// `participants` is always in canonical (sorted) order; the store enforces
/// at most one conversation per unordered pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participants: [UserId; 2],
    pub message_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named multi-member message container. Membership lifecycle is owned by
/// the administrative layer; the core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub admin: UserId,
    pub members: Vec<UserId>,
    pub message_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
