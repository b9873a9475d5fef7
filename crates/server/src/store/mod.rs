//! Entity-store seam.
//!
//! The core only needs create/read/update/delete by id, list-membership
//! mutation, and one atomic get-or-create; everything else about storage is
//! behind this trait and replaceable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use huddle_shared::{ChatMessage, Container, Conversation, Reaction, UserId};

use crate::conversations::PairKey;

mod aurora;
mod memory;

pub use aurora::AuroraStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend: {0}")]
    Backend(String),
}

/// Partial update applied to a message record. Unset fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub edited: Option<bool>,
    pub timestamp: Option<DateTime<Utc>>,
    pub reactions: Option<Vec<Reaction>>,
    pub read_by: Option<Vec<UserId>>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_message(&self, message: &ChatMessage) -> Result<(), StoreError>;

    async fn get_message(&self, id: &str) -> Result<Option<ChatMessage>, StoreError>;

    /// Apply `patch` to the message, returning the updated record, or `None`
    /// when the message no longer exists. Writes to the same message id are
    /// serialized by the backend; overlapping writers resolve last-write-wins.
    async fn update_message(
        &self,
        id: &str,
        patch: MessagePatch,
    ) -> Result<Option<ChatMessage>, StoreError>;

    async fn delete_message(&self, id: &str) -> Result<(), StoreError>;

    /// Get or atomically create the one conversation for an unordered pair.
    /// Racing callers all receive the same record.
    async fn find_or_create_conversation(&self, key: &PairKey)
        -> Result<Conversation, StoreError>;

    /// Look up a conversation by pair without creating one.
    async fn find_conversation(&self, key: &PairKey) -> Result<Option<Conversation>, StoreError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError>;

    async fn append_to_container(
        &self,
        container: &Container,
        message_id: &str,
    ) -> Result<(), StoreError>;

    async fn remove_from_container(
        &self,
        container: &Container,
        message_id: &str,
    ) -> Result<(), StoreError>;

    /// Current member set of a channel, or `None` for an unknown channel.
    async fn channel_members(&self, channel_id: &str)
        -> Result<Option<Vec<UserId>>, StoreError>;

    /// Messages of a conversation in creation order.
    async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    /// Messages of a channel in creation order.
    async fn channel_messages(&self, channel_id: &str) -> Result<Vec<ChatMessage>, StoreError>;
}
