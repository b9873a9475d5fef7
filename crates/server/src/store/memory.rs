//! In-process store used by the test suite and the `memory` backend mode.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use huddle_shared::{Channel, ChatMessage, Container, Conversation, MessagePayload, UserId};

use crate::conversations::PairKey;
use crate::store::{MessagePatch, Store, StoreError};

#[derive(Default)]
struct MemoryState {
    messages: HashMap<String, ChatMessage>,
    conversations: HashMap<String, Conversation>,
    // canonical pair storage key -> conversation id
    conversations_by_key: HashMap<String, String>,
    channels: HashMap<String, Channel>,
}

/// All maps behind one lock, so get-or-create is atomic and per-message
/// writes are serialized.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a channel. Channel lifecycle belongs to the administrative
    /// layer, so this is an inherent method rather than part of the trait.
    #[cfg(test)]
    pub async fn insert_channel(&self, channel: Channel) {
        let mut state = self.state.lock().await;
        state.channels.insert(channel.id.clone(), channel);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.messages.insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn get_message(&self, id: &str) -> Result<Option<ChatMessage>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.messages.get(id).cloned())
    }

    async fn update_message(
        &self,
        id: &str,
        patch: MessagePatch,
    ) -> Result<Option<ChatMessage>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(message) = state.messages.get_mut(id) else {
            return Ok(None);
        };
        if let Some(content) = patch.content {
            if let MessagePayload::Text { content: existing } = &mut message.payload {
                *existing = content;
            }
        }
        if let Some(edited) = patch.edited {
            message.edited = edited;
        }
        if let Some(timestamp) = patch.timestamp {
            message.timestamp = timestamp;
        }
        if let Some(reactions) = patch.reactions {
            message.reactions = reactions;
        }
        if let Some(read_by) = patch.read_by {
            message.read_by = read_by;
        }
        Ok(Some(message.clone()))
    }

    async fn delete_message(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.messages.remove(id);
        Ok(())
    }

    async fn find_or_create_conversation(
        &self,
        key: &PairKey,
    ) -> Result<Conversation, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(id) = state.conversations_by_key.get(&key.storage_key()) {
            let conversation = state
                .conversations
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::Backend("dangling conversation index".to_string()))?;
            return Ok(conversation);
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4().to_string(),
            participants: key.users(),
            message_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state
            .conversations_by_key
            .insert(key.storage_key(), conversation.id.clone());
        state
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(&self, key: &PairKey) -> Result<Option<Conversation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .conversations_by_key
            .get(&key.storage_key())
            .and_then(|id| state.conversations.get(id))
            .cloned())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.conversations.get(id).cloned())
    }

    async fn append_to_container(
        &self,
        container: &Container,
        message_id: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        match container {
            Container::Conversation { conversation_id } => {
                let conversation = state
                    .conversations
                    .get_mut(conversation_id)
                    .ok_or_else(|| StoreError::Backend("unknown conversation".to_string()))?;
                conversation.message_ids.push(message_id.to_string());
                conversation.updated_at = now;
            }
            Container::Channel { channel_id } => {
                let channel = state
                    .channels
                    .get_mut(channel_id)
                    .ok_or_else(|| StoreError::Backend("unknown channel".to_string()))?;
                channel.message_ids.push(message_id.to_string());
                channel.updated_at = now;
            }
        }
        Ok(())
    }

    async fn remove_from_container(
        &self,
        container: &Container,
        message_id: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        match container {
            Container::Conversation { conversation_id } => {
                if let Some(conversation) = state.conversations.get_mut(conversation_id) {
                    conversation.message_ids.retain(|id| id != message_id);
                }
            }
            Container::Channel { channel_id } => {
                if let Some(channel) = state.channels.get_mut(channel_id) {
                    channel.message_ids.retain(|id| id != message_id);
                }
            }
        }
        Ok(())
    }

    async fn channel_members(
        &self,
        channel_id: &str,
    ) -> Result<Option<Vec<UserId>>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .channels
            .get(channel_id)
            .map(|channel| channel.members.clone()))
    }

    async fn conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let state = self.state.lock().await;
        let Some(conversation) = state.conversations.get(conversation_id) else {
            return Ok(Vec::new());
        };
        Ok(conversation
            .message_ids
            .iter()
            .filter_map(|id| state.messages.get(id))
            .cloned()
            .collect())
    }

    async fn channel_messages(&self, channel_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let state = self.state.lock().await;
        let Some(channel) = state.channels.get(channel_id) else {
            return Ok(Vec::new());
        };
        Ok(channel
            .message_ids
            .iter()
            .filter_map(|id| state.messages.get(id))
            .cloned()
            .collect())
    }
}
