//! Message lifecycle: send, forward, edit, delete, react.
//!
//! Each operation is one bounded sequence of store mutation followed by
//! fan-out; per message id the store serializes overlapping writes
//! (last write wins), and a failure aborts the operation without fan-out.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use huddle_shared::{
    ChatMessage, ChatTarget, Container, MessagePayload, Reaction, ServerEvent, UserId,
};

use crate::conversations::ConversationResolver;
use crate::error::CoreError;
use crate::fanout::{FanoutDispatcher, Targeting};
use crate::store::{MessagePatch, Store};

pub struct MessageLifecycle {
    store: Arc<dyn Store>,
    resolver: ConversationResolver,
    dispatcher: Arc<FanoutDispatcher>,
}

impl MessageLifecycle {
    pub fn new(
        store: Arc<dyn Store>,
        resolver: ConversationResolver,
        dispatcher: Arc<FanoutDispatcher>,
    ) -> Self {
        Self {
            store,
            resolver,
            dispatcher,
        }
    }

    /// Send a direct message. Resolves the pair's canonical conversation
    /// (creating it on first contact), persists the message with
    /// `read_by = {sender}`, appends it to the conversation and fans the
    /// full view out to both sides.
    pub async fn send_direct(
        &self,
        sender: &str,
        recipient: &str,
        payload: MessagePayload,
    ) -> Result<ChatMessage, CoreError> {
        self.create_direct(sender, recipient, payload, false).await
    }

    /// Send a channel message: persists, appends to the channel's message
    /// list and fans out to the membership as read at delivery time.
    pub async fn send_channel(
        &self,
        sender: &str,
        channel_id: &str,
        payload: MessagePayload,
    ) -> Result<ChatMessage, CoreError> {
        self.create_channel(sender, channel_id, payload, false).await
    }

    /// Forward an existing message to a list of contacts and channels. Each
    /// recipient gets a fresh message carrying the original payload with the
    /// forwarded flag set; recipients are processed in list order and the
    /// first failure aborts the remainder.
    pub async fn forward(
        &self,
        sender: &str,
        message_id: &str,
        recipients: &[ChatTarget],
    ) -> Result<(), CoreError> {
        let original = self
            .store
            .get_message(message_id)
            .await?
            .ok_or(CoreError::NotFound)?;

        for recipient in recipients {
            match recipient {
                ChatTarget::Contact { id } => {
                    self.create_direct(sender, id, original.payload.clone(), true)
                        .await?;
                }
                ChatTarget::Channel { id } => {
                    self.create_channel(sender, id, original.payload.clone(), true)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Edit a text message's content. Only the original sender may edit,
    /// and only text payloads are editable. Re-stamps the timestamp and
    /// fans the updated view out to the container's participants.
    pub async fn edit(
        &self,
        editor: &str,
        message_id: &str,
        new_content: String,
    ) -> Result<ChatMessage, CoreError> {
        if new_content.trim().is_empty() {
            return Err(CoreError::Validation("empty replacement content".to_string()));
        }

        let message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or(CoreError::NotFound)?;
        if message.sender != editor {
            return Err(CoreError::Forbidden);
        }
        if matches!(message.payload, MessagePayload::File { .. }) {
            return Err(CoreError::InvalidOperation(
                "only text messages can be edited".to_string(),
            ));
        }

        let patch = MessagePatch {
            content: Some(new_content),
            edited: Some(true),
            timestamp: Some(Utc::now()),
            ..MessagePatch::default()
        };
        let updated = self
            .store
            .update_message(message_id, patch)
            .await?
            .ok_or(CoreError::NotFound)?;

        let targeting = self.container_targeting(&updated.container).await?;
        self.dispatcher
            .deliver(
                ServerEvent::MessageEdited {
                    message: updated.clone(),
                },
                targeting,
            )
            .await?;
        Ok(updated)
    }

    /// Delete a message. Only the original sender may delete. Removes the
    /// container reference, announces the deletion with the container
    /// identity and kind, then discards the entity.
    pub async fn delete(&self, actor: &str, message_id: &str) -> Result<(), CoreError> {
        let message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or(CoreError::NotFound)?;
        if message.sender != actor {
            return Err(CoreError::Forbidden);
        }

        self.store
            .remove_from_container(&message.container, message_id)
            .await?;

        let targeting = self.container_targeting(&message.container).await?;
        self.dispatcher
            .deliver(
                ServerEvent::MessageDeleted {
                    message_id: message_id.to_string(),
                    container: message.container.clone(),
                },
                targeting,
            )
            .await?;

        self.store.delete_message(message_id).await?;
        Ok(())
    }

    /// Toggle a reaction. Same emoji from the same user removes it; a
    /// different emoji replaces that user's existing reaction in place;
    /// otherwise a new entry is appended. A user never holds more than one
    /// reaction per message.
    pub async fn react(
        &self,
        user: &str,
        message_id: &str,
        emoji: String,
    ) -> Result<ChatMessage, CoreError> {
        let message = self
            .store
            .get_message(message_id)
            .await?
            .ok_or(CoreError::NotFound)?;

        let mut reactions = message.reactions.clone();
        if let Some(pos) = reactions
            .iter()
            .position(|r| r.user == user && r.emoji == emoji)
        {
            reactions.remove(pos);
        } else if let Some(existing) = reactions.iter_mut().find(|r| r.user == user) {
            existing.emoji = emoji;
        } else {
            reactions.push(Reaction {
                emoji,
                user: user.to_string(),
            });
        }

        let patch = MessagePatch {
            reactions: Some(reactions),
            ..MessagePatch::default()
        };
        let updated = self
            .store
            .update_message(message_id, patch)
            .await?
            .ok_or(CoreError::NotFound)?;

        let targeting = self.container_targeting(&updated.container).await?;
        self.dispatcher
            .deliver(
                ServerEvent::MessageReacted {
                    message: updated.clone(),
                },
                targeting,
            )
            .await?;
        Ok(updated)
    }

    async fn create_direct(
        &self,
        sender: &str,
        recipient: &str,
        payload: MessagePayload,
        forwarded: bool,
    ) -> Result<ChatMessage, CoreError> {
        if recipient.is_empty() {
            return Err(CoreError::Validation("missing recipient".to_string()));
        }
        validate_payload(&payload)?;

        let conversation = self.resolver.resolve(sender, recipient).await?;
        let message = new_message(
            sender,
            Container::Conversation {
                conversation_id: conversation.id.clone(),
            },
            payload,
            forwarded,
        );
        self.store.create_message(&message).await?;
        self.store
            .append_to_container(&message.container, &message.id)
            .await?;

        let [a, b] = conversation.participants;
        self.dispatcher
            .deliver(
                ServerEvent::ReceiveMessage {
                    message: message.clone(),
                },
                Targeting::ToPair(a, b),
            )
            .await?;
        Ok(message)
    }

    async fn create_channel(
        &self,
        sender: &str,
        channel_id: &str,
        payload: MessagePayload,
        forwarded: bool,
    ) -> Result<ChatMessage, CoreError> {
        if channel_id.is_empty() {
            return Err(CoreError::Validation("missing channel id".to_string()));
        }
        validate_payload(&payload)?;

        // Addressing requires the channel to exist before anything persists.
        if self.store.channel_members(channel_id).await?.is_none() {
            return Err(CoreError::NotFound);
        }

        let message = new_message(
            sender,
            Container::Channel {
                channel_id: channel_id.to_string(),
            },
            payload,
            forwarded,
        );
        self.store.create_message(&message).await?;
        self.store
            .append_to_container(&message.container, &message.id)
            .await?;

        self.dispatcher
            .deliver(
                ServerEvent::ReceiveChannelMessage {
                    message: message.clone(),
                },
                Targeting::ToChannel(channel_id.to_string()),
            )
            .await?;
        Ok(message)
    }

    /// Fan-out targeting for a message's container: both conversation
    /// participants, or the channel membership at delivery time.
    async fn container_targeting(&self, container: &Container) -> Result<Targeting, CoreError> {
        match container {
            Container::Conversation { conversation_id } => {
                let conversation = self
                    .store
                    .get_conversation(conversation_id)
                    .await?
                    .ok_or(CoreError::NotFound)?;
                let [a, b] = conversation.participants;
                Ok(Targeting::ToPair(a, b))
            }
            Container::Channel { channel_id } => Ok(Targeting::ToChannel(channel_id.clone())),
        }
    }
}

fn validate_payload(payload: &MessagePayload) -> Result<(), CoreError> {
    let present = match payload {
        MessagePayload::Text { content } => !content.trim().is_empty(),
        MessagePayload::File { file_url } => !file_url.trim().is_empty(),
    };
    if present {
        Ok(())
    } else {
        Err(CoreError::Validation("empty message payload".to_string()))
    }
}

fn new_message(
    sender: &str,
    container: Container,
    payload: MessagePayload,
    forwarded: bool,
) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4().to_string(),
        sender: sender.to_string(),
        container,
        payload,
        timestamp: Utc::now(),
        edited: false,
        forwarded,
        reactions: Vec::new(),
        read_by: vec![UserId::from(sender)],
    }
}
