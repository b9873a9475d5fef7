//! Read receipts: a monotonically growing per-message "seen by" set.

use std::sync::Arc;

use huddle_shared::{Container, ServerEvent};

use crate::error::CoreError;
use crate::fanout::{FanoutDispatcher, Targeting};
use crate::store::{MessagePatch, Store};

pub struct ReadReceipts {
    store: Arc<dyn Store>,
    dispatcher: Arc<FanoutDispatcher>,
}

impl ReadReceipts {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<FanoutDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Record that `reader` has seen the given messages, then announce it
    /// once to the container's full participant set. Pure set-union:
    /// repeating the call changes nothing, the set never shrinks, and
    /// already-read or unknown ids are skipped without error. Self-delivery
    /// of the announcement is permitted.
    pub async fn mark_read(
        &self,
        reader: &str,
        message_ids: &[String],
        container: &Container,
    ) -> Result<(), CoreError> {
        for message_id in message_ids {
            let Some(message) = self.store.get_message(message_id).await? else {
                continue;
            };
            if message.is_read_by(reader) {
                continue;
            }
            let mut read_by = message.read_by;
            read_by.push(reader.to_string());
            self.store
                .update_message(
                    message_id,
                    MessagePatch {
                        read_by: Some(read_by),
                        ..MessagePatch::default()
                    },
                )
                .await?;
        }

        let targeting = match container {
            Container::Conversation { conversation_id } => {
                let conversation = self
                    .store
                    .get_conversation(conversation_id)
                    .await?
                    .ok_or(CoreError::NotFound)?;
                let [a, b] = conversation.participants;
                Targeting::ToPair(a, b)
            }
            Container::Channel { channel_id } => Targeting::ToChannel(channel_id.clone()),
        };

        self.dispatcher
            .deliver(
                ServerEvent::MessagesRead {
                    message_ids: message_ids.to_vec(),
                    reader_id: reader.to_string(),
                    container: container.clone(),
                },
                targeting,
            )
            .await
    }
}
