//! WebSocket wire protocol: the envelope and the inbound/outbound event sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, Container, MessagePayload, UserId};

/// Envelope around every frame in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEnvelope<T> {
    pub id: String,
    #[serde(flatten)]
    pub payload: T,
    pub ts: DateTime<Utc>,
}

impl<T> WsEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            ts: Utc::now(),
        }
    }
}

/// Addressing for events that can go to either a contact or a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatTarget {
    Contact { id: UserId },
    Channel { id: String },
}

/// Events a connected client may emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    #[serde(rename = "send-message")]
    SendMessage {
        recipient: UserId,
        #[serde(flatten)]
        payload: MessagePayload,
    },
    #[serde(rename = "send-channel-message")]
    SendChannelMessage {
        channel_id: String,
        #[serde(flatten)]
        payload: MessagePayload,
    },
    #[serde(rename = "edit-message")]
    EditMessage {
        message_id: String,
        new_content: String,
    },
    #[serde(rename = "delete-message")]
    DeleteMessage { message_id: String },
    #[serde(rename = "add-reaction")]
    AddReaction { message_id: String, emoji: String },
    #[serde(rename = "forward-message")]
    ForwardMessage {
        message_id: String,
        recipients: Vec<ChatTarget>,
    },
    #[serde(rename = "mark-messages-as-read")]
    MarkMessagesAsRead {
        message_ids: Vec<String>,
        container: Container,
    },
    #[serde(rename = "typing")]
    Typing { target: ChatTarget },
    #[serde(rename = "stopTyping")]
    StopTyping { target: ChatTarget },
    #[serde(rename = "join-channel")]
    JoinChannel { channel_id: String },
    #[serde(rename = "leave-channel")]
    LeaveChannel { channel_id: String },
}

/// Events the server pushes to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    #[serde(rename = "receiveMessage")]
    ReceiveMessage { message: ChatMessage },
    #[serde(rename = "receive-channel-message")]
    ReceiveChannelMessage { message: ChatMessage },
    #[serde(rename = "message-edited")]
    MessageEdited { message: ChatMessage },
    #[serde(rename = "message-deleted")]
    MessageDeleted {
        message_id: String,
        container: Container,
    },
    #[serde(rename = "message-reacted")]
    MessageReacted { message: ChatMessage },
    #[serde(rename = "messages-read")]
    MessagesRead {
        message_ids: Vec<String>,
        reader_id: UserId,
        container: Container,
    },
    #[serde(rename = "user online")]
    UserOnline { user_id: UserId },
    #[serde(rename = "user offline")]
    UserOffline { user_id: UserId },
    #[serde(rename = "online users")]
    OnlineUsers { user_ids: Vec<UserId> },
    #[serde(rename = "typing")]
    Typing { sender_id: UserId, target: ChatTarget },
    #[serde(rename = "stopTyping")]
    StopTyping { sender_id: UserId, target: ChatTarget },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_send_message_parses() {
        let raw = r#"{
            "id": "f1",
            "type": "send-message",
            "data": {
                "recipient": "bob",
                "messageType": "text",
                "content": "hi"
            },
            "ts": "2026-01-05T10:00:00Z"
        }"#;
        let envelope: WsEnvelope<ClientEvent> = serde_json::from_str(raw).expect("parse");
        match envelope.payload {
            ClientEvent::SendMessage { recipient, payload } => {
                assert_eq!(recipient, "bob");
                assert_eq!(
                    payload,
                    MessagePayload::Text {
                        content: "hi".to_string()
                    }
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn presence_events_keep_their_legacy_names() {
        let online = serde_json::to_value(ServerEvent::UserOnline {
            user_id: "alice".to_string(),
        })
        .expect("serialize");
        assert_eq!(online["type"], "user online");

        let snapshot = serde_json::to_value(ServerEvent::OnlineUsers {
            user_ids: vec!["alice".to_string()],
        })
        .expect("serialize");
        assert_eq!(snapshot["type"], "online users");
    }

    #[test]
    fn message_view_flattens_container_and_payload() {
        let message = ChatMessage {
            id: "m1".to_string(),
            sender: "alice".to_string(),
            container: Container::Channel {
                channel_id: "general".to_string(),
            },
            payload: MessagePayload::File {
                file_url: "uploads/files/1/a.png".to_string(),
            },
            timestamp: Utc::now(),
            edited: false,
            forwarded: true,
            reactions: vec![],
            read_by: vec!["alice".to_string()],
        };
        let value = serde_json::to_value(&message).expect("serialize");
        assert_eq!(value["kind"], "channel");
        assert_eq!(value["channelId"], "general");
        assert_eq!(value["messageType"], "file");
        assert_eq!(value["fileUrl"], "uploads/files/1/a.png");

        let back: ChatMessage = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, message);
    }
}
