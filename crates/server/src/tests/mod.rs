//! Test helpers: in-memory store, channel-backed fake connections.

pub mod conversation_tests;
pub mod receipts_tests;

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use huddle_shared::{Channel, MessagePayload, ServerEvent, WsEnvelope};

use crate::registry::ConnectionHandle;
use crate::state::AppState;
use crate::store::MemoryStore;

pub type EventReceiver = mpsc::UnboundedReceiver<WsEnvelope<ServerEvent>>;

pub fn memory_state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (AppState::new(store.clone()), store)
}

/// Register a fake connection for `user` and keep the receiving end.
pub async fn connect(state: &AppState, user: &str) -> (Uuid, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(tx);
    let conn_id = handle.conn_id;
    state.registry.register(user, handle).await;
    (conn_id, rx)
}

/// Everything delivered to the connection so far. Dispatch is synchronous
/// within the awaited operation, so no waiting is involved.
pub fn drain(rx: &mut EventReceiver) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        events.push(envelope.payload);
    }
    events
}

pub fn text(content: &str) -> MessagePayload {
    MessagePayload::Text {
        content: content.to_string(),
    }
}

pub fn file(url: &str) -> MessagePayload {
    MessagePayload::File {
        file_url: url.to_string(),
    }
}

/// Stand-in for the administrative layer that owns channel lifecycle.
pub async fn seed_channel(store: &MemoryStore, id: &str, members: &[&str]) {
    let now = Utc::now();
    store
        .insert_channel(Channel {
            id: id.to_string(),
            name: id.to_string(),
            admin: members.first().map(|m| m.to_string()).unwrap_or_default(),
            members: members.iter().map(|m| m.to_string()).collect(),
            message_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        })
        .await;
}
