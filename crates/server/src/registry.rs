//! Connection registry: one live transport connection per user identity.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use huddle_shared::{ServerEvent, UserId, WsEnvelope};

/// Fire-and-forget channel into one connection's outbound writer task.
pub type EventSender = mpsc::UnboundedSender<WsEnvelope<ServerEvent>>;

/// A live transport session bound to one user.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub conn_id: Uuid,
    pub sender: EventSender,
}

impl ConnectionHandle {
    pub fn new(sender: EventSender) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            sender,
        }
    }
}

/// The only truly shared in-process mutable state: user → live connection.
/// One guarded map; every operation is a single atomic read-modify-write.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handle` as the user's sole connection. Last writer wins: a
    /// prior handle for the same user is evicted silently, never merged.
    pub async fn register(&self, user_id: &str, handle: ConnectionHandle) {
        let mut connections = self.connections.write().await;
        connections.insert(user_id.to_string(), handle);
    }

    /// Remove the connection identified by `conn_id`, returning the user
    /// that went offline. A handle that was already superseded by a newer
    /// connection for the same user is a no-op: it must not evict the
    /// newer one.
    pub async fn unregister(&self, conn_id: Uuid) -> Option<UserId> {
        let mut connections = self.connections.write().await;
        let owner = connections
            .iter()
            .find_map(|(user, handle)| (handle.conn_id == conn_id).then(|| user.clone()))?;
        connections.remove(&owner);
        Some(owner)
    }

    pub async fn lookup(&self, user_id: &str) -> Option<EventSender> {
        let connections = self.connections.read().await;
        connections.get(user_id).map(|handle| handle.sender.clone())
    }

    /// Snapshot of the online set, sorted for a stable wire order.
    pub async fn online_users(&self) -> Vec<UserId> {
        let connections = self.connections.read().await;
        let mut users: Vec<UserId> = connections.keys().cloned().collect();
        users.sort();
        users
    }
}
