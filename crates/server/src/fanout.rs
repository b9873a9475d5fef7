//! Fan-out dispatcher: one logical event to a computed set of currently
//! connected targets, at most once each, fire-and-forget.

use std::collections::HashSet;
use std::sync::Arc;

use huddle_shared::{ServerEvent, UserId, WsEnvelope};

use crate::error::CoreError;
use crate::registry::ConnectionRegistry;
use crate::store::Store;

/// Addressing mode for one dispatch call.
#[derive(Debug, Clone)]
pub enum Targeting {
    ToUser(UserId),
    ToPair(UserId, UserId),
    /// Membership is resolved live at delivery time; later membership
    /// changes do not retroactively apply.
    ToChannel(String),
    Broadcast,
}

pub struct FanoutDispatcher {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn Store>,
}

impl FanoutDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, store: Arc<dyn Store>) -> Self {
        Self { registry, store }
    }

    pub async fn deliver(&self, event: ServerEvent, targeting: Targeting) -> Result<(), CoreError> {
        self.deliver_except(event, targeting, None).await
    }

    /// Deliver to every currently-connected target except `excluded`.
    /// Targets with no live connection are silently dropped; a send into a
    /// closing connection is ignored. Iteration order is the targeting's
    /// insertion order (pair order, membership list order), so events from
    /// one logical operation arrive in one stable order.
    pub async fn deliver_except(
        &self,
        event: ServerEvent,
        targeting: Targeting,
        excluded: Option<&str>,
    ) -> Result<(), CoreError> {
        let recipients: Vec<UserId> = match &targeting {
            Targeting::ToUser(id) => vec![id.clone()],
            Targeting::ToPair(a, b) => vec![a.clone(), b.clone()],
            Targeting::ToChannel(channel_id) => self
                .store
                .channel_members(channel_id)
                .await?
                .unwrap_or_default(),
            Targeting::Broadcast => self.registry.online_users().await,
        };

        let envelope = WsEnvelope::new(event);
        let mut seen: HashSet<&str> = HashSet::new();
        for user in &recipients {
            if excluded == Some(user.as_str()) || !seen.insert(user.as_str()) {
                continue;
            }
            if let Some(sender) = self.registry.lookup(user).await {
                let _ = sender.send(envelope.clone());
            }
        }
        Ok(())
    }
}
