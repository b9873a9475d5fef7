//! Canonical conversation resolution for direct messages.

use std::sync::Arc;

use huddle_shared::{Conversation, UserId};

use crate::error::CoreError;
use crate::store::Store;

/// Order-independent key for a direct-message pair: the two identities in
/// lexicographic order, so (A,B) and (B,A) name the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    lo: String,
    hi: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                lo: a.to_string(),
                hi: b.to_string(),
            }
        } else {
            Self {
                lo: b.to_string(),
                hi: a.to_string(),
            }
        }
    }

    /// Both participants in canonical order.
    pub fn users(&self) -> [UserId; 2] {
        [self.lo.clone(), self.hi.clone()]
    }

    /// Stable storage representation, usable as a unique index value.
    pub fn storage_key(&self) -> String {
        format!("{}|{}", self.lo, self.hi)
    }
}

#[derive(Clone)]
pub struct ConversationResolver {
    store: Arc<dyn Store>,
}

impl ConversationResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// The one conversation owning the pair's shared history, created lazily
    /// on first contact. Concurrent first-contact callers converge on a
    /// single record: creation is idempotent under the store's uniqueness
    /// constraint, so a lost race resolves to the winner's conversation.
    pub async fn resolve(&self, a: &str, b: &str) -> Result<Conversation, CoreError> {
        let key = PairKey::new(a, b);
        Ok(self.store.find_or_create_conversation(&key).await?)
    }
}
