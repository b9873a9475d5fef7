use std::sync::Arc;

use super::{memory_state, text};
use crate::conversations::{ConversationResolver, PairKey};
use crate::store::{MemoryStore, Store};

#[tokio::test]
async fn resolve_is_order_independent() {
    let store = Arc::new(MemoryStore::new());
    let resolver = ConversationResolver::new(store.clone());

    let forward = resolver.resolve("alice", "bob").await.expect("resolve");
    let backward = resolver.resolve("bob", "alice").await.expect("resolve");

    assert_eq!(forward.id, backward.id);
    assert_eq!(forward.participants, ["alice", "bob"]);
}

#[tokio::test]
async fn concurrent_first_contact_yields_one_conversation() {
    let store = Arc::new(MemoryStore::new());
    let resolver = ConversationResolver::new(store.clone());

    let (left, right) = tokio::join!(
        resolver.resolve("alice", "bob"),
        resolver.resolve("bob", "alice"),
    );
    assert_eq!(left.expect("resolve").id, right.expect("resolve").id);
}

#[tokio::test]
async fn crossing_sends_share_one_conversation() {
    let (state, store) = memory_state();

    let from_alice = state
        .lifecycle
        .send_direct("alice", "bob", text("hi"))
        .await
        .expect("send");
    let from_bob = state
        .lifecycle
        .send_direct("bob", "alice", text("hello"))
        .await
        .expect("send");

    assert_eq!(from_alice.container, from_bob.container);

    let conversation = store
        .find_conversation(&PairKey::new("bob", "alice"))
        .await
        .expect("lookup")
        .expect("created lazily on first send");
    assert_eq!(conversation.message_ids.len(), 2);
}

#[tokio::test]
async fn history_lookup_does_not_create_a_conversation() {
    let store = Arc::new(MemoryStore::new());

    let key = PairKey::new("alice", "bob");
    assert!(store.find_conversation(&key).await.expect("lookup").is_none());
}

#[test]
fn pair_key_normalizes_order() {
    assert_eq!(
        PairKey::new("zoe", "adam").storage_key(),
        PairKey::new("adam", "zoe").storage_key()
    );
    assert_eq!(PairKey::new("adam", "zoe").users(), ["adam", "zoe"]);
}
