use super::{connect, drain, memory_state, seed_channel, text};
use crate::error::CoreError;
use crate::store::Store;
use huddle_shared::{Container, ServerEvent};

#[tokio::test]
async fn mark_read_is_an_idempotent_union() {
    let (state, _store) = memory_state();

    let sent = state
        .lifecycle
        .send_direct("alice", "bob", text("hi"))
        .await
        .expect("send");
    let ids = vec![sent.id.clone()];

    state
        .receipts
        .mark_read("bob", &ids, &sent.container)
        .await
        .expect("mark read");
    let after_first = state
        .store
        .get_message(&sent.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(after_first.read_by, vec!["alice", "bob"]);

    state
        .receipts
        .mark_read("bob", &ids, &sent.container)
        .await
        .expect("mark read again");
    let after_second = state
        .store
        .get_message(&sent.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(after_second.read_by, after_first.read_by);
}

#[tokio::test]
async fn read_event_reaches_all_participants_including_reader() {
    let (state, _store) = memory_state();
    let (_ca, mut rx_a) = connect(&state, "alice").await;
    let (_cb, mut rx_b) = connect(&state, "bob").await;

    let sent = state
        .lifecycle
        .send_direct("alice", "bob", text("hi"))
        .await
        .expect("send");
    drain(&mut rx_a);
    drain(&mut rx_b);

    let ids = vec![sent.id.clone()];
    state
        .receipts
        .mark_read("bob", &ids, &sent.container)
        .await
        .expect("mark read");

    for rx in [&mut rx_a, &mut rx_b] {
        let events = drain(rx);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ServerEvent::MessagesRead {
                message_ids,
                reader_id,
                container,
            } => {
                assert_eq!(message_ids, &ids);
                assert_eq!(reader_id, "bob");
                assert_eq!(container, &sent.container);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[tokio::test]
async fn channel_read_event_reaches_connected_members() {
    let (state, store) = memory_state();
    seed_channel(&store, "general", &["alice", "bob", "carol"]).await;

    let (_ca, mut rx_a) = connect(&state, "alice").await;
    let (_cc, mut rx_c) = connect(&state, "carol").await;

    let sent = state
        .lifecycle
        .send_channel("alice", "general", text("news"))
        .await
        .expect("send");
    drain(&mut rx_a);
    drain(&mut rx_c);

    state
        .receipts
        .mark_read("carol", &[sent.id.clone()], &sent.container)
        .await
        .expect("mark read");

    assert_eq!(drain(&mut rx_a).len(), 1);
    assert_eq!(drain(&mut rx_c).len(), 1);
}

#[tokio::test]
async fn unknown_message_ids_are_skipped_quietly() {
    let (state, _store) = memory_state();

    let sent = state
        .lifecycle
        .send_direct("alice", "bob", text("hi"))
        .await
        .expect("send");

    let ids = vec![sent.id.clone(), "no-such-id".to_string()];
    state
        .receipts
        .mark_read("bob", &ids, &sent.container)
        .await
        .expect("unknown ids never fail the batch");

    let stored = state
        .store
        .get_message(&sent.id)
        .await
        .expect("get")
        .expect("present");
    assert!(stored.is_read_by("bob"));
}

#[tokio::test]
async fn read_by_never_shrinks() {
    let (state, _store) = memory_state();

    let sent = state
        .lifecycle
        .send_direct("alice", "bob", text("hi"))
        .await
        .expect("send");

    state
        .receipts
        .mark_read("bob", &[sent.id.clone()], &sent.container)
        .await
        .expect("mark read");
    state
        .receipts
        .mark_read("alice", &[sent.id.clone()], &sent.container)
        .await
        .expect("sender re-read is a no-op");

    let stored = state
        .store
        .get_message(&sent.id)
        .await
        .expect("get")
        .expect("present");
    assert_eq!(stored.read_by, vec!["alice", "bob"]);
}

#[tokio::test]
async fn unknown_container_aborts_without_receipt_event() {
    let (state, _store) = memory_state();
    let (_ca, mut rx_a) = connect(&state, "alice").await;

    let result = state
        .receipts
        .mark_read(
            "alice",
            &["m1".to_string()],
            &Container::Conversation {
                conversation_id: "ghost".to_string(),
            },
        )
        .await;

    assert!(matches!(result, Err(CoreError::NotFound)));
    assert!(drain(&mut rx_a).is_empty());
}
