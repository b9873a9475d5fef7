//! WebSocket transport for real-time messaging.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{StatusCode, Uri},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use huddle_shared::{ChatTarget, ClientEvent, ServerEvent, WsEnvelope};

use crate::error::CoreError;
use crate::fanout::Targeting;
use crate::registry::ConnectionHandle;
use crate::state::AppState;

/// WebSocket upgrade handler. The user identity arrives as a `user_id`
/// query parameter, already validated by the authentication collaborator
/// in front of this core.
pub async fn ws_handler(
    State(state): State<AppState>,
    uri: Uri,
    ws: WebSocketUpgrade,
) -> Result<Response, (StatusCode, String)> {
    let user_id = user_id_from_query(&uri).ok_or((
        StatusCode::UNAUTHORIZED,
        "Missing user_id query parameter".to_string(),
    ))?;

    tracing::info!("WebSocket connection accepted for user: {}", user_id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, state)))
}

fn user_id_from_query(uri: &Uri) -> Option<String> {
    uri.query()?.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "user_id" && !value.is_empty()).then(|| value.to_string())
    })
}

/// Drive one authenticated connection: register it, exchange presence,
/// process inbound events until the peer goes away, then clean up.
async fn handle_socket(socket: WebSocket, user_id: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (forward_tx, mut forward_rx) = mpsc::unbounded_channel::<WsEnvelope<ServerEvent>>();
    let handle = ConnectionHandle::new(forward_tx.clone());
    let conn_id = handle.conn_id;

    // Last writer wins: a previous connection for this user is evicted here.
    state.registry.register(&user_id, handle).await;

    // The newcomer gets the online snapshot; everyone else hears about them.
    let snapshot = state.registry.online_users().await;
    let _ = forward_tx.send(WsEnvelope::new(ServerEvent::OnlineUsers {
        user_ids: snapshot,
    }));
    if let Err(e) = state
        .dispatcher
        .deliver_except(
            ServerEvent::UserOnline {
                user_id: user_id.clone(),
            },
            Targeting::Broadcast,
            Some(&user_id),
        )
        .await
    {
        tracing::warn!("presence announce failed for {}: {}", user_id, e);
    }

    // Forward dispatched events to the WebSocket.
    let send_task = tokio::spawn(async move {
        while let Some(event) = forward_rx.recv().await {
            let json = serde_json::to_string(&event).unwrap_or_default();
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Main receive loop. Failures stay scoped to the single event.
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<WsEnvelope<ClientEvent>>(&text) {
                    Ok(envelope) => handle_client_event(envelope.payload, &user_id, &state).await,
                    Err(e) => {
                        tracing::debug!("discarding malformed event from {}: {}", user_id, e);
                    }
                }
            }
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    send_task.abort();

    // No-op when a newer connection for the same user superseded this one.
    if let Some(offline_user) = state.registry.unregister(conn_id).await {
        if let Err(e) = state
            .dispatcher
            .deliver(
                ServerEvent::UserOffline {
                    user_id: offline_user.clone(),
                },
                Targeting::Broadcast,
            )
            .await
        {
            tracing::warn!("presence announce failed for {}: {}", offline_user, e);
        }
        tracing::info!("User {} went offline", offline_user);
    }
}

async fn handle_client_event(event: ClientEvent, user_id: &str, state: &AppState) {
    let outcome = match event {
        ClientEvent::SendMessage { recipient, payload } => state
            .lifecycle
            .send_direct(user_id, &recipient, payload)
            .await
            .map(|_| ()),
        ClientEvent::SendChannelMessage {
            channel_id,
            payload,
        } => state
            .lifecycle
            .send_channel(user_id, &channel_id, payload)
            .await
            .map(|_| ()),
        ClientEvent::EditMessage {
            message_id,
            new_content,
        } => state
            .lifecycle
            .edit(user_id, &message_id, new_content)
            .await
            .map(|_| ()),
        ClientEvent::DeleteMessage { message_id } => {
            state.lifecycle.delete(user_id, &message_id).await
        }
        ClientEvent::AddReaction { message_id, emoji } => state
            .lifecycle
            .react(user_id, &message_id, emoji)
            .await
            .map(|_| ()),
        ClientEvent::ForwardMessage {
            message_id,
            recipients,
        } => {
            state
                .lifecycle
                .forward(user_id, &message_id, &recipients)
                .await
        }
        ClientEvent::MarkMessagesAsRead {
            message_ids,
            container,
        } => {
            state
                .receipts
                .mark_read(user_id, &message_ids, &container)
                .await
        }
        ClientEvent::Typing { target } => relay_typing(user_id, target, true, state).await,
        ClientEvent::StopTyping { target } => relay_typing(user_id, target, false, state).await,
        ClientEvent::JoinChannel { channel_id } => {
            // Channel fan-out resolves store membership; nothing to track.
            tracing::debug!("User {} joined channel: {}", user_id, channel_id);
            Ok(())
        }
        ClientEvent::LeaveChannel { channel_id } => {
            tracing::debug!("User {} left channel: {}", user_id, channel_id);
            Ok(())
        }
    };

    if let Err(e) = outcome {
        match e {
            CoreError::StoreUnavailable(_) => {
                tracing::warn!("event from {} aborted: {}", user_id, e);
            }
            _ => tracing::debug!("event from {} rejected: {}", user_id, e),
        }
    }
}

/// Typing indicators go to the contact, or to the channel membership with
/// the typist excluded. Ephemeral: nothing is stored.
async fn relay_typing(
    sender_id: &str,
    target: ChatTarget,
    typing: bool,
    state: &AppState,
) -> Result<(), CoreError> {
    let targeting = match &target {
        ChatTarget::Contact { id } => Targeting::ToUser(id.clone()),
        ChatTarget::Channel { id } => Targeting::ToChannel(id.clone()),
    };
    let event = if typing {
        ServerEvent::Typing {
            sender_id: sender_id.to_string(),
            target,
        }
    } else {
        ServerEvent::StopTyping {
            sender_id: sender_id.to_string(),
            target,
        }
    };
    state
        .dispatcher
        .deliver_except(event, targeting, Some(sender_id))
        .await
}
