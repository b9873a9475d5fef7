//! Message history routes.
//!
//! Offline recipients catch up through these pull-based reads after
//! reconnecting; the fan-out layer itself never queues for them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use huddle_shared::ChatMessage;

use crate::conversations::PairKey;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<ChatMessage>,
}

/// Direct-message history between two users, in creation order. A pair
/// that never exchanged a message has no conversation and yields an empty
/// history rather than creating one.
pub async fn direct_history(
    State(state): State<AppState>,
    Path((user_id, peer_id)): Path<(String, String)>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let key = PairKey::new(&user_id, &peer_id);
    let conversation = state
        .store
        .find_conversation(&key)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?;

    let messages = match conversation {
        Some(conversation) => state
            .store
            .conversation_messages(&conversation.id)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?,
        None => Vec::new(),
    };

    Ok(Json(HistoryResponse { messages }))
}

/// Channel history, in creation order.
pub async fn channel_history(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<Json<HistoryResponse>, (StatusCode, String)> {
    let members = state
        .store
        .channel_members(&channel_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?;

    if members.is_none() {
        return Err((StatusCode::NOT_FOUND, "Channel not found".to_string()));
    }

    let messages = state
        .store
        .channel_messages(&channel_id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Store error: {e}")))?;

    Ok(Json(HistoryResponse { messages }))
}
