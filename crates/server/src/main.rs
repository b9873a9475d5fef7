//! Huddle Server
//!
//! Real-time chat backend: presence tracking, canonical conversation
//! resolution and message-lifecycle fan-out over WebSockets, with
//! pull-based history over HTTP.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversations;
mod error;
mod fanout;
mod lifecycle;
mod receipts;
mod registry;
mod routes;
mod state;
mod store;
mod ws;

#[cfg(test)]
mod tests;

use config::{ServerConfig, StoreBackend};
use state::AppState;
use store::{AuroraStore, MemoryStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "huddle_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Aurora => Arc::new(AuroraStore::open(&config.db_path)?),
        StoreBackend::Memory => {
            tracing::warn!("running with the volatile in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    let state = AppState::new(store);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // WebSocket
        .route("/api/ws", get(ws::ws_handler))
        // History (pull-based catch-up for reconnecting clients)
        .route(
            "/api/messages/{user_id}/{peer_id}",
            get(routes::messages::direct_history),
        )
        .route(
            "/api/channels/{channel_id}/messages",
            get(routes::messages::channel_history),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    tracing::info!("Starting server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
