//! Inkboard WebSocket Relay Server
//!
//! Keeps the shared board, relays every inbound envelope to all connected
//! peers (the sender included) and brings late joiners up to date.
//!
//! ## Protocol
//!
//! Every frame is a JSON envelope:
//! ```json
//! { "type": "stroke:add", "payload": { "stroke": { ... } } }
//! { "type": "chat:message", "payload": { "user": "ada", "message": "hi" } }
//! ```
//! On connect the server sends `board:sync` and then `chat:sync`.

pub mod board;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod topic;

pub use board::{BoardSnapshot, BoardState};
pub use config::{Args, RelayConfig};
pub use dispatch::{DispatchContext, Dispatched, Dispatcher, Handler};
pub use error::RelayError;
pub use topic::{Frame, Subscription, TopicHub, WHITEBOARD_TOPIC};

use axum::{
    Json, Router,
    extract::{State, ws::WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Name reported by the health check.
pub const SERVICE_NAME: &str = "inkboard-relay";

/// Shared application state.
pub struct RelayState {
    pub config: RelayConfig,
    pub board: BoardState,
    pub hub: TopicHub,
    pub dispatcher: Dispatcher,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            board: BoardState::new(),
            hub: TopicHub::new(config.channel_capacity),
            dispatcher: Dispatcher::whiteboard(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    service: &'static str,
    timestamp: String,
}

/// Build the HTTP router.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "Inkboard Relay Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> Json<HealthStatus> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    Json(HealthStatus {
        status: "healthy",
        service: SERVICE_NAME,
        timestamp: timestamp.to_string(),
    })
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    ws.max_message_size(state.config.max_message_bytes)
        .on_upgrade(move |socket| session::handle_socket(socket, state))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install shutdown handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Serve on an already bound listener until ctrl-c.
pub async fn serve(listener: TcpListener, state: Arc<RelayState>) -> Result<(), RelayError> {
    let addr = listener.local_addr()?;
    info!("Inkboard relay server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Bind the configured address and serve.
pub async fn run(config: RelayConfig) -> Result<(), RelayError> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    serve(listener, Arc::new(RelayState::new(config))).await
}
