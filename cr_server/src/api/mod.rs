//! HTTP/WebSocket API for the card room server.
//!
//! Gameplay happens over a single WebSocket per connection. A small REST
//! surface exposes health, the room lobby, public room snapshots and presence.
//!
//! # Endpoints
//!
//! - `GET /health` - Server health status
//! - `GET /api/rooms` - Rooms waiting for players
//! - `GET /api/rooms/{room_id}` - Public snapshot of one room
//! - `GET /api/online-users` - Connected users
//! - `GET /ws?token=<jwt>` - Establish a WebSocket session
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use card_rooms::{RoomConfig, RoomManager, SessionTracker, auth::JwtIdentityProvider};
//! use cr_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sessions = Arc::new(SessionTracker::default());
//! let state = AppState {
//!     room_manager: Arc::new(RoomManager::new(sessions.clone(), RoomConfig::default())),
//!     sessions,
//!     identity: Arc::new(JwtIdentityProvider::new("a-secret-that-is-long-enough-to-use!")),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod rooms;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use card_rooms::{RoomManager, SessionTracker, auth::IdentityProvider};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub room_manager: Arc<RoomManager>,
    pub sessions: Arc<SessionTracker>,
    pub identity: Arc<dyn IdentityProvider>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/rooms", get(rooms::list_rooms))
        .route("/api/rooms/{room_id}", get(rooms::get_room))
        .route("/api/online-users", get(rooms::online_users))
        // Authenticates through the `token` query parameter
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint.
///
/// Reports the number of live room actors and open sessions.
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "rooms": { "active_count": 2 },
///   "sessions": 7,
///   "timestamp": "2026-01-15T10:30:00Z"
/// }
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let active_rooms = state.room_manager.active_room_count().await;

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "rooms": {
                "active_count": active_rooms,
            },
            "sessions": state.sessions.session_count(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
