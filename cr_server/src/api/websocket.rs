//! WebSocket handler for live room play.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws?token=<jwt_token>`
//! 2. Server resolves the token to an identity and upgrades the connection
//! 3. Server opens a session and spawns a send task that drains the
//!    session queue into the socket
//! 4. Incoming text frames are parsed as `ClientAction`s and routed through
//!    the room manager
//! 5. On disconnect the session closes; when it was the user's last one,
//!    the user leaves every room they occupied
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws?token=eyJhbGc...');
//!
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === "room_state_update") {
//!     render(data);
//!   }
//! };
//!
//! ws.send(JSON.stringify({ type: "make_bid", room_id: "...", bid: 3 }));
//! ```

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use card_rooms::{ClientAction, RoomError, ServerEvent, auth::Identity};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Deserialize;

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    token: String,
}

/// Upgrade an HTTP connection to a game session.
///
/// # Query Parameters
///
/// - `token`: JWT access token for authentication
///
/// # Response
///
/// On success, upgrades connection to WebSocket protocol (101 Switching Protocols).
/// On authentication failure, returns `401 Unauthorized`. The token is
/// checked before the upgrade headers.
pub async fn websocket_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let identity = match state.identity.resolve(&query.token) {
        Ok(identity) => identity,
        Err(e) => {
            debug!("Rejected WebSocket upgrade: {}", e);
            return (StatusCode::UNAUTHORIZED, e.client_message()).into_response();
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, identity, state))
}

/// Drive one established connection until either side closes it
async fn handle_socket(socket: WebSocket, identity: Identity, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let user_id = identity.user_id;
    let (session_id, mut events) = state.sessions.connect(identity.clone());

    info!("WebSocket connected: user={}, session={}", user_id, session_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = receiver.next() => {
                let Some(msg) = msg else { break };
                match msg {
                    Ok(Message::Text(text)) => {
                        handle_text(&state, &identity, session_id, text.as_str()).await;
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!("WebSocket error for user {}: {}", user_id, e);
                        break;
                    }
                }
            }
            _ = &mut send_task => break,
        }
    }

    send_task.abort();

    if let Some(end) = state.sessions.disconnect(session_id)
        && end.remaining_sessions == 0
    {
        let left = state.room_manager.leave_all(user_id).await;
        if left > 0 {
            info!("User {} disconnected and left {} room(s)", user_id, left);
        }
    }

    info!("WebSocket disconnected: user={}, session={}", user_id, session_id);
}

async fn handle_text(
    state: &AppState,
    identity: &Identity,
    session_id: card_rooms::session::SessionId,
    text: &str,
) {
    match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => {
            debug!("User {} sent {:?}", identity.user_id, action);
            // Rejections are delivered to the user by the manager
            let _ = state.room_manager.dispatch(identity, action).await;
        }
        Err(e) => {
            warn!(
                "Failed to parse client message from user {}: {}",
                identity.user_id, e
            );
            let rejection = ServerEvent::rejected(None, RoomError::InvalidAction);
            if let Err(e) = state.sessions.send_to_session(session_id, rejection) {
                debug!("Could not deliver parse rejection: {}", e);
            }
        }
    }
}
