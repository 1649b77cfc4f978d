//! Read-only room and presence endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use card_rooms::{RoomError, RoomId, RoomView, room::RoomMetadata, session::OnlineUser};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// List rooms that are still waiting for players.
///
/// # Response
///
/// Returns `200 OK` with an array of room summaries:
/// ```json
/// [
///   {
///     "id": "0b5e1c8e-2f1e-4a53-9d43-4a3b9c1f3e55",
///     "game_type": "trick_bidding_game",
///     "host_user_id": 1,
///     "player_count": 2,
///     "max_players": 4,
///     "status": "waiting",
///     "round_number": 0
///   }
/// ]
/// ```
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomMetadata>> {
    Json(state.room_manager.list_rooms().await)
}

/// Public snapshot of one room. No hand contents are included.
///
/// # Errors
///
/// - `404 Not Found`: No live room with this id
pub async fn get_room(
    State(state): State<AppState>,
    Path(room_id): Path<RoomId>,
) -> Result<Json<RoomView>, (StatusCode, Json<ErrorResponse>)> {
    match state.room_manager.get_snapshot(room_id, None).await {
        Ok(view) => Ok(Json(view)),
        Err(RoomError::RoomNotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Room {} not found", room_id),
            }),
        )),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )),
    }
}

/// Users with at least one open WebSocket session
pub async fn online_users(State(state): State<AppState>) -> Json<Vec<OnlineUser>> {
    Json(state.sessions.online_users())
}
