//! JSON messages exchanged with clients.

use serde::{Deserialize, Serialize};

use crate::{
    game::{Card, Combination, RoomError, RoomId, RoomView},
    room::RoomMetadata,
};

/// Everything a client can ask for
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientAction {
    /// Open a new room with the sender as host. The game type is parsed
    /// leniently so unknown names can be rejected with a proper error.
    CreateRoom { game_type: String },
    JoinRoom { room_id: RoomId },
    StartGame { room_id: RoomId },
    MakeBid { room_id: RoomId, bid: u8 },
    PlayCard { room_id: RoomId, card: Card },
    SubmitCombination {
        room_id: RoomId,
        combination: Combination,
    },
    LeaveRoom { room_id: RoomId },
}

impl ClientAction {
    /// Target room, if the action addresses an existing one
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { room_id }
            | Self::StartGame { room_id }
            | Self::MakeBid { room_id, .. }
            | Self::PlayCard { room_id, .. }
            | Self::SubmitCombination { room_id, .. }
            | Self::LeaveRoom { room_id } => Some(*room_id),
        }
    }
}

/// Everything the server pushes to a client
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Fresh snapshot of a room, personalised for the recipient
    RoomStateUpdate(RoomView),

    /// The sender's last action was refused. Room state is unchanged.
    ActionRejected {
        room_id: Option<RoomId>,
        kind: RoomError,
        reason: String,
    },

    /// A room the sender asked for now exists
    RoomCreated { room_id: RoomId },

    /// The room is gone for this recipient
    RoomClosed { room_id: RoomId },

    /// Lobby push to every session: a waiting room appeared or changed
    RoomListed { room: RoomMetadata },

    /// Lobby push to every session: the room started or closed
    RoomUnlisted { room_id: RoomId },
}

impl ServerEvent {
    pub fn rejected(room_id: Option<RoomId>, kind: RoomError) -> Self {
        Self::ActionRejected {
            room_id,
            kind,
            reason: kind.to_string(),
        }
    }
}
