//! Room actor message types.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::game::{
    ActionOutcome, GameAction, GameType, LeaveOutcome, RoomError, RoomId, RoomStatus, RoomView,
    SeatIndex, UserId,
};

/// Messages that can be sent to a RoomActor
#[derive(Debug)]
pub enum RoomMessage {
    /// Take a seat
    Join {
        user_id: UserId,
        display_name: String,
        response: oneshot::Sender<Result<SeatIndex, RoomError>>,
    },

    /// Host starts the game
    Start {
        user_id: UserId,
        response: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Bid, play a card or declare a combination
    Act {
        user_id: UserId,
        action: GameAction,
        response: oneshot::Sender<Result<ActionOutcome, RoomError>>,
    },

    /// Give up a seat
    Leave {
        user_id: UserId,
        response: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },

    /// Snapshot for a user, or a public one
    GetState {
        user_id: Option<UserId>,
        response: oneshot::Sender<RoomView>,
    },

    /// Lobby listing entry
    GetMetadata {
        response: oneshot::Sender<RoomMetadata>,
    },
}

/// Room metadata for discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMetadata {
    pub id: RoomId,
    pub game_type: GameType,
    pub host_user_id: UserId,
    pub player_count: usize,
    pub max_players: usize,
    pub status: RoomStatus,
    pub round_number: u32,
}

impl RoomMetadata {
    /// Whether a newcomer could take a seat right now
    pub fn is_open(&self) -> bool {
        self.status == RoomStatus::Waiting && self.player_count < self.max_players
    }
}
