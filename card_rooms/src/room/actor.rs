//! Room actor implementation with async message handling.

use std::{future, sync::Arc};
use tokio::{
    sync::{mpsc, oneshot},
    time::{self, Instant},
};

use super::messages::{RoomMessage, RoomMetadata};
use crate::{
    game::{
        ActionOutcome, GameAction, LeaveOutcome, Room, RoomError, RoomId, RoomStatus, RoomView,
        SeatIndex, UserId, constants::SEAT_COUNT,
    },
    net::{Broadcaster, DeliveryError, ServerEvent},
};

/// Room actor handle for sending messages
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    room_id: RoomId,
}

impl RoomHandle {
    pub fn new(sender: mpsc::Sender<RoomMessage>, room_id: RoomId) -> Self {
        Self { sender, room_id }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Whether the actor has stopped reading its inbox
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the room. A room whose actor has exited is
    /// reported as not found.
    pub async fn send(&self, message: RoomMessage) -> Result<(), RoomError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| RoomError::RoomNotFound)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomMessage,
    ) -> Result<T, RoomError> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| RoomError::RoomNotFound)
    }

    pub async fn join(
        &self,
        user_id: UserId,
        display_name: String,
    ) -> Result<SeatIndex, RoomError> {
        self.request(|response| RoomMessage::Join {
            user_id,
            display_name,
            response,
        })
        .await?
    }

    pub async fn start(&self, user_id: UserId) -> Result<(), RoomError> {
        self.request(|response| RoomMessage::Start { user_id, response })
            .await?
    }

    pub async fn act(
        &self,
        user_id: UserId,
        action: GameAction,
    ) -> Result<ActionOutcome, RoomError> {
        self.request(|response| RoomMessage::Act {
            user_id,
            action,
            response,
        })
        .await?
    }

    pub async fn leave(&self, user_id: UserId) -> Result<LeaveOutcome, RoomError> {
        self.request(|response| RoomMessage::Leave { user_id, response })
            .await?
    }

    pub async fn view(&self, user_id: Option<UserId>) -> Result<RoomView, RoomError> {
        self.request(|response| RoomMessage::GetState { user_id, response })
            .await
    }

    pub async fn metadata(&self) -> Result<RoomMetadata, RoomError> {
        self.request(|response| RoomMessage::GetMetadata { response })
            .await
    }
}

/// Room actor owning a single room.
///
/// Messages are handled one at a time and every handler runs to completion
/// without awaiting, so no two actions on a room interleave and every
/// broadcast sees a settled room.
pub struct RoomActor {
    room: Room,

    inbox: mpsc::Receiver<RoomMessage>,

    broadcaster: Arc<dyn Broadcaster>,

    /// When the current seat gets auto-played, if a turn timeout is set
    deadline: Option<Instant>,

    /// Set once the last seat has left
    is_closed: bool,

    /// Lobby entry last pushed to every session, while the room is waiting
    listed: Option<RoomMetadata>,
}

impl RoomActor {
    /// Create a new room actor and the handle used to reach it
    pub fn new(room: Room, broadcaster: Arc<dyn Broadcaster>) -> (Self, RoomHandle) {
        let (sender, inbox) = mpsc::channel(room.config().inbox_capacity.max(1));
        let handle = RoomHandle::new(sender, room.id());

        let actor = Self {
            room,
            inbox,
            broadcaster,
            deadline: None,
            is_closed: false,
            listed: None,
        };

        (actor, handle)
    }

    /// Run the room actor event loop
    pub async fn run(mut self) {
        log::info!("Room {} ({}) starting", self.room.id(), self.room.game_type());
        self.announce_listing();
        self.broadcast_state();

        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    let Some(message) = message else {
                        break;
                    };
                    self.handle_message(message);

                    if self.is_closed {
                        break;
                    }
                }

                () = sleep_until(self.deadline) => {
                    self.handle_turn_timeout();
                }
            }
        }

        log::info!("Room {} closed", self.room.id());
    }

    fn handle_message(&mut self, message: RoomMessage) {
        match message {
            RoomMessage::Join {
                user_id,
                display_name,
                response,
            } => {
                let result = self.room.join(user_id, display_name);
                if let Ok(seat) = result {
                    log::debug!("Room {}: user {} took seat {}", self.room.id(), user_id, seat);
                    self.publish();
                }
                let _ = response.send(result);
            }

            RoomMessage::Start { user_id, response } => {
                let result = self.room.start_game(user_id);
                if result.is_ok() {
                    log::info!("Room {}: game started by user {}", self.room.id(), user_id);
                    self.publish();
                }
                let _ = response.send(result);
            }

            RoomMessage::Act {
                user_id,
                action,
                response,
            } => {
                let result = self.apply(user_id, action);
                let _ = response.send(result);
            }

            RoomMessage::Leave { user_id, response } => {
                let result = self.room.leave(user_id);
                match result {
                    Ok(LeaveOutcome::Closed) => {
                        log::debug!("Room {}: last seat left", self.room.id());
                        self.unlist();
                        self.is_closed = true;
                        self.inbox.close();
                    }
                    Ok(LeaveOutcome::Remaining) => {
                        log::debug!("Room {}: user {} left", self.room.id(), user_id);
                        self.publish();
                    }
                    Err(_) => {}
                }
                let _ = response.send(result);
            }

            RoomMessage::GetState { user_id, response } => {
                let view = match user_id {
                    Some(user_id) => self.room.view_for(user_id),
                    None => self.room.public_view(),
                };
                let _ = response.send(view);
            }

            RoomMessage::GetMetadata { response } => {
                let _ = response.send(self.metadata());
            }
        }
    }

    fn apply(&mut self, user_id: UserId, action: GameAction) -> Result<ActionOutcome, RoomError> {
        let description = action.to_string();
        let outcome = self.room.submit_action(user_id, action)?;

        log::debug!("Room {}: user {} {}", self.room.id(), user_id, description);
        if let Some(winner) = outcome.game_winner {
            log::info!("Room {}: game won by seat {}", self.room.id(), winner);
        }

        self.publish();
        Ok(outcome)
    }

    /// Broadcast the settled room; a finished round is shown once before
    /// the next one is dealt.
    fn publish(&mut self) {
        self.announce_listing();
        self.broadcast_state();

        if self.room.status() == RoomStatus::RoundOver {
            match self.room.advance_round() {
                Ok(()) => {
                    log::debug!(
                        "Room {}: round {} dealt",
                        self.room.id(),
                        self.room.round_number()
                    );
                    self.broadcast_state();
                }
                Err(e) => log::error!("Room {}: failed to deal next round: {}", self.room.id(), e),
            }
        }

        self.reset_deadline();
    }

    /// Keep the lobby in step: waiting rooms are (re)listed whenever their
    /// metadata changes, anything else is unlisted once.
    fn announce_listing(&mut self) {
        let metadata = self.metadata();
        if metadata.status != RoomStatus::Waiting {
            self.unlist();
            return;
        }
        if self.listed.as_ref() == Some(&metadata) {
            return;
        }

        self.listed = Some(metadata.clone());
        let reached = self
            .broadcaster
            .send_all(ServerEvent::RoomListed { room: metadata });
        log::debug!("Room {}: listed to {} session(s)", self.room.id(), reached);
    }

    fn unlist(&mut self) {
        if self.listed.take().is_none() {
            return;
        }
        let reached = self.broadcaster.send_all(ServerEvent::RoomUnlisted {
            room_id: self.room.id(),
        });
        log::debug!("Room {}: unlisted for {} session(s)", self.room.id(), reached);
    }

    fn reset_deadline(&mut self) {
        self.deadline = match self.room.config().turn_timeout {
            Some(timeout) if self.room.status().is_active() => Some(Instant::now() + timeout),
            _ => None,
        };
    }

    fn handle_turn_timeout(&mut self) {
        self.deadline = None;

        let Some((user_id, action)) = self.room.auto_action() else {
            return;
        };
        log::info!(
            "Room {}: user {} timed out, auto-acting",
            self.room.id(),
            user_id
        );
        if let Err(e) = self.apply(user_id, action) {
            log::warn!("Room {}: auto action rejected: {}", self.room.id(), e);
        }
    }

    /// Push every seated player their own view of the room
    fn broadcast_state(&self) {
        for user_id in self.room.player_ids() {
            let event = ServerEvent::RoomStateUpdate(self.room.view_for(user_id));
            match self.broadcaster.send(user_id, event) {
                Ok(()) => {}
                Err(DeliveryError::NotConnected) => {
                    log::debug!("Room {}: user {} not connected", self.room.id(), user_id);
                }
                Err(e) => {
                    log::warn!(
                        "Room {}: update to user {} dropped: {}",
                        self.room.id(),
                        user_id,
                        e
                    );
                }
            }
        }
    }

    fn metadata(&self) -> RoomMetadata {
        RoomMetadata {
            id: self.room.id(),
            game_type: self.room.game_type(),
            host_user_id: self.room.host(),
            player_count: self.room.players().len(),
            max_players: SEAT_COUNT,
            status: self.room.status(),
            round_number: self.room.round_number(),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{game::GameType, room::RoomConfig};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(UserId, ServerEvent)>>,
        lobby: Mutex<Vec<ServerEvent>>,
    }

    impl Recorder {
        fn updates_for(&self, user_id: UserId) -> Vec<RoomView> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(to, event)| match event {
                    ServerEvent::RoomStateUpdate(view) if *to == user_id => Some(view.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Broadcaster for Recorder {
        fn send(&self, user_id: UserId, event: ServerEvent) -> Result<(), DeliveryError> {
            self.events.lock().unwrap().push((user_id, event));
            Ok(())
        }

        fn send_all(&self, event: ServerEvent) -> usize {
            self.lobby.lock().unwrap().push(event);
            1
        }
    }

    fn spawn_room(config: RoomConfig) -> (RoomHandle, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let room = Room::new(Uuid::new_v4(), GameType::TrickBiddingGame, 1, "alice", config);
        let (actor, handle) = RoomActor::new(room, recorder.clone());
        tokio::spawn(actor.run());
        (handle, recorder)
    }

    #[tokio::test]
    async fn test_join_broadcasts_to_every_seat() {
        let (handle, recorder) = spawn_room(RoomConfig::default());

        handle.join(2, "bob".to_string()).await.unwrap();
        let view = handle.view(Some(2)).await.unwrap();

        assert_eq!(view.players.len(), 2);
        assert_eq!(recorder.updates_for(1).last().unwrap().players.len(), 2);
        assert_eq!(recorder.updates_for(2).len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_action_does_not_broadcast() {
        let (handle, recorder) = spawn_room(RoomConfig::default());
        handle.metadata().await.unwrap();
        let before = recorder.events.lock().unwrap().len();

        assert_eq!(handle.start(1).await, Err(RoomError::NotEnoughPlayers));
        assert_eq!(
            handle.join(1, "alice".to_string()).await,
            Err(RoomError::AlreadyJoined)
        );
        // Round-trip through the inbox so both rejections were handled.
        handle.metadata().await.unwrap();

        assert_eq!(recorder.events.lock().unwrap().len(), before);
    }

    #[tokio::test]
    async fn test_lobby_follows_room_status() {
        let (handle, recorder) = spawn_room(RoomConfig::default());
        for (user, name) in [(2, "bob"), (3, "carol"), (4, "dave")] {
            handle.join(user, name.to_string()).await.unwrap();
        }
        // Rejected actions change nothing in the lobby
        assert_eq!(handle.start(2).await, Err(RoomError::NotHost));
        handle.start(1).await.unwrap();
        handle.leave(4).await.unwrap();

        let lobby = recorder.lobby.lock().unwrap().clone();
        let counts: Vec<_> = lobby
            .iter()
            .map(|event| match event {
                ServerEvent::RoomListed { room } => Some(room.player_count),
                _ => None,
            })
            .collect();
        // Listed at 1..=4 seats, unlisted on start, relisted after the reset
        assert_eq!(
            counts,
            vec![Some(1), Some(2), Some(3), Some(4), None, Some(3)]
        );
        assert_eq!(
            lobby[4],
            ServerEvent::RoomUnlisted {
                room_id: handle.room_id()
            }
        );
    }

    #[tokio::test]
    async fn test_last_leave_stops_actor() {
        let (handle, recorder) = spawn_room(RoomConfig::default());

        assert_eq!(handle.leave(1).await, Ok(LeaveOutcome::Closed));
        assert_eq!(
            recorder.lobby.lock().unwrap().last(),
            Some(&ServerEvent::RoomUnlisted {
                room_id: handle.room_id()
            })
        );
        assert_eq!(handle.metadata().await, Err(RoomError::RoomNotFound));
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_timeout_auto_bids() {
        let config = RoomConfig {
            turn_timeout: Some(std::time::Duration::from_secs(5)),
            ..Default::default()
        };
        let (handle, _) = spawn_room(config);
        for (user, name) in [(2, "bob"), (3, "carol"), (4, "dave")] {
            handle.join(user, name.to_string()).await.unwrap();
        }
        handle.start(1).await.unwrap();

        let view = handle.view(None).await.unwrap();
        assert_eq!(view.current_turn, Some(1));

        time::sleep(std::time::Duration::from_secs(6)).await;

        let view = handle.view(None).await.unwrap();
        assert_eq!(view.current_turn, Some(2));
        match view.variant {
            crate::game::VariantView::TrickBiddingGame { bids, .. } => {
                assert_eq!(bids[1], Some(0));
            }
            other => panic!("unexpected variant {other:?}"),
        }
    }
}
