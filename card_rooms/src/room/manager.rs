//! Room registry for spawning and managing room actors.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    actor::{RoomActor, RoomHandle},
    config::RoomConfig,
    messages::RoomMetadata,
};
use crate::{
    auth::Identity,
    game::{
        ActionOutcome, GameAction, GameType, LeaveOutcome, Room, RoomError, RoomId, RoomStatus,
        RoomView, SeatIndex, UserId,
    },
    net::{Broadcaster, ClientAction, ServerEvent},
};

/// Registry of live rooms.
///
/// Owns the only map from room ids to actor handles plus an index of which
/// rooms each user sits in, used to clean up after a disconnect.
pub struct RoomManager {
    /// Active room handles
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,

    /// Rooms each user is seated in
    memberships: Arc<RwLock<HashMap<UserId, HashSet<RoomId>>>>,

    /// Event sink shared with every room actor
    broadcaster: Arc<dyn Broadcaster>,

    /// Settings new rooms are created with
    config: RoomConfig,
}

impl RoomManager {
    pub fn new(broadcaster: Arc<dyn Broadcaster>, config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            memberships: Arc::new(RwLock::new(HashMap::new())),
            broadcaster,
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Create a room with `host` in seat 0 and spawn its actor
    pub async fn create_room(
        &self,
        host: &Identity,
        game_type: GameType,
    ) -> Result<RoomId, RoomError> {
        let room_id = Uuid::new_v4();
        let room = Room::new(
            room_id,
            game_type,
            host.user_id,
            host.display_name.clone(),
            self.config.clone(),
        );
        let (actor, handle) = RoomActor::new(room, self.broadcaster.clone());

        let mut rooms = self.rooms.write().await;
        rooms.insert(room_id, handle);
        drop(rooms);

        self.add_membership(host.user_id, room_id).await;
        self.notify(host.user_id, ServerEvent::RoomCreated { room_id });

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!(
            "Created room {} ({}) for user {}",
            room_id,
            game_type,
            host.user_id
        );

        Ok(room_id)
    }

    /// Get a room handle
    pub async fn get_room(&self, room_id: RoomId) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(&room_id).cloned()
    }

    async fn handle(&self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        let handle = self
            .get_room(room_id)
            .await
            .ok_or(RoomError::RoomNotFound)?;

        if handle.is_closed() {
            self.remove_room(handle.room_id()).await;
            return Err(RoomError::RoomNotFound);
        }

        Ok(handle)
    }

    async fn remove_room(&self, room_id: RoomId) {
        let mut rooms = self.rooms.write().await;
        if rooms.remove(&room_id).is_some() {
            log::info!("Removed room {}", room_id);
        }
    }

    /// Take a seat. The membership index is held across the actor round
    /// trip so a concurrent `leave_all` sees either no seat or a recorded one.
    pub async fn join_room(
        &self,
        identity: &Identity,
        room_id: RoomId,
    ) -> Result<SeatIndex, RoomError> {
        let handle = self.handle(room_id).await?;

        let mut memberships = self.memberships.write().await;
        let seat = handle
            .join(identity.user_id, identity.display_name.clone())
            .await?;
        memberships
            .entry(identity.user_id)
            .or_default()
            .insert(room_id);

        Ok(seat)
    }

    pub async fn start_game(&self, user_id: UserId, room_id: RoomId) -> Result<(), RoomError> {
        self.handle(room_id).await?.start(user_id).await
    }

    pub async fn submit_action(
        &self,
        user_id: UserId,
        room_id: RoomId,
        action: GameAction,
    ) -> Result<ActionOutcome, RoomError> {
        self.handle(room_id).await?.act(user_id, action).await
    }

    /// Give up a seat. An emptied room is dropped from the registry and the
    /// leaver is told it is gone.
    pub async fn leave_room(
        &self,
        user_id: UserId,
        room_id: RoomId,
    ) -> Result<LeaveOutcome, RoomError> {
        let handle = self.handle(room_id).await?;
        let outcome = handle.leave(user_id).await?;

        self.remove_membership(user_id, room_id).await;
        if outcome == LeaveOutcome::Closed {
            self.remove_room(room_id).await;
            self.notify(user_id, ServerEvent::RoomClosed { room_id });
        }

        Ok(outcome)
    }

    /// Leave every room `user_id` sits in. Returns how many seats were given
    /// up.
    pub async fn leave_all(&self, user_id: UserId) -> usize {
        let room_ids = self.rooms_of(user_id).await;

        let mut left = 0;
        for room_id in room_ids {
            match self.leave_room(user_id, room_id).await {
                Ok(_) => left += 1,
                Err(e) => {
                    log::debug!("User {} leaving room {}: {}", user_id, room_id, e);
                    self.remove_membership(user_id, room_id).await;
                }
            }
        }
        left
    }

    /// Snapshot of a room, filtered for `user_id` or public
    pub async fn get_snapshot(
        &self,
        room_id: RoomId,
        user_id: Option<UserId>,
    ) -> Result<RoomView, RoomError> {
        self.handle(room_id).await?.view(user_id).await
    }

    /// Rooms still waiting for players, ordered by id
    pub async fn list_rooms(&self) -> Vec<RoomMetadata> {
        let handles: Vec<RoomHandle> = {
            let rooms = self.rooms.read().await;
            rooms.values().cloned().collect()
        };

        let mut metadata_list = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(metadata) = handle.metadata().await
                && metadata.status == RoomStatus::Waiting
            {
                metadata_list.push(metadata);
            }
        }
        metadata_list.sort_by_key(|metadata| metadata.id);
        metadata_list
    }

    /// Get active room count
    pub async fn active_room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }

    pub async fn rooms_of(&self, user_id: UserId) -> Vec<RoomId> {
        let memberships = self.memberships.read().await;
        memberships
            .get(&user_id)
            .map(|rooms| rooms.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Route one client action. Failures are reported to the sender as an
    /// `action_rejected` event and returned.
    pub async fn dispatch(&self, identity: &Identity, action: ClientAction) -> Result<(), RoomError> {
        let user_id = identity.user_id;
        let room_id = action.room_id();

        let result = match action {
            ClientAction::CreateRoom { game_type } => match game_type.parse::<GameType>() {
                Ok(game_type) => self.create_room(identity, game_type).await.map(drop),
                Err(e) => Err(e),
            },
            ClientAction::JoinRoom { room_id } => self.join_room(identity, room_id).await.map(drop),
            ClientAction::StartGame { room_id } => self.start_game(user_id, room_id).await,
            ClientAction::MakeBid { room_id, bid } => self
                .submit_action(user_id, room_id, GameAction::Bid(bid))
                .await
                .map(drop),
            ClientAction::PlayCard { room_id, card } => self
                .submit_action(user_id, room_id, GameAction::PlayCard(card))
                .await
                .map(drop),
            ClientAction::SubmitCombination {
                room_id,
                combination,
            } => self
                .submit_action(user_id, room_id, GameAction::SubmitCombination(combination))
                .await
                .map(drop),
            ClientAction::LeaveRoom { room_id } => {
                self.leave_room(user_id, room_id).await.map(drop)
            }
        };

        if let Err(kind) = result {
            log::debug!("Rejected action from user {}: {}", user_id, kind);
            self.notify(user_id, ServerEvent::rejected(room_id, kind));
        }
        result
    }

    fn notify(&self, user_id: UserId, event: ServerEvent) {
        if let Err(e) = self.broadcaster.send(user_id, event) {
            log::debug!("Event to user {} not delivered: {}", user_id, e);
        }
    }

    async fn add_membership(&self, user_id: UserId, room_id: RoomId) {
        let mut memberships = self.memberships.write().await;
        memberships.entry(user_id).or_default().insert(room_id);
    }

    async fn remove_membership(&self, user_id: UserId, room_id: RoomId) {
        let mut memberships = self.memberships.write().await;
        if let Some(rooms) = memberships.get_mut(&user_id) {
            rooms.remove(&room_id);
            if rooms.is_empty() {
                memberships.remove(&user_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::DeliveryError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(UserId, ServerEvent)>>,
    }

    impl Broadcaster for Recorder {
        fn send(&self, user_id: UserId, event: ServerEvent) -> Result<(), DeliveryError> {
            self.events.lock().unwrap().push((user_id, event));
            Ok(())
        }

        fn send_all(&self, _event: ServerEvent) -> usize {
            0
        }
    }

    fn manager() -> (RoomManager, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (
            RoomManager::new(recorder.clone(), RoomConfig::default()),
            recorder,
        )
    }

    #[tokio::test]
    async fn test_create_and_join() {
        let (manager, recorder) = manager();
        let alice = Identity::new(1, "alice");
        let room_id = manager
            .create_room(&alice, GameType::PointsGame)
            .await
            .unwrap();

        assert!(
            recorder
                .events
                .lock()
                .unwrap()
                .contains(&(1, ServerEvent::RoomCreated { room_id }))
        );
        assert_eq!(manager.join_room(&Identity::new(2, "bob"), room_id).await, Ok(1));
        assert_eq!(manager.rooms_of(2).await, vec![room_id]);

        let listed = manager.list_rooms().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].player_count, 2);
        assert!(listed[0].is_open());
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let (manager, _) = manager();
        let missing = Uuid::new_v4();
        assert_eq!(
            manager.join_room(&Identity::new(1, "alice"), missing).await,
            Err(RoomError::RoomNotFound)
        );
        assert_eq!(
            manager.get_snapshot(missing, None).await,
            Err(RoomError::RoomNotFound)
        );
    }

    #[tokio::test]
    async fn test_last_leave_removes_room() {
        let (manager, recorder) = manager();
        let alice = Identity::new(1, "alice");
        let room_id = manager
            .create_room(&alice, GameType::TrickBiddingGame)
            .await
            .unwrap();

        assert_eq!(manager.leave_room(1, room_id).await, Ok(LeaveOutcome::Closed));
        assert_eq!(manager.active_room_count().await, 0);
        assert!(manager.rooms_of(1).await.is_empty());
        assert_eq!(
            manager.start_game(1, room_id).await,
            Err(RoomError::RoomNotFound)
        );
        assert!(
            recorder
                .events
                .lock()
                .unwrap()
                .contains(&(1, ServerEvent::RoomClosed { room_id }))
        );
    }

    #[tokio::test]
    async fn test_leaving_a_live_room_does_not_close_it() {
        let (manager, recorder) = manager();
        let room_id = manager
            .create_room(&Identity::new(1, "alice"), GameType::PointsGame)
            .await
            .unwrap();
        manager
            .join_room(&Identity::new(2, "bob"), room_id)
            .await
            .unwrap();

        assert_eq!(
            manager.leave_room(2, room_id).await,
            Ok(LeaveOutcome::Remaining)
        );
        assert!(manager.get_room(room_id).await.is_some());

        let events = recorder.events.lock().unwrap();
        assert!(
            !events
                .iter()
                .any(|(_, event)| matches!(event, ServerEvent::RoomClosed { .. }))
        );
        match events.last() {
            Some((1, ServerEvent::RoomStateUpdate(view))) => {
                assert_eq!(view.status, RoomStatus::Waiting);
                assert_eq!(view.players.len(), 1);
            }
            other => panic!("expected an update for the host, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_join_racing_leave_all_keeps_index_in_sync() {
        let manager = Arc::new(manager().0);
        let bob = Identity::new(2, "bob");

        for _ in 0..20 {
            let room_id = manager
                .create_room(&Identity::new(1, "alice"), GameType::PointsGame)
                .await
                .unwrap();

            let joiner = {
                let manager = manager.clone();
                let bob = bob.clone();
                tokio::spawn(async move { manager.join_room(&bob, room_id).await })
            };
            let leaver = {
                let manager = manager.clone();
                tokio::spawn(async move { manager.leave_all(2).await })
            };
            joiner.await.unwrap().unwrap();
            leaver.await.unwrap();

            let seated = manager
                .get_snapshot(room_id, None)
                .await
                .unwrap()
                .players
                .iter()
                .any(|player| player.user_id == 2);
            let indexed = manager.rooms_of(2).await.contains(&room_id);
            assert_eq!(seated, indexed);

            manager.leave_all(2).await;
            manager.leave_room(1, room_id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_dispatch_reports_rejections() {
        let (manager, recorder) = manager();
        let alice = Identity::new(1, "alice");

        let result = manager
            .dispatch(
                &alice,
                ClientAction::CreateRoom {
                    game_type: "rummy".to_string(),
                },
            )
            .await;
        assert_eq!(result, Err(RoomError::InvalidGameType));

        let events = recorder.events.lock().unwrap();
        assert!(matches!(
            events.last(),
            Some((1, ServerEvent::ActionRejected { kind: RoomError::InvalidGameType, .. }))
        ));
        drop(events);
        assert_eq!(manager.active_room_count().await, 0);
    }

    #[tokio::test]
    async fn test_leave_all_empties_memberships() {
        let (manager, _) = manager();
        let alice = Identity::new(1, "alice");
        let bob = Identity::new(2, "bob");
        let first = manager.create_room(&alice, GameType::PointsGame).await.unwrap();
        let second = manager
            .create_room(&bob, GameType::TrickBiddingGame)
            .await
            .unwrap();
        manager.join_room(&alice, second).await.unwrap();

        assert_eq!(manager.leave_all(1).await, 2);
        assert!(manager.rooms_of(1).await.is_empty());
        assert!(manager.get_room(first).await.is_none());

        let view = manager.get_snapshot(second, None).await.unwrap();
        assert_eq!(view.players.len(), 1);
        assert_eq!(view.host_user_id, 2);
    }
}
