/// Integration tests for the room registry and actors
///
/// These tests run real room actors on the Tokio runtime and observe them
/// the way a transport would: through session queues.
use card_rooms::{
    ClientAction, GameType, RoomConfig, RoomError, RoomManager, RoomStatus, ServerEvent,
    SessionTracker,
    auth::Identity,
    game::{GameAction, LeaveOutcome},
};
use std::{sync::Arc, time::Duration};
use tokio::{sync::mpsc, time::timeout};

fn registry() -> (Arc<RoomManager>, Arc<SessionTracker>) {
    let sessions = Arc::new(SessionTracker::default());
    let manager = Arc::new(RoomManager::new(sessions.clone(), RoomConfig::default()));
    (manager, sessions)
}

fn players() -> Vec<Identity> {
    ["alice", "bob", "carol", "dave"]
        .into_iter()
        .enumerate()
        .map(|(i, name)| Identity::new(i as i64 + 1, name))
        .collect()
}

async fn next_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("session closed")
}

/// Skip events until a room snapshot with `status` arrives
async fn wait_for_status(
    rx: &mut mpsc::Receiver<ServerEvent>,
    status: RoomStatus,
) -> card_rooms::RoomView {
    loop {
        if let ServerEvent::RoomStateUpdate(view) = next_event(rx).await
            && view.status == status
        {
            return view;
        }
    }
}

#[tokio::test]
async fn test_start_broadcasts_private_hands() {
    let (manager, sessions) = registry();
    let players = players();
    let mut receivers: Vec<_> = players
        .iter()
        .map(|identity| sessions.connect(identity.clone()).1)
        .collect();

    let room_id = manager
        .create_room(&players[0], GameType::TrickBiddingGame)
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut receivers[0]).await,
        ServerEvent::RoomCreated { room_id }
    );
    for identity in &players[1..] {
        manager.join_room(identity, room_id).await.unwrap();
    }
    manager.start_game(players[0].user_id, room_id).await.unwrap();

    let mut all_cards = Vec::new();
    for (seat, rx) in receivers.iter_mut().enumerate() {
        let view = wait_for_status(rx, RoomStatus::Bidding).await;
        assert_eq!(view.your_seat, Some(seat));
        assert_eq!(view.hand.len(), 13);
        assert_eq!(view.current_turn, Some(1));
        all_cards.extend(view.hand);
    }
    all_cards.sort();
    all_cards.dedup();
    assert_eq!(all_cards.len(), 52);
}

#[tokio::test]
async fn test_rejections_go_to_the_actor_only() {
    let (manager, sessions) = registry();
    let players = players();
    let (_, mut alice_rx) = sessions.connect(players[0].clone());
    let (_, mut carol_rx) = sessions.connect(players[2].clone());

    let room_id = manager
        .create_room(&players[0], GameType::TrickBiddingGame)
        .await
        .unwrap();
    for identity in &players[1..] {
        manager.join_room(identity, room_id).await.unwrap();
    }
    manager.start_game(players[0].user_id, room_id).await.unwrap();
    wait_for_status(&mut carol_rx, RoomStatus::Bidding).await;
    wait_for_status(&mut alice_rx, RoomStatus::Bidding).await;

    let result = manager
        .dispatch(&players[2], ClientAction::MakeBid { room_id, bid: 1 })
        .await;
    assert_eq!(result, Err(RoomError::NotYourTurn));

    match next_event(&mut carol_rx).await {
        ServerEvent::ActionRejected {
            room_id: rejected_room,
            kind,
            ..
        } => {
            assert_eq!(rejected_room, Some(room_id));
            assert_eq!(kind, RoomError::NotYourTurn);
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert!(alice_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_joins_fill_exactly_three_seats() {
    let (manager, _) = registry();
    let host = Identity::new(1, "host");
    let room_id = manager
        .create_room(&host, GameType::PointsGame)
        .await
        .unwrap();

    let mut tasks = Vec::new();
    for user_id in 2..=11 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            manager
                .join_room(&Identity::new(user_id, format!("p{user_id}")), room_id)
                .await
        }));
    }

    let mut seats = Vec::new();
    let mut full = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(seat) => seats.push(seat),
            Err(RoomError::RoomFull) => full += 1,
            Err(e) => panic!("unexpected join error {e}"),
        }
    }
    seats.sort_unstable();
    assert_eq!(seats, vec![1, 2, 3]);
    assert_eq!(full, 7);

    let view = manager.get_snapshot(room_id, None).await.unwrap();
    assert_eq!(view.players.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rooms_run_in_parallel() {
    let (manager, _) = registry();

    let mut tasks = Vec::new();
    for room in 0..8i64 {
        let manager = manager.clone();
        tasks.push(tokio::spawn(async move {
            let seats: Vec<Identity> = (0..4)
                .map(|seat| Identity::new(room * 10 + seat, format!("r{room}s{seat}")))
                .collect();
            let room_id = manager
                .create_room(&seats[0], GameType::TrickBiddingGame)
                .await?;
            for identity in &seats[1..] {
                manager.join_room(identity, room_id).await?;
            }
            manager.start_game(seats[0].user_id, room_id).await?;
            manager
                .submit_action(seats[1].user_id, room_id, GameAction::Bid(2))
                .await?;
            Ok::<_, RoomError>(room_id)
        }));
    }

    for task in tasks {
        let room_id = task.await.unwrap().unwrap();
        let view = manager.get_snapshot(room_id, None).await.unwrap();
        assert_eq!(view.status, RoomStatus::Bidding);
        assert_eq!(view.current_turn, Some(2));
    }
    assert_eq!(manager.active_room_count().await, 8);
    assert!(manager.list_rooms().await.is_empty());
}

#[tokio::test]
async fn test_last_leave_deletes_room() {
    let (manager, sessions) = registry();
    let alice = Identity::new(1, "alice");
    let (_, mut rx) = sessions.connect(alice.clone());

    let room_id = manager
        .create_room(&alice, GameType::TrickBiddingGame)
        .await
        .unwrap();
    assert_eq!(
        manager.leave_room(alice.user_id, room_id).await,
        Ok(LeaveOutcome::Closed)
    );

    assert!(manager.get_room(room_id).await.is_none());
    assert_eq!(
        manager.join_room(&Identity::new(2, "bob"), room_id).await,
        Err(RoomError::RoomNotFound)
    );

    loop {
        if let ServerEvent::RoomClosed { room_id: closed } = next_event(&mut rx).await {
            assert_eq!(closed, room_id);
            break;
        }
    }
}

#[tokio::test]
async fn test_disconnect_cleanup_resets_room() {
    let (manager, sessions) = registry();
    let players = players();
    let (_, mut bob_rx) = sessions.connect(players[1].clone());

    let room_id = manager
        .create_room(&players[0], GameType::PointsGame)
        .await
        .unwrap();
    for identity in &players[1..] {
        manager.join_room(identity, room_id).await.unwrap();
    }
    manager.start_game(players[0].user_id, room_id).await.unwrap();
    wait_for_status(&mut bob_rx, RoomStatus::Playing).await;

    assert_eq!(manager.leave_all(players[0].user_id).await, 1);

    let view = wait_for_status(&mut bob_rx, RoomStatus::Waiting).await;
    assert_eq!(view.players.len(), 3);
    assert_eq!(view.host_user_id, players[1].user_id);
    assert!(view.hand.is_empty());
    assert_eq!(manager.list_rooms().await.len(), 1);
}

/// Next lobby event, skipping anything else
async fn next_lobby_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    loop {
        let event = next_event(rx).await;
        if matches!(
            event,
            ServerEvent::RoomListed { .. } | ServerEvent::RoomUnlisted { .. }
        ) {
            return event;
        }
    }
}

#[tokio::test]
async fn test_lobby_events_reach_unseated_sessions() {
    let (manager, sessions) = registry();
    let players = players();
    let (_, mut watcher) = sessions.connect(Identity::new(99, "watcher"));

    let room_id = manager
        .create_room(&players[0], GameType::TrickBiddingGame)
        .await
        .unwrap();
    for (joined, identity) in players.iter().enumerate() {
        if joined > 0 {
            manager.join_room(identity, room_id).await.unwrap();
        }
        match next_lobby_event(&mut watcher).await {
            ServerEvent::RoomListed { room } => {
                assert_eq!(room.id, room_id);
                assert_eq!(room.player_count, joined + 1);
                assert_eq!(room.status, RoomStatus::Waiting);
            }
            other => panic!("expected room_listed, got {other:?}"),
        }
    }

    manager.start_game(players[0].user_id, room_id).await.unwrap();
    assert_eq!(
        next_lobby_event(&mut watcher).await,
        ServerEvent::RoomUnlisted { room_id }
    );

    // A seat leaving a started room sends it back to the lobby
    manager
        .leave_room(players[3].user_id, room_id)
        .await
        .unwrap();
    match next_lobby_event(&mut watcher).await {
        ServerEvent::RoomListed { room } => assert_eq!(room.player_count, 3),
        other => panic!("expected room_listed, got {other:?}"),
    }

    for identity in &players[..3] {
        manager.leave_room(identity.user_id, room_id).await.unwrap();
    }
    let mut last = next_lobby_event(&mut watcher).await;
    while let ServerEvent::RoomListed { .. } = last {
        last = next_lobby_event(&mut watcher).await;
    }
    assert_eq!(last, ServerEvent::RoomUnlisted { room_id });
    assert!(manager.list_rooms().await.is_empty());
}
