/// Property-based tests for dealing and room transitions using proptest
///
/// Games are driven with seeded deals and arbitrary (but legal) choices so
/// the turn, hand and scoring invariants are checked across many rounds.
use card_rooms::{
    RoomConfig,
    game::{
        Card, GameAction, GameType, Room, RoomStatus, SeatIndex, UserId, VariantView,
        constants::{DECK_SIZE, HAND_SIZE, SEAT_COUNT},
        entities::{Deck, deal_with},
        legal_cards,
        rules::round_score,
    },
};
use proptest::{prelude::*, sample::Index};
use rand::{SeedableRng, rngs::StdRng};
use std::collections::HashSet;
use uuid::Uuid;

fn started_room(game_type: GameType, seed: u64) -> Room {
    let mut room = Room::new(Uuid::nil(), game_type, 1, "p1", RoomConfig::default());
    for user in 2..=4 {
        room.join(user, format!("p{user}")).unwrap();
    }
    let hands = deal_with(&mut StdRng::seed_from_u64(seed), SEAT_COUNT, HAND_SIZE);
    room.start_game_with_deal(1, hands).unwrap();
    room
}

fn user_at(room: &Room, seat: SeatIndex) -> UserId {
    room.players()[seat].user_id
}

/// A legal action for the seat on turn, chosen by `pick`
fn legal_action(room: &Room, seat: SeatIndex, pick: Index) -> Option<GameAction> {
    let hand = room.hand(seat)?;
    match room.status() {
        RoomStatus::Bidding => Some(GameAction::Bid(pick.index(hand.len() + 1) as u8)),
        RoomStatus::Playing => {
            let leading = room.table().first().map(|entry| entry.card.suit);
            let legal = legal_cards(hand, leading);
            if legal.is_empty() {
                return None;
            }
            Some(GameAction::PlayCard(*pick.get(&legal)))
        }
        _ => None,
    }
}

proptest! {
    #[test]
    fn test_deal_is_a_partition_of_the_deck(seed in any::<u64>()) {
        let hands = deal_with(&mut StdRng::seed_from_u64(seed), SEAT_COUNT, HAND_SIZE);

        prop_assert_eq!(hands.len(), SEAT_COUNT);
        let mut seen = HashSet::new();
        for hand in &hands {
            prop_assert_eq!(hand.len(), HAND_SIZE);
            for card in hand {
                prop_assert!(seen.insert(*card), "{} dealt twice", card);
            }
        }
        let deck: HashSet<Card> = Deck::default().cards().iter().copied().collect();
        prop_assert_eq!(seen.len(), DECK_SIZE);
        prop_assert_eq!(seen, deck);
    }

    #[test]
    fn test_turn_order_and_hand_shrinkage(
        seed in any::<u64>(),
        picks in prop::collection::vec(any::<Index>(), 56..120),
    ) {
        let mut room = started_room(GameType::TrickBiddingGame, seed);

        for pick in picks {
            if room.status() == RoomStatus::RoundOver {
                room.advance_round().unwrap();
            }
            let Some(seat) = room.current_turn() else { break };
            let Some(action) = legal_action(&room, seat, pick) else { break };

            let status_before = room.status();
            let hand_before = room.hand(seat).unwrap().len();
            let outcome = room.submit_action(user_at(&room, seat), action.clone()).unwrap();

            if let GameAction::PlayCard(card) = action {
                prop_assert_eq!(room.hand(seat).unwrap().len(), hand_before - 1);
                prop_assert!(!room.hand(seat).unwrap().contains(&card));
            }

            let Some(next) = room.current_turn() else {
                prop_assert!(outcome.round.is_some());
                continue;
            };
            let expected = match outcome.trick_winner {
                Some(winner) => winner,
                None if status_before == RoomStatus::Bidding
                    && room.status() == RoomStatus::Playing =>
                {
                    (room.dealer_seat() + 1) % SEAT_COUNT
                }
                None => (seat + 1) % SEAT_COUNT,
            };
            prop_assert_eq!(next, expected);
        }
    }

    #[test]
    fn test_rejected_actions_never_mutate(
        seed in any::<u64>(),
        steps in prop::collection::vec((any::<Index>(), any::<Index>(), any::<bool>()), 1..60),
    ) {
        let mut room = started_room(GameType::TrickBiddingGame, seed);

        for (pick, intruder, wrong_phase) in steps {
            let Some(seat) = room.current_turn() else { break };

            let other = (seat + 1 + intruder.index(SEAT_COUNT - 1)) % SEAT_COUNT;
            let attempt = match (wrong_phase, room.status()) {
                (true, RoomStatus::Bidding) => {
                    GameAction::PlayCard(room.hand(seat).unwrap()[0])
                }
                (true, _) => GameAction::Bid(0),
                (false, _) => legal_action(&room, other, pick).unwrap_or(GameAction::Bid(0)),
            };
            let attacker = if wrong_phase { user_at(&room, seat) } else { user_at(&room, other) };

            let before = room.clone();
            prop_assert!(room.submit_action(attacker, attempt).is_err());
            prop_assert_eq!(&room, &before);

            let Some(action) = legal_action(&room, seat, pick) else { break };
            room.submit_action(user_at(&room, seat), action).unwrap();
        }
    }

    #[test]
    fn test_round_scores_match_bids(seed in any::<u64>(), picks in prop::collection::vec(any::<Index>(), 56)) {
        let mut room = started_room(GameType::TrickBiddingGame, seed);

        for pick in picks {
            let Some(seat) = room.current_turn() else { break };
            let Some(action) = legal_action(&room, seat, pick) else { break };
            room.submit_action(user_at(&room, seat), action).unwrap();
        }

        prop_assert_eq!(room.status(), RoomStatus::RoundOver);
        let summary = room.last_round().unwrap().clone();
        let VariantView::TrickBiddingGame { bids, tricks_won, .. } = room.public_view().variant else {
            panic!("trick-bidding room reported another variant");
        };
        prop_assert_eq!(tricks_won.iter().map(|&t| usize::from(t)).sum::<usize>(), HAND_SIZE);
        for seat in 0..SEAT_COUNT {
            let bid = bids[seat].unwrap();
            let expected = if tricks_won[seat] >= bid { i32::from(bid) } else { -i32::from(bid) };
            prop_assert_eq!(summary.round_scores[seat], expected);
            prop_assert_eq!(summary.round_scores[seat], round_score(bid, tricks_won[seat]));
        }
        prop_assert_eq!(summary.scores, summary.round_scores);
    }
}
