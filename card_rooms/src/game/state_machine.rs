//! Authoritative room state machine.
//!
//! A [`Room`] owns every piece of mutable per-room state and only changes it
//! through the transitions below. Each transition validates the whole action
//! before touching any field, so a rejected action leaves the room exactly
//! as it was. Serializing calls into a room is the caller's job; see
//! [`crate::room::RoomActor`].

use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};
use thiserror::Error;
use uuid::Uuid;

use super::{
    constants::{HAND_SIZE, SEAT_COUNT, TRICK_SIZE},
    entities::{Card, SeatIndex, UserId, new_shuffled_hands},
    rules::{
        Combination, GameRules, GameType, GameVariant, RoundSummary, TableEntry, VariantView,
        determine_trick_winner, legal_cards,
    },
};
use crate::room::RoomConfig;

pub type RoomId = Uuid;

/// Errors that can occur while applying an action to a room
#[derive(Clone, Copy, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomError {
    #[error("room not found")]
    RoomNotFound,
    #[error("room is full")]
    RoomFull,
    #[error("already seated in this room")]
    AlreadyJoined,
    #[error("only the host can do that")]
    NotHost,
    #[error("need {SEAT_COUNT} players to start")]
    NotEnoughPlayers,
    #[error("game already started")]
    AlreadyStarted,
    #[error("not your turn")]
    NotYourTurn,
    #[error("action not allowed right now")]
    InvalidAction,
    #[error("unknown game type")]
    InvalidGameType,
    #[error("card not in hand")]
    CardNotInHand,
    #[error("must follow the leading suit")]
    MustFollowSuit,
    #[error("bid must be between 0 and the hand size")]
    InvalidBid,
    #[error("cards don't form that combination")]
    InvalidCombination,
    #[error("not seated in this room")]
    NotSeated,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Bidding,
    Playing,
    RoundOver,
    Finished,
}

impl RoomStatus {
    /// Whether a seat is expected to act.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Bidding | Self::Playing)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Bidding => "bidding",
            Self::Playing => "playing",
            Self::RoundOver => "round_over",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// In-game actions, i.e. everything a seated player does on their turn.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GameAction {
    Bid(u8),
    PlayCard(Card),
    SubmitCombination(Combination),
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid(bid) => write!(f, "bids {bid}"),
            Self::PlayCard(card) => write!(f, "plays {card}"),
            Self::SubmitCombination(combination) => {
                write!(f, "declares {:?} (", combination.kind)?;
                for (i, card) in combination.cards.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{card}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Player {
    pub user_id: UserId,
    pub display_name: String,
    pub seat: SeatIndex,
    pub hand: Vec<Card>,
    /// Dealt into the current game. Cleared whenever the room returns to
    /// waiting.
    pub ready: bool,
}

/// What an accepted action changed beyond the obvious.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ActionOutcome {
    pub trick_winner: Option<SeatIndex>,
    pub round: Option<RoundSummary>,
    pub game_winner: Option<SeatIndex>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LeaveOutcome {
    /// Seats remain; the room is back to waiting.
    Remaining,
    /// The last seat left. The room should be dropped.
    Closed,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub user_id: UserId,
    pub display_name: String,
    pub seat: SeatIndex,
    pub hand_size: usize,
    pub ready: bool,
}

/// Room snapshot as seen by one recipient. Only the recipient's own hand is
/// included.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RoomView {
    pub room_id: RoomId,
    pub game_type: GameType,
    pub host_user_id: UserId,
    pub status: RoomStatus,
    pub players: Vec<PlayerView>,
    pub dealer_seat: SeatIndex,
    pub current_turn: Option<SeatIndex>,
    pub table: Vec<TableEntry>,
    pub scores: Vec<i32>,
    pub round_number: u32,
    pub variant: VariantView,
    pub last_round: Option<RoundSummary>,
    pub winner: Option<SeatIndex>,
    pub your_seat: Option<SeatIndex>,
    pub hand: Vec<Card>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Room {
    id: RoomId,
    game_type: GameType,
    host: UserId,
    players: Vec<Player>,
    status: RoomStatus,
    dealer_seat: SeatIndex,
    current_turn: Option<SeatIndex>,
    table: Vec<TableEntry>,
    scores: Vec<i32>,
    round_number: u32,
    rules: GameVariant,
    config: RoomConfig,
    last_round: Option<RoundSummary>,
    winner: Option<SeatIndex>,
}

impl Room {
    /// New waiting room with the host in seat 0.
    pub fn new(
        id: RoomId,
        game_type: GameType,
        host: UserId,
        host_name: impl Into<String>,
        config: RoomConfig,
    ) -> Self {
        let rules = GameVariant::new(game_type, &config);
        let mut room = Self {
            id,
            game_type,
            host,
            players: Vec::with_capacity(SEAT_COUNT),
            status: RoomStatus::Waiting,
            dealer_seat: 0,
            current_turn: None,
            table: Vec::with_capacity(TRICK_SIZE),
            scores: Vec::with_capacity(SEAT_COUNT),
            round_number: 0,
            rules,
            config,
            last_round: None,
            winner: None,
        };
        room.seat_player(host, host_name.into());
        room
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn game_type(&self) -> GameType {
        self.game_type
    }

    pub fn host(&self) -> UserId {
        self.host
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn dealer_seat(&self) -> SeatIndex {
        self.dealer_seat
    }

    pub fn current_turn(&self) -> Option<SeatIndex> {
        self.current_turn
    }

    pub fn table(&self) -> &[TableEntry] {
        &self.table
    }

    pub fn scores(&self) -> &[i32] {
        &self.scores
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn last_round(&self) -> Option<&RoundSummary> {
        self.last_round.as_ref()
    }

    pub fn winner(&self) -> Option<SeatIndex> {
        self.winner
    }

    pub fn seat_of(&self, user_id: UserId) -> Option<SeatIndex> {
        self.players.iter().position(|p| p.user_id == user_id)
    }

    pub fn hand(&self, seat: SeatIndex) -> Option<&[Card]> {
        self.players.get(seat).map(|p| p.hand.as_slice())
    }

    pub fn player_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.players.iter().map(|p| p.user_id)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= SEAT_COUNT
    }

    fn seat_after(&self, seat: SeatIndex) -> SeatIndex {
        (seat + 1) % self.players.len().max(1)
    }

    fn seat_player(&mut self, user_id: UserId, display_name: String) -> SeatIndex {
        let seat = self.players.len();
        self.players.push(Player {
            user_id,
            display_name,
            seat,
            hand: Vec::new(),
            ready: false,
        });
        self.scores.push(0);
        seat
    }

    /// Append a seat for `user_id`.
    pub fn join(
        &mut self,
        user_id: UserId,
        display_name: impl Into<String>,
    ) -> Result<SeatIndex, RoomError> {
        if self.seat_of(user_id).is_some() {
            return Err(RoomError::AlreadyJoined);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::AlreadyStarted);
        }

        Ok(self.seat_player(user_id, display_name.into()))
    }

    fn check_start(&self, actor: UserId) -> Result<(), RoomError> {
        if self.seat_of(actor).is_none() {
            return Err(RoomError::NotSeated);
        }
        if actor != self.host {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::AlreadyStarted);
        }
        if self.players.len() < SEAT_COUNT {
            return Err(RoomError::NotEnoughPlayers);
        }
        Ok(())
    }

    /// A deal is usable when it has one hand per seat, every hand has the
    /// same size between 1 and 13, and no card appears twice.
    fn check_deal(&self, hands: &[Vec<Card>]) -> Result<(), RoomError> {
        if hands.len() != self.players.len() {
            return Err(RoomError::InvalidAction);
        }
        let size = hands.first().map_or(0, Vec::len);
        if size == 0 || size > HAND_SIZE || hands.iter().any(|hand| hand.len() != size) {
            return Err(RoomError::InvalidAction);
        }
        let mut seen = HashSet::with_capacity(size * hands.len());
        if !hands.iter().flatten().all(|card| seen.insert(*card)) {
            return Err(RoomError::InvalidAction);
        }
        Ok(())
    }

    /// Host starts the game with a freshly shuffled deal.
    pub fn start_game(&mut self, actor: UserId) -> Result<(), RoomError> {
        self.check_start(actor)?;
        let hands = new_shuffled_hands(self.players.len(), self.config.hand_size);
        self.start_game_with_deal(actor, hands)
    }

    /// Host starts the game with a pre-computed deal (replays and tests).
    pub fn start_game_with_deal(
        &mut self,
        actor: UserId,
        hands: Vec<Vec<Card>>,
    ) -> Result<(), RoomError> {
        self.check_start(actor)?;
        self.check_deal(&hands)?;

        self.scores = vec![0; self.players.len()];
        self.round_number = 1;
        self.last_round = None;
        self.winner = None;
        self.deal_round(hands);

        debug!(
            "Room {}: {} started, dealer seat {}",
            self.id, self.game_type, self.dealer_seat
        );
        Ok(())
    }

    fn deal_round(&mut self, hands: Vec<Vec<Card>>) {
        self.rules.begin_round(self.players.len());
        for (player, mut hand) in self.players.iter_mut().zip(hands) {
            hand.sort();
            player.hand = hand;
            player.ready = true;
        }
        self.table.clear();
        self.status = self.rules.opening_phase();
        self.current_turn = Some(self.seat_after(self.dealer_seat));
    }

    /// Apply one in-game action from `actor`.
    pub fn submit_action(
        &mut self,
        actor: UserId,
        action: GameAction,
    ) -> Result<ActionOutcome, RoomError> {
        let seat = self.seat_of(actor).ok_or(RoomError::NotSeated)?;

        let phase = match action {
            GameAction::Bid(_) => RoomStatus::Bidding,
            GameAction::PlayCard(_) => RoomStatus::Playing,
            GameAction::SubmitCombination(_) if self.game_type != GameType::PointsGame => {
                return Err(RoomError::InvalidAction);
            }
            GameAction::SubmitCombination(_) => RoomStatus::Playing,
        };
        if self.status != phase {
            return Err(RoomError::InvalidAction);
        }
        if self.current_turn != Some(seat) {
            return Err(RoomError::NotYourTurn);
        }

        match action {
            GameAction::Bid(bid) => self.apply_bid(seat, bid),
            GameAction::PlayCard(card) => self.apply_play(seat, card),
            GameAction::SubmitCombination(combination) => {
                self.apply_combination(seat, &combination)
            }
        }
    }

    fn apply_bid(&mut self, seat: SeatIndex, bid: u8) -> Result<ActionOutcome, RoomError> {
        self.rules
            .check_bid(seat, bid, self.players[seat].hand.len())?;

        if self.rules.record_bid(seat, bid) {
            self.status = RoomStatus::Playing;
            self.current_turn = Some(self.seat_after(self.dealer_seat));
        } else {
            self.current_turn = Some(self.seat_after(seat));
        }
        Ok(ActionOutcome::default())
    }

    fn apply_play(&mut self, seat: SeatIndex, card: Card) -> Result<ActionOutcome, RoomError> {
        let hand = &self.players[seat].hand;
        let position = hand
            .iter()
            .position(|&held| held == card)
            .ok_or(RoomError::CardNotInHand)?;
        let leading = self.table.first().map(|entry| entry.card.suit);
        if self.config.enforce_follow_suit && !legal_cards(hand, leading).contains(&card) {
            return Err(RoomError::MustFollowSuit);
        }

        let card = self.players[seat].hand.remove(position);
        self.table.push(TableEntry { seat, card });

        if self.table.len() < self.players.len() {
            self.current_turn = Some(self.seat_after(seat));
            return Ok(ActionOutcome::default());
        }

        let lead = self.table[0].card.suit;
        // The table holds a full trick here, so there is always a winner.
        let winner = determine_trick_winner(&self.table, lead, self.config.trump).unwrap_or(seat);
        self.rules.record_trick(winner);
        self.table.clear();
        debug!("Room {}: seat {} takes the trick", self.id, winner);

        let mut outcome = ActionOutcome {
            trick_winner: Some(winner),
            ..Default::default()
        };
        if self.players.iter().all(|p| p.hand.is_empty()) {
            self.settle_round(&mut outcome);
        } else {
            self.current_turn = Some(winner);
        }
        Ok(outcome)
    }

    fn apply_combination(
        &mut self,
        seat: SeatIndex,
        combination: &Combination,
    ) -> Result<ActionOutcome, RoomError> {
        if !self.table.is_empty() {
            return Err(RoomError::InvalidAction);
        }
        let points = self
            .rules
            .check_combination(seat, combination, &self.players[seat].hand)?;

        self.rules.record_combination(seat, combination, points);
        self.current_turn = Some(self.seat_after(seat));
        Ok(ActionOutcome::default())
    }

    fn settle_round(&mut self, outcome: &mut ActionOutcome) {
        let summary = self.rules.settle_round(self.round_number, &mut self.scores);
        self.current_turn = None;

        match self.rules.game_winner(self.round_number, &self.scores) {
            Some(winner) => {
                self.status = RoomStatus::Finished;
                self.winner = Some(winner);
                outcome.game_winner = Some(winner);
            }
            None => self.status = RoomStatus::RoundOver,
        }

        debug!(
            "Room {}: round {} settled {:?}",
            self.id, self.round_number, summary.round_scores
        );
        self.last_round = Some(summary.clone());
        outcome.round = Some(summary);
    }

    /// Move the dealer on and deal the next round.
    pub fn advance_round(&mut self) -> Result<(), RoomError> {
        if self.status != RoomStatus::RoundOver {
            return Err(RoomError::InvalidAction);
        }
        let hands = new_shuffled_hands(self.players.len(), self.config.hand_size);
        self.advance_round_with_deal(hands)
    }

    pub fn advance_round_with_deal(&mut self, hands: Vec<Vec<Card>>) -> Result<(), RoomError> {
        if self.status != RoomStatus::RoundOver {
            return Err(RoomError::InvalidAction);
        }
        self.check_deal(&hands)?;

        self.dealer_seat = self.seat_after(self.dealer_seat);
        self.round_number += 1;
        self.deal_round(hands);
        Ok(())
    }

    /// Remove `user_id` from the room. Any game in progress is abandoned and
    /// the room goes back to waiting; the host role passes to seat 0 if the
    /// host left.
    pub fn leave(&mut self, user_id: UserId) -> Result<LeaveOutcome, RoomError> {
        let seat = self.seat_of(user_id).ok_or(RoomError::NotSeated)?;
        self.players.remove(seat);

        if self.players.is_empty() {
            return Ok(LeaveOutcome::Closed);
        }

        for (seat, player) in self.players.iter_mut().enumerate() {
            player.seat = seat;
        }
        if user_id == self.host {
            self.host = self.players[0].user_id;
        }
        self.reset_to_waiting();
        Ok(LeaveOutcome::Remaining)
    }

    fn reset_to_waiting(&mut self) {
        for player in &mut self.players {
            player.hand.clear();
            player.ready = false;
        }
        self.status = RoomStatus::Waiting;
        self.dealer_seat = 0;
        self.current_turn = None;
        self.table.clear();
        self.scores = vec![0; self.players.len()];
        self.round_number = 0;
        self.rules.begin_round(self.players.len());
        self.last_round = None;
        self.winner = None;
    }

    /// Action taken for a stalled seat: bid nothing, or throw the lowest
    /// legal card.
    pub fn auto_action(&self) -> Option<(UserId, GameAction)> {
        let player = self.players.get(self.current_turn?)?;
        match self.status {
            RoomStatus::Bidding => Some((player.user_id, GameAction::Bid(0))),
            RoomStatus::Playing => {
                let leading = self.table.first().map(|entry| entry.card.suit);
                legal_cards(&player.hand, leading)
                    .into_iter()
                    .min_by_key(|card| (card.rank, card.suit))
                    .map(|card| (player.user_id, GameAction::PlayCard(card)))
            }
            _ => None,
        }
    }

    /// Snapshot for `user_id`, revealing only their own hand.
    pub fn view_for(&self, user_id: UserId) -> RoomView {
        self.view(self.seat_of(user_id))
    }

    /// Snapshot with no hands revealed.
    pub fn public_view(&self) -> RoomView {
        self.view(None)
    }

    fn view(&self, seat: Option<SeatIndex>) -> RoomView {
        RoomView {
            room_id: self.id,
            game_type: self.game_type,
            host_user_id: self.host,
            status: self.status,
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    user_id: p.user_id,
                    display_name: p.display_name.clone(),
                    seat: p.seat,
                    hand_size: p.hand.len(),
                    ready: p.ready,
                })
                .collect(),
            dealer_seat: self.dealer_seat,
            current_turn: self.current_turn,
            table: self.table.clone(),
            scores: self.scores.clone(),
            round_number: self.round_number,
            variant: self.rules.view(),
            last_round: self.last_round.clone(),
            winner: self.winner,
            your_seat: seat,
            hand: seat
                .and_then(|seat| self.players.get(seat))
                .map(|p| p.hand.clone())
                .unwrap_or_default(),
        }
    }
}
