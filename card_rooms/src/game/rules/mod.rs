//! Game rule engines.
//!
//! Both variants implement [`GameRules`] and are dispatched through
//! [`GameVariant`] without boxing. Trick resolution and follow-suit legality
//! are shared by both variants and live here.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::entities::{Card, SeatIndex, Suit};
use super::state_machine::{RoomError, RoomStatus};
use crate::room::RoomConfig;

pub mod bidding;
pub mod points;

pub use bidding::{TrickBiddingGame, round_score};
pub use points::{Combination, CombinationKind, PointsGame, score_combination};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    PointsGame,
    TrickBiddingGame,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointsGame => write!(f, "points_game"),
            Self::TrickBiddingGame => write!(f, "trick_bidding_game"),
        }
    }
}

impl FromStr for GameType {
    type Err = RoomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "points_game" | "points" => Ok(Self::PointsGame),
            "trick_bidding_game" | "trick_bidding" | "bidding" => Ok(Self::TrickBiddingGame),
            _ => Err(RoomError::InvalidGameType),
        }
    }
}

/// A card played to the current trick.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TableEntry {
    pub seat: SeatIndex,
    pub card: Card,
}

/// Resolve the winner of a trick.
///
/// Entries are visited in play order. A later entry takes the trick when it
/// is trump over a lower trump, trump over a non-trump, or a higher card of
/// the leading suit while neither card is trump. Returns `None` for an empty
/// table.
pub fn determine_trick_winner(
    entries: &[TableEntry],
    leading_suit: Suit,
    trump: Suit,
) -> Option<SeatIndex> {
    let mut iter = entries.iter();
    let mut best = iter.next()?;

    for entry in iter {
        let (card, top) = (entry.card, best.card);
        let beats = match (card.suit == trump, top.suit == trump) {
            (true, true) => card.rank > top.rank,
            (true, false) => true,
            (false, true) => false,
            (false, false) => {
                card.suit == leading_suit && (top.suit != leading_suit || card.rank > top.rank)
            }
        };
        if beats {
            best = entry;
        }
    }

    Some(best.seat)
}

/// Cards the holder may play: the cards of the leading suit if they hold
/// any, otherwise the whole hand.
pub fn legal_cards(hand: &[Card], leading_suit: Option<Suit>) -> Vec<Card> {
    if let Some(lead) = leading_suit
        && hand.iter().any(|card| card.suit == lead)
    {
        return hand.iter().copied().filter(|card| card.suit == lead).collect();
    }
    hand.to_vec()
}

/// Round settlement result, kept on the room for the next snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RoundSummary {
    pub round_number: u32,
    /// Points each seat earned this round.
    pub round_scores: Vec<i32>,
    /// Cumulative scores after settlement.
    pub scores: Vec<i32>,
}

/// Variant-specific part of a room snapshot.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum VariantView {
    PointsGame {
        target_score: i32,
        round_points: Vec<i32>,
        tricks_won: Vec<u8>,
        declared: Vec<Vec<Card>>,
    },
    TrickBiddingGame {
        total_rounds: u32,
        bids: Vec<Option<u8>>,
        tricks_won: Vec<u8>,
    },
}

/// Rule engine interface shared by both variants.
///
/// `check_*` methods only read state and must fully validate an action;
/// `record_*` methods apply an already validated action.
#[enum_dispatch]
pub trait GameRules {
    fn game_type(&self) -> GameType;

    /// Phase a freshly dealt round opens in.
    fn opening_phase(&self) -> RoomStatus;

    /// Clear per-round substate for `seats` seats.
    fn begin_round(&mut self, seats: usize);

    fn check_bid(&self, _seat: SeatIndex, _bid: u8, _hand_size: usize) -> Result<(), RoomError> {
        Err(RoomError::InvalidAction)
    }

    /// Returns true once every seat has bid.
    fn record_bid(&mut self, _seat: SeatIndex, _bid: u8) -> bool {
        false
    }

    /// Validate a combination against the seat's hand and return the points
    /// it is worth.
    fn check_combination(
        &self,
        _seat: SeatIndex,
        _combination: &Combination,
        _hand: &[Card],
    ) -> Result<i32, RoomError> {
        Err(RoomError::InvalidAction)
    }

    fn record_combination(&mut self, _seat: SeatIndex, _combination: &Combination, _points: i32) {}

    fn record_trick(&mut self, winner: SeatIndex);

    /// Fold this round into `scores`, in seat order.
    fn settle_round(&mut self, round_number: u32, scores: &mut [i32]) -> RoundSummary;

    /// The winning seat if the game is over after `round_number` settled.
    fn game_winner(&self, round_number: u32, scores: &[i32]) -> Option<SeatIndex>;

    fn view(&self) -> VariantView;
}

#[enum_dispatch(GameRules)]
#[derive(Clone, Debug, PartialEq)]
pub enum GameVariant {
    PointsGame,
    TrickBiddingGame,
}

impl GameVariant {
    pub fn new(game_type: GameType, config: &RoomConfig) -> Self {
        match game_type {
            GameType::PointsGame => {
                PointsGame::new(config.target_score, config.trick_points).into()
            }
            GameType::TrickBiddingGame => TrickBiddingGame::new(config.total_rounds).into(),
        }
    }
}
