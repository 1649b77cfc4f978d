//! Trick-bidding game: each seat bids the tricks it will take, then plays
//! the round out. Under-fulfilled bids are penalized by the bid.

use super::{GameRules, GameType, RoundSummary, VariantView};
use crate::game::{
    entities::SeatIndex,
    state_machine::{RoomError, RoomStatus},
};

/// Score for one seat in one round: `+bid` when the bid was met or beaten,
/// `-bid` otherwise.
pub fn round_score(bid: u8, tricks_won: u8) -> i32 {
    if tricks_won >= bid {
        i32::from(bid)
    } else {
        -i32::from(bid)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrickBiddingGame {
    total_rounds: u32,
    bids: Vec<Option<u8>>,
    tricks_won: Vec<u8>,
}

impl TrickBiddingGame {
    pub fn new(total_rounds: u32) -> Self {
        Self {
            total_rounds,
            bids: Vec::new(),
            tricks_won: Vec::new(),
        }
    }
}

impl GameRules for TrickBiddingGame {
    fn game_type(&self) -> GameType {
        GameType::TrickBiddingGame
    }

    fn opening_phase(&self) -> RoomStatus {
        RoomStatus::Bidding
    }

    fn begin_round(&mut self, seats: usize) {
        self.bids = vec![None; seats];
        self.tricks_won = vec![0; seats];
    }

    fn check_bid(&self, seat: SeatIndex, bid: u8, hand_size: usize) -> Result<(), RoomError> {
        match self.bids.get(seat) {
            None => Err(RoomError::NotSeated),
            Some(Some(_)) => Err(RoomError::InvalidAction),
            Some(None) if usize::from(bid) > hand_size => Err(RoomError::InvalidBid),
            Some(None) => Ok(()),
        }
    }

    fn record_bid(&mut self, seat: SeatIndex, bid: u8) -> bool {
        self.bids[seat] = Some(bid);
        self.bids.iter().all(Option::is_some)
    }

    fn record_trick(&mut self, winner: SeatIndex) {
        self.tricks_won[winner] += 1;
    }

    fn settle_round(&mut self, round_number: u32, scores: &mut [i32]) -> RoundSummary {
        let round_scores: Vec<i32> = self
            .bids
            .iter()
            .zip(&self.tricks_won)
            .map(|(bid, &tricks)| round_score(bid.unwrap_or(0), tricks))
            .collect();

        for (score, earned) in scores.iter_mut().zip(&round_scores) {
            *score += earned;
        }

        RoundSummary {
            round_number,
            round_scores,
            scores: scores.to_vec(),
        }
    }

    fn game_winner(&self, round_number: u32, scores: &[i32]) -> Option<SeatIndex> {
        if round_number < self.total_rounds {
            return None;
        }
        // Highest score, lowest seat on ties.
        scores
            .iter()
            .enumerate()
            .fold(None, |best: Option<(SeatIndex, i32)>, (seat, &score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((seat, score)),
            })
            .map(|(seat, _)| seat)
    }

    fn view(&self) -> VariantView {
        VariantView::TrickBiddingGame {
            total_rounds: self.total_rounds,
            bids: self.bids.clone(),
            tricks_won: self.tricks_won.clone(),
        }
    }
}
