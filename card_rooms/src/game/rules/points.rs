//! Points game: combinations and tricks accumulate points until a seat
//! reaches the target score.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{GameRules, GameType, RoundSummary, VariantView};
use crate::game::{
    constants::{COLOR_POINTS, COLOR_RUN_POINTS, MIN_COMBINATION_LEN, RUN_POINTS, TRIPLE_POINTS},
    entities::{Card, SeatIndex},
    state_machine::{RoomError, RoomStatus},
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationKind {
    Triple,
    ColorRun,
    Run,
    Color,
    /// Anything the client sends that we don't recognize. Scores zero.
    #[serde(other)]
    Unknown,
}

/// A claimed scoring pattern.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Combination {
    #[serde(rename = "type")]
    pub kind: CombinationKind,
    pub cards: Vec<Card>,
}

impl Combination {
    /// Whether the cards actually form the claimed pattern. Unknown kinds
    /// have no pattern to check.
    pub fn forms_pattern(&self) -> bool {
        match self.kind {
            CombinationKind::Triple => is_triple(&self.cards),
            CombinationKind::Run => is_run(&self.cards),
            CombinationKind::Color => is_color(&self.cards),
            CombinationKind::ColorRun => is_run(&self.cards) && is_color(&self.cards),
            CombinationKind::Unknown => true,
        }
    }
}

/// Fixed points table. Unknown kinds are worth nothing.
pub fn score_combination(kind: CombinationKind) -> i32 {
    match kind {
        CombinationKind::Triple => TRIPLE_POINTS,
        CombinationKind::ColorRun => COLOR_RUN_POINTS,
        CombinationKind::Run => RUN_POINTS,
        CombinationKind::Color => COLOR_POINTS,
        CombinationKind::Unknown => 0,
    }
}

fn is_triple(cards: &[Card]) -> bool {
    cards.len() == 3 && cards.iter().all(|card| card.rank == cards[0].rank)
}

fn is_color(cards: &[Card]) -> bool {
    cards.len() >= MIN_COMBINATION_LEN && cards.iter().all(|card| card.suit == cards[0].suit)
}

fn is_run(cards: &[Card]) -> bool {
    if cards.len() < MIN_COMBINATION_LEN {
        return false;
    }
    let mut values: Vec<u8> = cards.iter().map(|card| card.rank.value()).collect();
    values.sort_unstable();
    values.windows(2).all(|pair| pair[1] == pair[0] + 1)
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointsGame {
    target_score: i32,
    trick_points: i32,
    round_points: Vec<i32>,
    tricks_won: Vec<u8>,
    /// Cards each seat has already declared this round.
    declared: Vec<BTreeSet<Card>>,
}

impl PointsGame {
    pub fn new(target_score: i32, trick_points: i32) -> Self {
        Self {
            target_score,
            trick_points,
            round_points: Vec::new(),
            tricks_won: Vec::new(),
            declared: Vec::new(),
        }
    }

    pub fn tricks_won(&self) -> &[u8] {
        &self.tricks_won
    }
}

impl GameRules for PointsGame {
    fn game_type(&self) -> GameType {
        GameType::PointsGame
    }

    fn opening_phase(&self) -> RoomStatus {
        RoomStatus::Playing
    }

    fn begin_round(&mut self, seats: usize) {
        self.round_points = vec![0; seats];
        self.tricks_won = vec![0; seats];
        self.declared = vec![BTreeSet::new(); seats];
    }

    fn check_combination(
        &self,
        seat: SeatIndex,
        combination: &Combination,
        hand: &[Card],
    ) -> Result<i32, RoomError> {
        let cards = &combination.cards;
        if cards.is_empty() {
            return Err(RoomError::InvalidCombination);
        }

        let unique: BTreeSet<&Card> = cards.iter().collect();
        if unique.len() != cards.len() {
            return Err(RoomError::InvalidCombination);
        }

        if !cards.iter().all(|card| hand.contains(card)) {
            return Err(RoomError::CardNotInHand);
        }

        let declared = self.declared.get(seat).ok_or(RoomError::NotSeated)?;
        if cards.iter().any(|card| declared.contains(card)) {
            return Err(RoomError::InvalidCombination);
        }

        if !combination.forms_pattern() {
            return Err(RoomError::InvalidCombination);
        }

        Ok(score_combination(combination.kind))
    }

    fn record_combination(&mut self, seat: SeatIndex, combination: &Combination, points: i32) {
        self.round_points[seat] += points;
        self.declared[seat].extend(combination.cards.iter().copied());
    }

    fn record_trick(&mut self, winner: SeatIndex) {
        self.tricks_won[winner] += 1;
    }

    fn settle_round(&mut self, round_number: u32, scores: &mut [i32]) -> RoundSummary {
        let round_scores: Vec<i32> = self
            .round_points
            .iter()
            .zip(&self.tricks_won)
            .map(|(points, &tricks)| points + i32::from(tricks) * self.trick_points)
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

    fn game_winner(&self, _round_number: u32, scores: &[i32]) -> Option<SeatIndex> {
        // Scores only grow and settlement runs in seat order, so the lowest
        // seat at or over the target is the first one that crossed it.
        scores.iter().position(|&score| score >= self.target_score)
    }

    fn view(&self) -> VariantView {
        VariantView::PointsGame {
            target_score: self.target_score,
            round_points: self.round_points.clone(),
            tricks_won: self.tricks_won.clone(),
            declared: self
                .declared
                .iter()
                .map(|cards| cards.iter().copied().collect())
                .collect(),
        }
    }
}
