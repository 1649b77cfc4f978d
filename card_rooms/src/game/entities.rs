use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::constants::{DECK_SIZE, HAND_SIZE, SEAT_COUNT};

/// Seat position within a room. Seats are assigned at join time and are the
/// unit of turn order.
pub type SeatIndex = usize;

/// Stable user identifier resolved by the identity provider.
pub type UserId = i64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Clubs => "♣",
            Self::Diamonds => "♦",
            Self::Hearts => "♥",
            Self::Spades => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Card rank. The derived ordering is the trick-comparison ordering:
/// 2 < 3 < ... < 10 < J < Q < K < A.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];

    /// Face value, 2 through 14 (ace high).
    pub fn value(self) -> u8 {
        self as u8 + 2
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Jack => write!(f, "J"),
            Self::Queen => write!(f, "Q"),
            Self::King => write!(f, "K"),
            Self::Ace => write!(f, "A"),
            other => write!(f, "{}", other.value()),
        }
    }
}

/// Immutable playing card.
///
/// The derived `Ord` (suit, then rank) only exists for stable hand sorting.
/// Trick resolution goes through [`crate::game::rules::determine_trick_winner`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

/// A fresh 52-card deck.
#[derive(Debug)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
        Self { cards }
    }
}

impl Deck {
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Uniform Fisher-Yates shuffle.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Partition the deck into `seats` hands of `hand_size` cards in seat
    /// order. `hand_size` is clamped so that no card is dealt twice.
    pub fn deal(self, seats: usize, hand_size: usize) -> Vec<Vec<Card>> {
        if seats == 0 {
            return Vec::new();
        }
        let hand_size = hand_size.min(self.cards.len() / seats);
        self.cards
            .chunks(hand_size.max(1))
            .take(seats)
            .map(|chunk| {
                let mut hand = chunk[..hand_size].to_vec();
                hand.sort();
                hand
            })
            .collect()
    }
}

/// Shuffle a fresh deck with the thread-local RNG and deal it.
pub fn new_shuffled_hands(seats: usize, hand_size: usize) -> Vec<Vec<Card>> {
    deal_with(&mut rand::rng(), seats, hand_size)
}

/// Same as [`new_shuffled_hands`] with a caller-provided RNG.
pub fn deal_with<R: Rng + ?Sized>(rng: &mut R, seats: usize, hand_size: usize) -> Vec<Vec<Card>> {
    let mut deck = Deck::default();
    deck.shuffle(rng);
    deck.deal(seats, hand_size)
}
