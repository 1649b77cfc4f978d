//! Card game engine: cards, rule variants and the per-room state machine.
//!
//! This module provides:
//! - Card, deck and dealing primitives
//! - Shared trick resolution and follow-suit legality
//! - The points game and trick-bidding game rule engines
//! - The room state machine that sequences both

pub mod constants;
pub mod entities;
pub mod rules;
pub mod state_machine;

pub use entities::{Card, Deck, Rank, SeatIndex, Suit, UserId};
pub use rules::{
    Combination, CombinationKind, GameRules, GameType, GameVariant, RoundSummary, TableEntry,
    VariantView, determine_trick_winner, legal_cards,
};
pub use state_machine::{
    ActionOutcome, GameAction, LeaveOutcome, Player, PlayerView, Room, RoomError, RoomId,
    RoomStatus, RoomView,
};
