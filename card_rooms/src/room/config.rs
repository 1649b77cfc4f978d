//! Room configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::game::{
    constants::{
        DEFAULT_TARGET_SCORE, DEFAULT_TOTAL_ROUNDS, DEFAULT_TRICK_POINTS, HAND_SIZE,
    },
    entities::Suit,
};

/// Per-room rule and runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Trump suit used for trick resolution (default: spades)
    pub trump: Suit,

    /// Reject plays that don't follow the leading suit when the player
    /// could have
    pub enforce_follow_suit: bool,

    /// Rounds in a trick-bidding game
    pub total_rounds: u32,

    /// Cumulative score that ends a points game
    pub target_score: i32,

    /// Points per trick won in a points game
    pub trick_points: i32,

    /// Cards dealt to each seat per round
    pub hand_size: usize,

    /// Auto-act for a seat that stalls this long. `None` waits forever.
    #[serde(with = "optional_secs")]
    pub turn_timeout: Option<Duration>,

    /// Capacity of the room actor inbox
    pub inbox_capacity: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            trump: Suit::Spades,
            enforce_follow_suit: true,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            target_score: DEFAULT_TARGET_SCORE,
            trick_points: DEFAULT_TRICK_POINTS,
            hand_size: HAND_SIZE,
            turn_timeout: None,
            inbox_capacity: 100,
        }
    }
}

impl RoomConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.total_rounds == 0 {
            return Err("Total rounds must be at least 1".to_string());
        }

        if self.hand_size == 0 || self.hand_size > HAND_SIZE {
            return Err(format!("Hand size must be between 1 and {HAND_SIZE}"));
        }

        if self.target_score <= 0 {
            return Err("Target score must be positive".to_string());
        }

        if self.trick_points < 0 {
            return Err("Trick points cannot be negative".to_string());
        }

        if self.inbox_capacity == 0 {
            return Err("Inbox capacity must be at least 1".to_string());
        }

        if self.turn_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err("Turn timeout must be positive when set".to_string());
        }

        Ok(())
    }
}

mod optional_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => s.serialize_some(&duration.as_secs_f64()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(d)?;
        Ok(secs
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64))
    }
}
