pub const DECK_SIZE: usize = 52;
pub const SEAT_COUNT: usize = 4;
pub const HAND_SIZE: usize = 13;
/// A trick is complete once every seat has played to it.
pub const TRICK_SIZE: usize = SEAT_COUNT;

pub const DEFAULT_TOTAL_ROUNDS: u32 = 5;
pub const DEFAULT_TARGET_SCORE: i32 = 1000;
pub const DEFAULT_TRICK_POINTS: i32 = 10;

pub const TRIPLE_POINTS: i32 = 20;
pub const COLOR_RUN_POINTS: i32 = 30;
pub const RUN_POINTS: i32 = 15;
pub const COLOR_POINTS: i32 = 10;
/// Shortest run or single-suit group that counts as a combination.
pub const MIN_COMBINATION_LEN: usize = 3;
