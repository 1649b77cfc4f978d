//! # Card Rooms
//!
//! A multiplayer room server core for four-seat trick-taking card games.
//!
//! Each room is an independent state machine driven by a single Tokio task
//! (the room actor). A registry tracks live rooms and routes client actions
//! to them; every accepted action is followed by a per-seat snapshot pushed
//! through the session layer.
//!
//! ## Game variants
//!
//! - **Points game**: players declare card combinations and take tricks
//!   until someone reaches the target score
//! - **Trick-bidding game**: players bid the tricks they will take and are
//!   scored on the bid over a fixed number of rounds
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, rule engines and the room state machine
//! - [`room`]: Room actors and the room registry
//! - [`net`]: Client and server wire messages
//! - [`session`]: Connected users and event delivery
//! - [`auth`]: Token based identity resolution
//!
//! ## Example
//!
//! ```
//! use card_rooms::{GameType, Room, RoomConfig, RoomStatus};
//! use uuid::Uuid;
//!
//! let room = Room::new(Uuid::new_v4(), GameType::PointsGame, 1, "alice", RoomConfig::default());
//! assert_eq!(room.status(), RoomStatus::Waiting);
//! ```

/// Token based identity resolution.
pub mod auth;

/// Cards, rule engines and the room state machine.
pub mod game;
pub use game::{
    Card, GameAction, GameType, Rank, Room, RoomError, RoomId, RoomStatus, RoomView, Suit,
    UserId,
};

/// Client and server wire messages.
pub mod net;
pub use net::messages::{ClientAction, ServerEvent};

/// Room actors and the room registry.
pub mod room;
pub use room::{RoomConfig, RoomHandle, RoomManager};

/// Connected users and event delivery.
pub mod session;
pub use session::SessionTracker;
