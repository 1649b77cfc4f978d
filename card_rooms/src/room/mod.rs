//! Room module providing concurrent rooms on the async actor model.
//!
//! This module implements:
//! - RoomActor: a Tokio task owning one room and draining its inbox
//! - RoomHandle: the cloneable sending side used to reach an actor
//! - RoomManager: the registry creating, routing to and cleaning up rooms
//! - RoomConfig: per-room rule and runtime settings
//!
//! ## Example
//!
//! ```no_run
//! use card_rooms::{GameType, RoomConfig, RoomManager, SessionTracker};
//! use card_rooms::auth::Identity;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sessions = Arc::new(SessionTracker::default());
//!     let manager = RoomManager::new(sessions.clone(), RoomConfig::default());
//!
//!     let alice = Identity::new(1, "alice");
//!     let (_session, _events) = sessions.connect(alice.clone());
//!     let room_id = manager.create_room(&alice, GameType::PointsGame).await.unwrap();
//!     println!("created {room_id}");
//! }
//! ```

pub mod actor;
pub mod config;
pub mod manager;
pub mod messages;

pub use actor::{RoomActor, RoomHandle};
pub use config::RoomConfig;
pub use manager::RoomManager;
pub use messages::{RoomMessage, RoomMetadata};
