//! Wire layer between connected clients and room actors.
//!
//! Messages are JSON objects tagged by a `type` field. Delivery to a client
//! goes through a [`broadcast::Broadcaster`], which never blocks the caller.

/// Outbound delivery seam used by room actors.
pub mod broadcast;

/// Client actions and server events.
pub mod messages;

pub use broadcast::{Broadcaster, DeliveryError};
pub use messages::{ClientAction, ServerEvent};
