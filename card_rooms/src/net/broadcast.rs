use std::sync::Arc;
use thiserror::Error;

use super::messages::ServerEvent;
use crate::game::UserId;

/// Why an event didn't reach a user.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum DeliveryError {
    #[error("user has no open session")]
    NotConnected,
    #[error("outbound queue is full")]
    Backpressure,
    #[error("session closed")]
    Disconnected,
}

/// Push events to connected users.
///
/// Implementations must not block; room actors call this from inside their
/// event loop.
pub trait Broadcaster: Send + Sync + 'static {
    /// Deliver to every open session of one user
    fn send(&self, user_id: UserId, event: ServerEvent) -> Result<(), DeliveryError>;

    /// Deliver to every open session. Returns how many sessions took it.
    fn send_all(&self, event: ServerEvent) -> usize;
}

impl<B: Broadcaster + ?Sized> Broadcaster for Arc<B> {
    fn send(&self, user_id: UserId, event: ServerEvent) -> Result<(), DeliveryError> {
        (**self).send(user_id, event)
    }

    fn send_all(&self, event: ServerEvent) -> usize {
        (**self).send_all(event)
    }
}
