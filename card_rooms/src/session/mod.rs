//! Connected sessions and outbound event delivery.
//!
//! A user may hold several sessions at once (one per open connection). Each
//! session owns a bounded outbound queue; the transport drains it and writes
//! frames to the socket. Pushing never blocks: a full queue drops the event
//! for that session and a closed one is skipped.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashSet;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::{
    auth::Identity,
    game::UserId,
    net::{Broadcaster, DeliveryError, ServerEvent},
};

pub type SessionId = Uuid;

/// Default outbound queue depth per session
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

struct Session {
    identity: Identity,
    sender: mpsc::Sender<ServerEvent>,
    connected_at: DateTime<Utc>,
}

/// Presence entry for the online users listing
#[derive(Clone, Debug, Serialize)]
pub struct OnlineUser {
    pub user_id: UserId,
    pub display_name: String,
    pub sessions: usize,
    pub connected_at: DateTime<Utc>,
}

/// Result of closing a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionEnd {
    pub identity: Identity,
    /// Sessions the user still has open
    pub remaining_sessions: usize,
}

/// Session and presence tracker
pub struct SessionTracker {
    sessions: DashMap<SessionId, Session>,
    by_user: DashMap<UserId, HashSet<SessionId>>,
    channel_capacity: usize,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl SessionTracker {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            by_user: DashMap::new(),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Register a new session and return the receiving end of its queue
    pub fn connect(&self, identity: Identity) -> (SessionId, mpsc::Receiver<ServerEvent>) {
        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        let session_id = Uuid::new_v4();
        let user_id = identity.user_id;

        log::info!(
            "Session {} opened for user {} ({})",
            session_id,
            user_id,
            identity.display_name
        );

        self.sessions.insert(
            session_id,
            Session {
                identity,
                sender,
                connected_at: Utc::now(),
            },
        );
        self.by_user.entry(user_id).or_default().insert(session_id);

        (session_id, receiver)
    }

    /// Drop a session. Returns `None` for unknown ids.
    pub fn disconnect(&self, session_id: SessionId) -> Option<SessionEnd> {
        let (_, session) = self.sessions.remove(&session_id)?;
        let user_id = session.identity.user_id;

        let mut remaining_sessions = 0;
        if let Some(mut ids) = self.by_user.get_mut(&user_id) {
            ids.remove(&session_id);
            remaining_sessions = ids.len();
        }
        self.by_user.remove_if(&user_id, |_, ids| ids.is_empty());

        log::info!("Session {} closed for user {}", session_id, user_id);

        Some(SessionEnd {
            identity: session.identity,
            remaining_sessions,
        })
    }

    /// Queue an event on one session only
    pub fn send_to_session(
        &self,
        session_id: SessionId,
        event: ServerEvent,
    ) -> Result<(), DeliveryError> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(DeliveryError::NotConnected)?;
        session.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Backpressure,
            TrySendError::Closed(_) => DeliveryError::Disconnected,
        })
    }

    pub fn is_online(&self, user_id: UserId) -> bool {
        self.by_user.contains_key(&user_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Online users, ordered by user id
    pub fn online_users(&self) -> Vec<OnlineUser> {
        let mut users: Vec<OnlineUser> = self
            .by_user
            .iter()
            .filter_map(|entry| {
                let mut display_name = None;
                let mut connected_at: Option<DateTime<Utc>> = None;
                for session_id in entry.value() {
                    if let Some(session) = self.sessions.get(session_id) {
                        display_name.get_or_insert_with(|| session.identity.display_name.clone());
                        connected_at = Some(match connected_at {
                            Some(at) => at.min(session.connected_at),
                            None => session.connected_at,
                        });
                    }
                }
                Some(OnlineUser {
                    user_id: *entry.key(),
                    display_name: display_name?,
                    sessions: entry.value().len(),
                    connected_at: connected_at?,
                })
            })
            .collect();
        users.sort_by_key(|user| user.user_id);
        users
    }
}

impl Broadcaster for SessionTracker {
    fn send(&self, user_id: UserId, event: ServerEvent) -> Result<(), DeliveryError> {
        let session_ids: Vec<SessionId> = match self.by_user.get(&user_id) {
            Some(ids) => ids.iter().copied().collect(),
            None => return Err(DeliveryError::NotConnected),
        };

        let mut delivered = false;
        let mut backpressure = false;
        for session_id in session_ids {
            let Some(session) = self.sessions.get(&session_id) else {
                continue;
            };
            match session.sender.try_send(event.clone()) {
                Ok(()) => delivered = true,
                Err(TrySendError::Full(_)) => {
                    log::warn!(
                        "Session {} channel full, dropping event for user {}",
                        session_id,
                        user_id
                    );
                    backpressure = true;
                }
                Err(TrySendError::Closed(_)) => {
                    log::debug!("Session {} channel closed", session_id);
                }
            }
        }

        match (delivered, backpressure) {
            (true, _) => Ok(()),
            (false, true) => Err(DeliveryError::Backpressure),
            (false, false) => Err(DeliveryError::Disconnected),
        }
    }

    fn send_all(&self, event: ServerEvent) -> usize {
        let mut delivered = 0;
        for session in self.sessions.iter() {
            match session.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::warn!("Session {} channel full, dropping lobby event", session.key());
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }
}
