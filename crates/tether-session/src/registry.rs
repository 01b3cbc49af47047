//! The session registry: which player is behind which client.
//!
//! The host (or dedicated server) consults it during connection approval to
//! spot duplicate logins and returning players, and updates it as clients
//! come and go.
//!
//! # Concurrency note
//!
//! `SessionRegistry` is a plain pair of `HashMap`s. It is owned by the
//! connection manager, which is itself driven from a single task, so there
//! is nothing to lock.

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

use tether_transport::ClientId;

use crate::{Admission, PlayerSession, SessionConfig, SessionError, SessionState};

/// Tracks every player session on a host or server.
///
/// ## Lifecycle
///
/// ```text
/// admit() ──→ [Connected] ──disconnect_client()──→ [Disconnected]
///                 ↑                                      │
///                 └─────────── admit() (within grace) ───┘
///                                                        │
///                                   expire_stale() ──→ removed
/// ```
#[derive(Debug)]
pub struct SessionRegistry {
    /// Sessions keyed by player id. A player has at most one session.
    sessions: HashMap<String, PlayerSession>,

    /// Reverse index for connected sessions only. Kept in sync with
    /// `sessions`: a client id is present iff its session is Connected and
    /// still bound to it.
    clients: HashMap<ClientId, String>,

    config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            clients: HashMap::new(),
            config,
        }
    }

    /// Binds an approved client to its player's session.
    ///
    /// # Errors
    /// Returns [`SessionError::EmptyPlayerId`] for an empty player id.
    pub fn admit(
        &mut self,
        client_id: ClientId,
        player_id: &str,
        player_name: &str,
    ) -> Result<Admission, SessionError> {
        if player_id.is_empty() {
            return Err(SessionError::EmptyPlayerId);
        }

        let grace = self.grace();
        let admission = match self.sessions.get(player_id) {
            None => Admission::New,
            Some(existing) => match existing.state {
                SessionState::Connected if existing.client_id == client_id => {
                    Admission::Unchanged
                }
                SessionState::Connected => Admission::Replaced {
                    previous: existing.client_id,
                },
                SessionState::Disconnected { since } => {
                    if since.elapsed() < grace {
                        Admission::Reconnected
                    } else {
                        Admission::New
                    }
                }
            },
        };

        if let Admission::Replaced { previous } = admission {
            self.clients.remove(&previous);
        }

        // A client id is only ever bound to one player.
        if let Some(stale_player) = self.clients.insert(client_id, player_id.to_string()) {
            if stale_player != player_id {
                self.sessions.remove(&stale_player);
            }
        }

        self.sessions.insert(
            player_id.to_string(),
            PlayerSession {
                player_id: player_id.to_string(),
                client_id,
                player_name: player_name.to_string(),
                state: SessionState::Connected,
            },
        );

        tracing::info!(%client_id, player_id, ?admission, "player session admitted");
        Ok(admission)
    }

    /// Marks the player behind `client_id` as disconnected and starts its
    /// grace period.
    ///
    /// # Errors
    /// [`SessionError::NotFound`] if no connected session is bound to
    /// `client_id` (never approved, or replaced by a newer login).
    pub fn disconnect_client(
        &mut self,
        client_id: ClientId,
    ) -> Result<&PlayerSession, SessionError> {
        let player_id = self
            .clients
            .remove(&client_id)
            .ok_or(SessionError::NotFound(client_id))?;

        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(client_id))?;
        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };

        tracing::info!(%client_id, player_id = %session.player_id, "player disconnected, grace period started");
        Ok(session)
    }

    /// Removes disconnected sessions whose grace period has elapsed.
    /// Returns the removed player ids.
    pub fn expire_stale(&mut self) -> Vec<String> {
        let grace = self.grace();
        let mut expired = Vec::new();

        self.sessions.retain(|player_id, session| match session.state {
            SessionState::Disconnected { since } if since.elapsed() >= grace => {
                expired.push(player_id.clone());
                false
            }
            _ => true,
        });

        for player_id in &expired {
            tracing::info!(%player_id, "session expired (grace period elapsed)");
        }
        expired
    }

    /// Forgets every session. Called when the host or server stops.
    pub fn clear(&mut self) {
        if !self.sessions.is_empty() {
            tracing::info!(sessions = self.sessions.len(), "clearing all sessions");
        }
        self.sessions.clear();
        self.clients.clear();
    }

    /// The connected session bound to `client_id`, if any.
    pub fn get_by_client(&self, client_id: ClientId) -> Option<&PlayerSession> {
        self.clients
            .get(&client_id)
            .and_then(|player_id| self.sessions.get(player_id))
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerSession> {
        self.sessions.get(player_id)
    }

    /// Number of sessions whose player is connected.
    pub fn connected_count(&self) -> usize {
        self.clients.len()
    }

    /// Number of sessions in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn grace(&self) -> Duration {
        Duration::from_secs(self.config.reconnect_grace_secs)
    }
}

// =========================================================================
// Tests
// =========================================================================
