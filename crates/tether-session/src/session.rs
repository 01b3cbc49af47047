//! Session types: what the host remembers about each player.
//!
//! A session outlives the transport connection that created it. When a
//! client drops, its session is kept for a grace period so that the same
//! player coming back is recognised as a reconnect rather than a stranger.

use std::time::Instant;

use serde::Deserialize;
use tether_transport::ClientId;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session retention.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How long (in seconds) a disconnected player's session is kept.
    ///
    /// Default: 30 seconds. 0 forgets players as soon as they drop.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Whether the player behind a session is currently connected.
///
/// ```text
///   Connected ──(client dropped)──→ Disconnected ──(grace elapsed)──→ removed
///       ↑                               │
///       └──────(same player id)─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    /// Dropped at `since`.
    Disconnected { since: Instant },
}

// ---------------------------------------------------------------------------
// PlayerSession
// ---------------------------------------------------------------------------

/// The host's record of one player.
#[derive(Debug, Clone)]
pub struct PlayerSession {
    /// Stable player identity from the connection payload.
    pub player_id: String,

    /// The transport client currently (or last) serving this player.
    pub client_id: ClientId,

    /// Display name from the connection payload.
    pub player_name: String,

    pub state: SessionState,
}

impl PlayerSession {
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected)
    }
}

/// How a connecting client was admitted into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First time this player id is seen (or its old session expired).
    New,

    /// The player dropped earlier and came back within the grace period.
    Reconnected,

    /// The player was still connected through another client. The session
    /// now belongs to the new client; `previous` must be kicked.
    Replaced { previous: ClientId },

    /// This exact client was already admitted for this player.
    Unchanged,
}
