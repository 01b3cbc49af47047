//! Connection approval: request, response, and the admission rules.
//!
//! Rules, in order:
//!
//! 1. The client's build flavour must match ours → else `IncompatibleBuildType`
//! 2. There must be room → else `ServerFull`
//!
//! A player id that is already connected through another client is *not* a
//! rejection: the newcomer is approved and the older client is kicked with
//! `LoggedInAgain`. Payload size and decoding are checked before any of this.

use tether_protocol::{ConnectStatus, ConnectionPayload};
use tether_transport::ClientId;

use crate::ConnectionConfig;

/// A client asking to join, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub client_id: ClientId,
    /// Encoded [`ConnectionPayload`].
    pub payload: Vec<u8>,
}

/// The single answer to an [`ApprovalRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalResponse {
    pub approved: bool,
    /// Why the request was rejected, if a reason was given.
    pub reason: Option<ConnectStatus>,
}

impl ApprovalResponse {
    pub fn approve() -> Self {
        Self {
            approved: true,
            reason: None,
        }
    }

    pub fn reject(reason: ConnectStatus) -> Self {
        Self {
            approved: false,
            reason: Some(reason),
        }
    }

    /// Rejection without a reason, from states that do not admit anyone.
    pub(crate) fn unanswered() -> Self {
        Self {
            approved: false,
            reason: None,
        }
    }
}

/// Applies the admission rules to a decoded payload.
///
/// `player_count` is the number of players already connected, including a
/// host's own player. Returns [`ConnectStatus::Success`] when the player may
/// join. Pure: the same inputs always give the same answer.
pub fn admission_status(
    config: &ConnectionConfig,
    payload: &ConnectionPayload,
    player_count: usize,
) -> ConnectStatus {
    if payload.is_debug != config.debug_build {
        return ConnectStatus::IncompatibleBuildType;
    }
    if player_count >= config.max_connected_players {
        return ConnectStatus::ServerFull;
    }
    ConnectStatus::Success
}
