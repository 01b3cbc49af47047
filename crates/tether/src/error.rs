//! Unified error type for Tether.

use tether_protocol::ProtocolError;
use tether_session::SessionError;
use tether_transport::TransportError;

use crate::state::StateKind;

/// Top-level error that wraps all crate-specific errors.
///
/// Errors raised inside a state (a failed connect, a malformed payload) are
/// turned into a [`ConnectStatus`](tether_protocol::ConnectStatus) and
/// published to observers instead; this type only reaches callers of the
/// public command surface.
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    /// A transport-level error (connect, bind, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (unknown client, empty player id).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A command arrived in a state that does not accept it. Nothing changed.
    #[error("cannot {command} while {state}")]
    InvalidState {
        command: &'static str,
        state: StateKind,
    },

    /// The connection driver task has stopped.
    #[error("connection driver is not running")]
    DriverClosed,
}
