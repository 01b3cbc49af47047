//! Error types for the session layer.

use tether_transport::ClientId;

/// Errors that can occur while tracking player sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No connected session is bound to this client id.
    /// Happens for clients that were never approved, or whose session was
    /// taken over by a newer login of the same player.
    #[error("no session bound to {0}")]
    NotFound(ClientId),

    /// A player id in a connection request was empty.
    #[error("player id must not be empty")]
    EmptyPlayerId,
}
