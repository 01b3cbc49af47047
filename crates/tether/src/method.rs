//! How a client or host reaches the session.

use tether_transport::Endpoint;

/// Endpoint plus the local player's display name.
///
/// Kept by the client states so a reconnect uses exactly what the first
/// connect used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMethod {
    pub endpoint: Endpoint,
    pub player_name: String,
}

impl ConnectionMethod {
    /// Direct connection to `host:port`.
    pub fn ip(player_name: &str, host: &str, port: u16) -> Self {
        Self {
            endpoint: Endpoint::ip(host, port),
            player_name: player_name.to_string(),
        }
    }

    /// Through the relay of the currently joined lobby.
    pub fn lobby(player_name: &str) -> Self {
        Self {
            endpoint: Endpoint::Lobby,
            player_name: player_name.to_string(),
        }
    }
}
