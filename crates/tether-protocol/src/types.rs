//! Core protocol types: connection outcomes and the messages observers see.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// ConnectStatus
// ---------------------------------------------------------------------------

/// Outcome of a connection attempt, or the reason a connection ended.
///
/// The discriminant is the wire byte. `Undefined` is only ever a default and
/// never encodes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ConnectStatus {
    #[default]
    Undefined = 0,
    /// Connected. Also used for a successful reconnect.
    Success = 1,
    /// The server is at capacity.
    ServerFull = 2,
    /// The same player logged in from another client, which replaced this one.
    LoggedInAgain = 3,
    /// The local user asked to disconnect.
    UserRequestedDisconnect = 4,
    /// The connection dropped without a specific reason.
    GenericDisconnect = 5,
    /// Lost the connection and trying to get it back.
    Reconnecting = 6,
    /// Client and server builds do not match.
    IncompatibleBuildType = 7,
    /// The host ended the session on purpose.
    HostEndedSession = 8,
    /// The host or server could not bind.
    StartHostFailed = 9,
    /// Connecting to the server failed, or the endpoint was invalid.
    StartClientFailed = 10,
}

impl ConnectStatus {
    /// All statuses in wire order.
    pub const ALL: [ConnectStatus; 11] = [
        Self::Undefined,
        Self::Success,
        Self::ServerFull,
        Self::LoggedInAgain,
        Self::UserRequestedDisconnect,
        Self::GenericDisconnect,
        Self::Reconnecting,
        Self::IncompatibleBuildType,
        Self::HostEndedSession,
        Self::StartHostFailed,
        Self::StartClientFailed,
    ];

    /// Whether losing the connection for this reason should trigger
    /// automatic reconnection.
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::GenericDisconnect)
    }

    /// Whether this reason means the session is over for good, so a
    /// reconnect attempt in progress must stop.
    pub fn ends_session(self) -> bool {
        matches!(
            self,
            Self::UserRequestedDisconnect
                | Self::HostEndedSession
                | Self::ServerFull
                | Self::IncompatibleBuildType
                | Self::LoggedInAgain
        )
    }

    /// The single wire byte for this status.
    ///
    /// # Errors
    /// `Undefined` is not allowed on the wire.
    pub fn to_byte(self) -> Result<u8, ProtocolError> {
        match self {
            Self::Undefined => Err(ProtocolError::InvalidMessage(
                "Undefined connect status cannot be sent".into(),
            )),
            other => Ok(other as u8),
        }
    }

    /// Parses a wire byte.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidStatus`] for `0` (Undefined) and for
    /// bytes past the last variant.
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match Self::ALL.get(byte as usize) {
            Some(Self::Undefined) | None => {
                Err(ProtocolError::InvalidStatus(byte))
            }
            Some(status) => Ok(*status),
        }
    }
}

impl fmt::Display for ConnectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ---------------------------------------------------------------------------
// ReconnectMessage
// ---------------------------------------------------------------------------

/// Progress of an automatic reconnection, published before every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectMessage {
    /// Zero-based number of the attempt about to run.
    pub current_attempt: u32,
    /// Total attempts allowed.
    pub max_attempt: u32,
}

impl ReconnectMessage {
    pub fn new(current_attempt: u32, max_attempt: u32) -> Self {
        debug_assert!(current_attempt <= max_attempt);
        Self {
            current_attempt,
            max_attempt,
        }
    }
}

// ---------------------------------------------------------------------------
// FixedPlayerName
// ---------------------------------------------------------------------------

/// A player name stored inline in a fixed 32-byte buffer.
///
/// Holds at most [`FixedPlayerName::CAPACITY`] UTF-8 bytes. Longer names are
/// cut at the last character boundary that fits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct FixedPlayerName {
    len: u8,
    bytes: [u8; Self::CAPACITY],
}

impl FixedPlayerName {
    /// Maximum name length in bytes.
    pub const CAPACITY: usize = 31;

    /// Size of the encoded form: one length byte plus the buffer.
    pub const ENCODED_LEN: usize = Self::CAPACITY + 1;

    /// Builds a name, truncating on a character boundary if needed.
    pub fn new(name: &str) -> Self {
        let mut end = name.len().min(Self::CAPACITY);
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; Self::CAPACITY];
        bytes[..end].copy_from_slice(&name.as_bytes()[..end]);
        Self {
            len: end as u8,
            bytes,
        }
    }

    pub fn as_str(&self) -> &str {
        // `new` and `decode` only ever store valid UTF-8.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Writes the fixed-size encoding (length byte, then the whole buffer).
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0] = self.len;
        out[1..].copy_from_slice(&self.bytes);
        out
    }

    /// Reads the fixed-size encoding.
    ///
    /// # Errors
    /// Wrong length, a length byte past capacity, or invalid UTF-8.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() != Self::ENCODED_LEN {
            return Err(ProtocolError::InvalidLength {
                message: "FixedPlayerName",
                expected: Self::ENCODED_LEN,
                actual: data.len(),
            });
        }
        let len = data[0] as usize;
        if len > Self::CAPACITY {
            return Err(ProtocolError::InvalidMessage(format!(
                "player name length {len} exceeds {}",
                Self::CAPACITY
            )));
        }
        std::str::from_utf8(&data[1..1 + len]).map_err(|e| {
            ProtocolError::InvalidMessage(format!("player name is not UTF-8: {e}"))
        })?;
        let mut bytes = [0u8; Self::CAPACITY];
        bytes[..len].copy_from_slice(&data[1..1 + len]);
        Ok(Self {
            len: len as u8,
            bytes,
        })
    }
}

impl Default for FixedPlayerName {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for FixedPlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FixedPlayerName").field(&self.as_str()).finish()
    }
}

impl fmt::Display for FixedPlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FixedPlayerName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for FixedPlayerName {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl From<FixedPlayerName> for String {
    fn from(name: FixedPlayerName) -> Self {
        name.as_str().to_owned()
    }
}

// ---------------------------------------------------------------------------
// ConnectionEventMessage
// ---------------------------------------------------------------------------

/// Published on the host/server whenever a client's connect, disconnect, or
/// approval completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionEventMessage {
    pub connect_status: ConnectStatus,
    pub player_name: FixedPlayerName,
}

impl ConnectionEventMessage {
    /// Size of the fixed encoding: status byte + name.
    pub const ENCODED_LEN: usize = 1 + FixedPlayerName::ENCODED_LEN;

    pub fn new(connect_status: ConnectStatus, player_name: &str) -> Self {
        Self {
            connect_status,
            player_name: FixedPlayerName::new(player_name),
        }
    }

    /// Fixed-size encoding, suitable for a size-constrained channel.
    ///
    /// # Errors
    /// Fails if the status is `Undefined`.
    pub fn encode(&self) -> Result<[u8; Self::ENCODED_LEN], ProtocolError> {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0] = self.connect_status.to_byte()?;
        out[1..].copy_from_slice(&self.player_name.encode());
        Ok(out)
    }

    /// # Errors
    /// Wrong length, invalid status byte, or invalid name.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() != Self::ENCODED_LEN {
            return Err(ProtocolError::InvalidLength {
                message: "ConnectionEventMessage",
                expected: Self::ENCODED_LEN,
                actual: data.len(),
            });
        }
        Ok(Self {
            connect_status: ConnectStatus::from_byte(data[0])?,
            player_name: FixedPlayerName::decode(&data[1..])?,
        })
    }
}

// ---------------------------------------------------------------------------
// ConnectionPayload
// ---------------------------------------------------------------------------

/// Identity a client presents in its connection request.
///
/// Field names on the wire are camelCase (`playerId`, `playerName`,
/// `isDebug`) so engines on either side agree on the JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPayload {
    /// Stable player identity, issued outside Tether.
    pub player_id: String,
    /// Display name.
    pub player_name: String,
    /// Whether the client is a debug build. Must match the server's build.
    pub is_debug: bool,
}

// =========================================================================
// Tests
// =========================================================================
