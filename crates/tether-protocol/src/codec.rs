//! Codec trait and implementations for structured payloads.
//!
//! Only the connection payload is structured; the disconnect-reason channel
//! uses fixed single-byte encodings (see [`ChannelMessage`](crate::ChannelMessage)).
//! Keeping the codec behind a trait lets a host swap JSON for a binary format
//! without touching the state machine.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because the connection manager, which owns a
/// codec, runs inside a Tokio task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// This is the format connection payloads use on the wire, so clients and
/// hosts built from different engines can still read each other.
///
/// ```rust
/// use tether_protocol::{Codec, ConnectionPayload, JsonCodec};
///
/// let payload = ConnectionPayload {
///     player_id: "a1b2".into(),
///     player_name: "Alice".into(),
///     is_debug: false,
/// };
///
/// let bytes = JsonCodec.encode(&payload).unwrap();
/// let decoded: ConnectionPayload = JsonCodec.decode(&bytes).unwrap();
/// assert_eq!(payload, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
