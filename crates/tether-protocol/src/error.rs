//! Error types for the protocol layer.
//!
//! Each crate in Tether defines its own error enum. A `ProtocolError` always
//! means bytes could not be turned into a message (or back), never that a
//! connection misbehaved.

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a structured payload failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserializing a structured payload failed (malformed JSON, missing
    /// fields, wrong types).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A fixed-size message arrived with the wrong number of bytes.
    #[error("invalid length for {message}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        message: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The byte does not name a [`ConnectStatus`](crate::ConnectStatus)
    /// that may travel on the wire.
    #[error("invalid connect status byte: {0}")]
    InvalidStatus(u8),

    /// A named message arrived under a name this protocol does not define.
    #[error("unknown named message: {0}")]
    UnknownMessage(String),

    /// The message decoded but violates a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
