//! The disconnect-reason channel.
//!
//! Two tiny named messages ride on the transport's generic named-message
//! facility:
//!
//! | Name | Direction | Payload |
//! |---|---|---|
//! | `SetDisconnectReason` | server → one/all clients | 1 byte, [`ConnectStatus`] |
//! | `SuccessPayload` | server → one client | 1 byte, `is_host` bool |
//!
//! Both are fire-and-forget. If the transport tears the connection down
//! before `SetDisconnectReason` arrives, the receiver simply never learns the
//! reason and falls back to a generic one.

use crate::{ConnectStatus, ProtocolError};

/// Message name for [`ChannelMessage::SetDisconnectReason`].
pub const SET_DISCONNECT_REASON: &str = "SetDisconnectReason";

/// Message name for [`ChannelMessage::SuccessPayload`].
pub const SUCCESS_PAYLOAD: &str = "SuccessPayload";

/// A decoded message of the disconnect-reason channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMessage {
    /// "You are about to be (or were) disconnected, and this is why."
    SetDisconnectReason(ConnectStatus),

    /// "Your connection was approved." `is_host` tells the client whether
    /// the other end is a combined host or a dedicated server.
    SuccessPayload { is_host: bool },
}

impl ChannelMessage {
    /// The transport-level message name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetDisconnectReason(_) => SET_DISCONNECT_REASON,
            Self::SuccessPayload { .. } => SUCCESS_PAYLOAD,
        }
    }

    /// Encodes the single payload byte.
    ///
    /// # Errors
    /// `SetDisconnectReason(Undefined)` is refused; `Undefined` never goes
    /// on the wire.
    pub fn encode(&self) -> Result<[u8; 1], ProtocolError> {
        match self {
            Self::SetDisconnectReason(status) => Ok([status.to_byte()?]),
            Self::SuccessPayload { is_host } => Ok([u8::from(*is_host)]),
        }
    }

    /// Decodes a message received under `name`.
    ///
    /// # Errors
    /// Unknown name, wrong payload length, or an invalid byte.
    pub fn decode(name: &str, payload: &[u8]) -> Result<Self, ProtocolError> {
        match name {
            SET_DISCONNECT_REASON => {
                let byte = single_byte(SET_DISCONNECT_REASON, payload)?;
                Ok(Self::SetDisconnectReason(ConnectStatus::from_byte(byte)?))
            }
            SUCCESS_PAYLOAD => {
                let is_host = match single_byte(SUCCESS_PAYLOAD, payload)? {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(ProtocolError::InvalidMessage(format!(
                            "SuccessPayload flag must be 0 or 1, got {other}"
                        )));
                    }
                };
                Ok(Self::SuccessPayload { is_host })
            }
            other => Err(ProtocolError::UnknownMessage(other.to_string())),
        }
    }
}

fn single_byte(
    message: &'static str,
    payload: &[u8],
) -> Result<u8, ProtocolError> {
    match payload {
        [byte] => Ok(*byte),
        _ => Err(ProtocolError::InvalidLength {
            message,
            expected: 1,
            actual: payload.len(),
        }),
    }
}
