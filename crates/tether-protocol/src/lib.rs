//! Wire protocol for Tether.
//!
//! This crate defines what the connection state machine says to its peers
//! and to its observers:
//!
//! - **Types** ([`ConnectStatus`], [`ReconnectMessage`],
//!   [`ConnectionEventMessage`], [`ConnectionPayload`]): outcomes and
//!   payloads.
//! - **Channel** ([`ChannelMessage`]): the two single-byte named messages
//!   that carry a disconnect reason and the approval result.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how the connection payload
//!   becomes bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or states; it only
//! turns values into bytes and back.

mod channel;
mod codec;
mod error;
mod types;

pub use channel::{ChannelMessage, SET_DISCONNECT_REASON, SUCCESS_PAYLOAD};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ConnectStatus, ConnectionEventMessage, ConnectionPayload, FixedPlayerName,
    ReconnectMessage,
};
