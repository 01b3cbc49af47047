//! # Tether
//!
//! Connection lifecycle state machine for multiplayer games.
//!
//! A process joins a session as a client, hosts one with a local player, or
//! runs a dedicated server. Tether tracks which of those it is doing and how
//! far along it is, decides who may join, retries lost client connections a
//! bounded number of times, and tells peers why they are being disconnected.
//! The network itself stays behind [`TransportAdapter`].
//!
//! ## States
//!
//! `Offline`, `ClientConnecting`, `ClientConnected`, `ClientReconnecting`,
//! `StartingHost`, `Hosting`, `ServerStarting`, `ServerListening`, and
//! `DisconnectingWithReason`; see [`StateKind`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tether::prelude::*;
//!
//! let manager = ConnectionManagerBuilder::new()
//!     .player_id("a1b2c3")
//!     .build(my_transport);
//! let handle = ConnectionDriver::spawn(manager);
//!
//! // Wire the transport's callbacks into handle.transport_events(), then:
//! let mut status = handle.subscribe_status();
//! handle.start_client_ip("Alice", "127.0.0.1", 7777).await?;
//! ```

mod approval;
mod config;
mod context;
mod driver;
mod error;
mod manager;
mod method;
mod observers;
mod state;
mod timer;

pub use approval::{ApprovalRequest, ApprovalResponse, admission_status};
pub use config::ConnectionConfig;
pub use driver::{ConnectionDriver, ConnectionHandle, TransportEvents};
pub use error::TetherError;
pub use manager::{ConnectionManager, ConnectionManagerBuilder, ConnectionSnapshot};
pub use method::ConnectionMethod;
pub use observers::{ConnectionObservers, DEFAULT_OBSERVER_CAPACITY};
pub use state::StateKind;
pub use timer::{PendingTimer, TimerTicket};

pub use tether_protocol::{
    ConnectStatus, ConnectionEventMessage, ConnectionPayload, ReconnectMessage,
};
pub use tether_session::{SessionConfig, SessionRegistry};
pub use tether_transport::{ClientId, Endpoint, Target, TransportAdapter, TransportError};

pub mod prelude {
    pub use crate::{
        ApprovalRequest, ApprovalResponse, ClientId, ConnectStatus, ConnectionConfig,
        ConnectionDriver, ConnectionEventMessage, ConnectionHandle, ConnectionManager,
        ConnectionManagerBuilder, ConnectionMethod, Endpoint, ReconnectMessage, StateKind,
        Target, TetherError, TransportAdapter, TransportError, TransportEvents,
    };
}
