//! Transport adapter contract for Tether.
//!
//! Tether does not open sockets itself. The network session layer (a netcode
//! library, a relay service, an in-process loopback) is wrapped behind the
//! [`TransportAdapter`] trait, and its callbacks are fed back into the
//! connection manager.
//!
//! # Commands vs. callbacks
//!
//! Every method on [`TransportAdapter`] is a *command*: it queues work and
//! returns immediately. An `Err` means the command failed on the spot
//! (bad endpoint, bind refused). Anything that completes later (a connect
//! succeeding, a peer dropping, the listener binding) comes back as a
//! callback through the connection manager's event sink.
//!
//! Implementations must never invoke those callbacks from inside a command.
//!
//! # Feature Flags
//!
//! - `test-util`: [`RecordingTransport`], a test double that records every
//!   command in order

mod error;
#[cfg(feature = "test-util")]
mod recording;

pub use error::TransportError;
#[cfg(feature = "test-util")]
pub use recording::{RecordingTransport, TransportCall};

use std::fmt;

/// Identifier the transport assigns to each connected endpoint.
///
/// Tether never allocates these; it only reacts to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    /// The id a dedicated server or host uses for itself.
    pub const SERVER: ClientId = ClientId(0);

    /// Creates a new `ClientId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Where a client connects to, or where a host/server listens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// A direct address.
    Ip {
        /// Host name or IP literal.
        host: String,
        /// Port number.
        port: u16,
    },

    /// The relay allocation of the currently joined lobby.
    ///
    /// Resolving it is the transport's business.
    Lobby,
}

impl Endpoint {
    /// Shorthand for [`Endpoint::Ip`].
    pub fn ip(host: impl Into<String>, port: u16) -> Self {
        Self::Ip {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip { host, port } => write!(f, "{host}:{port}"),
            Self::Lobby => write!(f, "lobby-relay"),
        }
    }
}

/// Who a disconnect or named message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Every connected remote client.
    All,

    /// One specific client.
    Client(ClientId),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Client(id) => write!(f, "{id}"),
        }
    }
}

/// The network session layer as seen by the connection manager.
///
/// `Send + 'static` so the manager (which owns the adapter) can live inside
/// a Tokio task.
pub trait TransportAdapter: Send + 'static {
    /// Starts connecting to `endpoint` as a client, carrying `payload` in the
    /// connection request.
    ///
    /// Success is reported later through the client-connected callback for
    /// the local client id; failure through the client-disconnect callback.
    fn connect(
        &mut self,
        endpoint: &Endpoint,
        payload: &[u8],
    ) -> Result<(), TransportError>;

    /// Starts a combined server + local client on `endpoint`.
    ///
    /// `payload` is the local client's own connection request; it goes
    /// through approval like any other. Completion is reported through the
    /// server-started callback.
    fn start_host(
        &mut self,
        endpoint: &Endpoint,
        payload: &[u8],
    ) -> Result<(), TransportError>;

    /// Starts a dedicated server (no local player) on `endpoint`.
    fn start_server(
        &mut self,
        endpoint: &Endpoint,
    ) -> Result<(), TransportError>;

    /// Disconnects one remote client, or all of them.
    fn disconnect(&mut self, target: Target) -> Result<(), TransportError>;

    /// Sends an application-level named message over the reliable channel.
    fn send_named_message(
        &mut self,
        name: &str,
        target: Target,
        payload: &[u8],
    ) -> Result<(), TransportError>;

    /// Tears the whole session down before returning. Idempotent.
    ///
    /// No disconnect callbacks are delivered for the connections it closes.
    fn shutdown(&mut self);

    /// The id of the local endpoint, once the transport has assigned one.
    fn local_client_id(&self) -> Option<ClientId>;

    /// Number of remote clients currently connected. The local endpoint (a
    /// host's own client, or the server itself) is never counted.
    fn remote_client_count(&self) -> usize;
}
