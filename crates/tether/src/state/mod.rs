//! The nine connection states and the contract they share.
//!
//! ```text
//!                 ┌──────────────→ ClientConnecting ──→ ClientConnected ⇄ ClientReconnecting
//!                 │                      │                    │                   │
//!   Offline ──────┼──────────────→ StartingHost ─────→ Hosting ──┐                │
//!      ↑          │                      │                       ├→ DisconnectingWithReason
//!      │          └──────────────→ ServerStarting ──→ ServerListening ┘           │
//!      └────────────────────────── (every state can fall back) ←──────────────────┘
//! ```
//!
//! Each state implements [`StateHandler`]; every method has a do-nothing
//! default, so a state only overrides the events it cares about. A handler
//! returns the state to move to, if any. The manager performs the move
//! (`exit` → replace → `enter`), never the state itself.

mod client_connected;
mod client_connecting;
mod client_reconnecting;
mod disconnecting;
mod hosting;
mod offline;
mod server_listening;
mod server_starting;
mod serving;
mod starting_host;

use std::fmt;

use tether_protocol::ConnectStatus;
use tether_transport::{ClientId, Endpoint, TransportAdapter};

use crate::approval::{ApprovalRequest, ApprovalResponse};
use crate::context::StateContext;
use crate::method::ConnectionMethod;
use crate::timer::TimerTicket;

pub(crate) use client_connected::ClientConnected;
pub(crate) use client_connecting::ClientConnecting;
pub(crate) use client_reconnecting::ClientReconnecting;
pub(crate) use disconnecting::DisconnectingWithReason;
pub(crate) use hosting::Hosting;
pub(crate) use offline::Offline;
pub(crate) use server_listening::ServerListening;
pub(crate) use server_starting::ServerStarting;
pub(crate) use starting_host::StartingHost;

/// The state to move to after handling an event, if any.
pub(crate) type Transition = Option<ConnectionState>;

/// Which of the nine states the manager is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Offline,
    ClientConnecting,
    ClientConnected,
    ClientReconnecting,
    DisconnectingWithReason,
    ServerStarting,
    ServerListening,
    StartingHost,
    Hosting,
}

impl StateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::ClientConnecting => "client-connecting",
            Self::ClientConnected => "client-connected",
            Self::ClientReconnecting => "client-reconnecting",
            Self::DisconnectingWithReason => "disconnecting-with-reason",
            Self::ServerStarting => "server-starting",
            Self::ServerListening => "server-listening",
            Self::StartingHost => "starting-host",
            Self::Hosting => "hosting",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events and commands every state can receive.
///
/// Defaults ignore the event. Start commands return the state to move to,
/// or `None` when the state refuses them.
pub(crate) trait StateHandler {
    fn enter<T: TransportAdapter>(&mut self, _ctx: &mut StateContext<T>) -> Transition {
        None
    }

    fn exit<T: TransportAdapter>(&mut self, _ctx: &mut StateContext<T>) {}

    fn on_client_connected<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
        _client_id: ClientId,
    ) -> Transition {
        None
    }

    fn on_client_disconnect<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
        _client_id: ClientId,
    ) -> Transition {
        None
    }

    fn on_server_started<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
    ) -> Transition {
        None
    }

    fn approval_check<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
        _request: &ApprovalRequest,
    ) -> ApprovalResponse {
        ApprovalResponse::unanswered()
    }

    fn on_disconnect_reason_received<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
        _reason: ConnectStatus,
    ) -> Transition {
        None
    }

    fn on_user_requested_shutdown<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
    ) -> Transition {
        None
    }

    fn on_transport_failure<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
    ) -> Transition {
        None
    }

    fn on_timer<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
        _ticket: TimerTicket,
    ) -> Transition {
        None
    }

    fn start_client(&mut self, _method: ConnectionMethod) -> Transition {
        None
    }

    fn start_host(&mut self, _method: ConnectionMethod) -> Transition {
        None
    }

    fn start_server(&mut self, _endpoint: Endpoint) -> Transition {
        None
    }
}

/// The current state, owned by the manager.
#[derive(Debug)]
pub(crate) enum ConnectionState {
    Offline(Offline),
    ClientConnecting(ClientConnecting),
    ClientConnected(ClientConnected),
    ClientReconnecting(ClientReconnecting),
    DisconnectingWithReason(DisconnectingWithReason),
    ServerStarting(ServerStarting),
    ServerListening(ServerListening),
    StartingHost(StartingHost),
    Hosting(Hosting),
}

macro_rules! impl_from_state {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for ConnectionState {
                fn from(state: $variant) -> Self {
                    Self::$variant(state)
                }
            }
        )*
    };
}

impl_from_state!(
    Offline,
    ClientConnecting,
    ClientConnected,
    ClientReconnecting,
    DisconnectingWithReason,
    ServerStarting,
    ServerListening,
    StartingHost,
    Hosting,
);

/// Runs `$body` against whichever state is current.
macro_rules! dispatch {
    ($state:expr, $s:ident => $body:expr) => {
        match $state {
            ConnectionState::Offline($s) => $body,
            ConnectionState::ClientConnecting($s) => $body,
            ConnectionState::ClientConnected($s) => $body,
            ConnectionState::ClientReconnecting($s) => $body,
            ConnectionState::DisconnectingWithReason($s) => $body,
            ConnectionState::ServerStarting($s) => $body,
            ConnectionState::ServerListening($s) => $body,
            ConnectionState::StartingHost($s) => $body,
            ConnectionState::Hosting($s) => $body,
        }
    };
}

impl ConnectionState {
    pub(crate) fn kind(&self) -> StateKind {
        match self {
            Self::Offline(_) => StateKind::Offline,
            Self::ClientConnecting(_) => StateKind::ClientConnecting,
            Self::ClientConnected(_) => StateKind::ClientConnected,
            Self::ClientReconnecting(_) => StateKind::ClientReconnecting,
            Self::DisconnectingWithReason(_) => StateKind::DisconnectingWithReason,
            Self::ServerStarting(_) => StateKind::ServerStarting,
            Self::ServerListening(_) => StateKind::ServerListening,
            Self::StartingHost(_) => StateKind::StartingHost,
            Self::Hosting(_) => StateKind::Hosting,
        }
    }

    pub(crate) fn enter<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        dispatch!(self, s => s.enter(ctx))
    }

    pub(crate) fn exit<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) {
        dispatch!(self, s => s.exit(ctx))
    }

    pub(crate) fn on_client_connected<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        dispatch!(self, s => s.on_client_connected(ctx, client_id))
    }

    pub(crate) fn on_client_disconnect<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        dispatch!(self, s => s.on_client_disconnect(ctx, client_id))
    }

    pub(crate) fn on_server_started<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
    ) -> Transition {
        dispatch!(self, s => s.on_server_started(ctx))
    }

    pub(crate) fn approval_check<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        request: &ApprovalRequest,
    ) -> ApprovalResponse {
        dispatch!(self, s => s.approval_check(ctx, request))
    }

    pub(crate) fn on_disconnect_reason_received<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        reason: ConnectStatus,
    ) -> Transition {
        dispatch!(self, s => s.on_disconnect_reason_received(ctx, reason))
    }

    pub(crate) fn on_user_requested_shutdown<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
    ) -> Transition {
        dispatch!(self, s => s.on_user_requested_shutdown(ctx))
    }

    pub(crate) fn on_transport_failure<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
    ) -> Transition {
        dispatch!(self, s => s.on_transport_failure(ctx))
    }

    pub(crate) fn on_timer<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        ticket: TimerTicket,
    ) -> Transition {
        dispatch!(self, s => s.on_timer(ctx, ticket))
    }

    pub(crate) fn start_client(&mut self, method: ConnectionMethod) -> Transition {
        dispatch!(self, s => s.start_client(method))
    }

    pub(crate) fn start_host(&mut self, method: ConnectionMethod) -> Transition {
        dispatch!(self, s => s.start_host(method))
    }

    pub(crate) fn start_server(&mut self, endpoint: Endpoint) -> Transition {
        dispatch!(self, s => s.start_server(endpoint))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use tether_protocol::{Codec, ConnectionPayload, JsonCodec};
    use tether_transport::RecordingTransport;

    use super::*;
    use crate::{ConnectionConfig, ConnectionObservers};

    /// A context over a recording transport, plus a second handle to the
    /// same transport for assertions.
    pub(crate) fn context(
        config: ConnectionConfig,
    ) -> (StateContext<RecordingTransport>, RecordingTransport) {
        let transport = RecordingTransport::new();
        let ctx = StateContext::new(
            transport.clone(),
            config,
            ConnectionObservers::default(),
            "local-player".to_string(),
        );
        (ctx, transport)
    }

    pub(crate) fn payload_bytes(player_id: &str, name: &str, is_debug: bool) -> Vec<u8> {
        JsonCodec
            .encode(&ConnectionPayload {
                player_id: player_id.into(),
                player_name: name.into(),
                is_debug,
            })
            .unwrap()
    }

    pub(crate) fn request(client: u64, player_id: &str, name: &str) -> ApprovalRequest {
        ApprovalRequest {
            client_id: ClientId::new(client),
            payload: payload_bytes(player_id, name, false),
        }
    }
}
