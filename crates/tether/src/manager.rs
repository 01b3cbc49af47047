//! `ConnectionManager`: owns the current state and routes everything to it.
//!
//! The manager has no opinions of its own. Transport callbacks and public
//! commands go to the current state; when the state asks for a transition
//! the manager runs `exit()` on the old state, swaps in the new one, and runs
//! its `enter()`, repeating while `enter()` asks for yet another state.
//!
//! Everything here is synchronous and non-blocking. To drive a manager from
//! Tokio (timers included), hand it to
//! [`ConnectionDriver::spawn`](crate::ConnectionDriver::spawn).

use rand::Rng;
use tether_protocol::{ChannelMessage, ConnectStatus, ProtocolError};
use tether_session::SessionRegistry;
use tether_transport::{ClientId, Endpoint, TransportAdapter};

use crate::approval::{ApprovalRequest, ApprovalResponse};
use crate::context::StateContext;
use crate::method::ConnectionMethod;
use crate::observers::DEFAULT_OBSERVER_CAPACITY;
use crate::state::{ConnectionState, Offline, StateKind, Transition};
use crate::timer::{PendingTimer, TimerTicket};
use crate::{ConnectionConfig, ConnectionObservers, TetherError};

/// Point-in-time view of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub state: StateKind,
    pub last_status: ConnectStatus,
    pub is_connected_to_host: bool,
}

/// Builder for configuring a [`ConnectionManager`].
///
/// # Example
///
/// ```rust,ignore
/// let manager = ConnectionManagerBuilder::new()
///     .config(config)
///     .player_id("a1b2c3")
///     .build(my_transport);
/// ```
pub struct ConnectionManagerBuilder {
    config: ConnectionConfig,
    player_id: Option<String>,
    observer_capacity: usize,
}

impl ConnectionManagerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ConnectionConfig::default(),
            player_id: None,
            observer_capacity: DEFAULT_OBSERVER_CAPACITY,
        }
    }

    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the stable identity this process presents when it joins.
    ///
    /// Issuing identities is the caller's business. Without one, a random
    /// id is generated, which means a restarted process is a new player.
    pub fn player_id(mut self, player_id: &str) -> Self {
        self.player_id = Some(player_id.to_string());
        self
    }

    /// Messages buffered per observer subscriber and channel.
    pub fn observer_capacity(mut self, capacity: usize) -> Self {
        self.observer_capacity = capacity;
        self
    }

    /// Builds an offline manager around `transport`.
    pub fn build<T: TransportAdapter>(self, transport: T) -> ConnectionManager<T> {
        let player_id = self.player_id.unwrap_or_else(random_player_id);
        let ctx = StateContext::new(
            transport,
            self.config.validated(),
            ConnectionObservers::new(self.observer_capacity),
            player_id,
        );
        ConnectionManager {
            state: Offline.into(),
            ctx,
        }
    }
}

impl Default for ConnectionManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn random_player_id() -> String {
    format!("{:016x}", rand::rng().random::<u64>())
}

/// The connection lifecycle state machine.
///
/// Starts in `Offline`. `Offline::enter` is not run on construction, so
/// building a manager never touches the transport.
pub struct ConnectionManager<T: TransportAdapter> {
    state: ConnectionState,
    ctx: StateContext<T>,
}

impl<T: TransportAdapter> ConnectionManager<T> {
    /// Shorthand for `ConnectionManagerBuilder::new().config(config).build(transport)`.
    pub fn new(transport: T, config: ConnectionConfig) -> Self {
        ConnectionManagerBuilder::new().config(config).build(transport)
    }

    pub fn state_kind(&self) -> StateKind {
        self.state.kind()
    }

    /// The last status published to observers; `Undefined` until the first.
    pub fn last_status(&self) -> ConnectStatus {
        self.ctx.last_status
    }

    /// Whether the server we are connected to is a host (as opposed to a
    /// dedicated server). Cleared on every state change; set when the
    /// server's `SuccessPayload` arrives.
    pub fn is_connected_to_host(&self) -> bool {
        self.ctx.is_connected_to_host
    }

    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            state: self.state_kind(),
            last_status: self.last_status(),
            is_connected_to_host: self.is_connected_to_host(),
        }
    }

    pub fn observers(&self) -> &ConnectionObservers {
        &self.ctx.observers
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.ctx.config
    }

    pub fn player_id(&self) -> &str {
        &self.ctx.player_id
    }

    /// Player sessions known to this host or server.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.ctx.sessions
    }

    pub fn transport(&self) -> &T {
        &self.ctx.transport
    }

    /// The timer the current state is waiting on. Whoever drives the
    /// manager must call [`on_timer`](Self::on_timer) with its ticket once
    /// `delay` has elapsed.
    pub fn pending_timer(&self) -> Option<PendingTimer> {
        self.ctx.timers.pending()
    }

    // -----------------------------------------------------------------
    // Transport callbacks
    // -----------------------------------------------------------------

    pub fn on_client_connected(&mut self, client_id: ClientId) {
        let next = self.state.on_client_connected(&mut self.ctx, client_id);
        self.apply(next);
    }

    pub fn on_client_disconnect(&mut self, client_id: ClientId) {
        let next = self.state.on_client_disconnect(&mut self.ctx, client_id);
        self.apply(next);
    }

    pub fn on_server_started(&mut self) {
        let next = self.state.on_server_started(&mut self.ctx);
        self.apply(next);
    }

    /// Answers one connection request. Never changes state.
    pub fn approval_check(&mut self, request: &ApprovalRequest) -> ApprovalResponse {
        let response = self.state.approval_check(&mut self.ctx, request);
        tracing::debug!(
            client_id = %request.client_id,
            state = %self.state.kind(),
            approved = response.approved,
            reason = ?response.reason,
            "approval answered"
        );
        response
    }

    /// A named message arrived over the transport.
    ///
    /// Only the disconnect-reason channel is understood, and only from the
    /// server. Anything else is logged and dropped.
    pub fn on_named_message(&mut self, sender: ClientId, name: &str, payload: &[u8]) {
        if sender != ClientId::SERVER {
            tracing::debug!(%sender, name, "ignoring named message from a non-server peer");
            return;
        }
        match ChannelMessage::decode(name, payload) {
            Ok(ChannelMessage::SetDisconnectReason(reason)) => {
                tracing::info!(%reason, "disconnect reason received");
                let next = self
                    .state
                    .on_disconnect_reason_received(&mut self.ctx, reason);
                self.apply(next);
            }
            Ok(ChannelMessage::SuccessPayload { is_host }) => {
                tracing::debug!(is_host, "connection approved by server");
                self.ctx.is_connected_to_host = is_host;
            }
            Err(ProtocolError::UnknownMessage(name)) => {
                tracing::debug!(%name, "ignoring unknown named message");
            }
            Err(e) => {
                tracing::warn!(name, error = %e, "malformed channel message");
            }
        }
    }

    /// The transport failed on its own and will deliver nothing more.
    pub fn on_transport_failure(&mut self) {
        tracing::warn!(state = %self.state.kind(), "transport failure");
        let next = self.state.on_transport_failure(&mut self.ctx);
        self.apply(next);
    }

    /// The pending timer elapsed. Stale tickets are ignored.
    pub fn on_timer(&mut self, ticket: TimerTicket) {
        if !self.ctx.timers.fire(ticket) {
            tracing::debug!(%ticket, "ignoring stale timer");
            return;
        }
        let next = self.state.on_timer(&mut self.ctx, ticket);
        self.apply(next);
    }

    // -----------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------

    pub fn start_client_lobby(&mut self, player_name: &str) -> Result<(), TetherError> {
        self.start_client(ConnectionMethod::lobby(player_name))
    }

    pub fn start_client_ip(
        &mut self,
        player_name: &str,
        host: &str,
        port: u16,
    ) -> Result<(), TetherError> {
        self.start_client(ConnectionMethod::ip(player_name, host, port))
    }

    pub fn start_host_lobby(&mut self, player_name: &str) -> Result<(), TetherError> {
        self.start_host(ConnectionMethod::lobby(player_name))
    }

    pub fn start_host_ip(
        &mut self,
        player_name: &str,
        host: &str,
        port: u16,
    ) -> Result<(), TetherError> {
        self.start_host(ConnectionMethod::ip(player_name, host, port))
    }

    pub fn start_server_ip(&mut self, host: &str, port: u16) -> Result<(), TetherError> {
        self.start_server(Endpoint::ip(host, port))
    }

    /// Joins a session as a client.
    ///
    /// # Errors
    /// [`TetherError::InvalidState`] unless offline. Connection failures are
    /// not errors here; they arrive as a published status.
    pub fn start_client(&mut self, method: ConnectionMethod) -> Result<(), TetherError> {
        let next = self.state.start_client(method);
        self.accept("start client", next)
    }

    /// Starts hosting a session with a local player.
    pub fn start_host(&mut self, method: ConnectionMethod) -> Result<(), TetherError> {
        let next = self.state.start_host(method);
        self.accept("start host", next)
    }

    /// Starts a dedicated server.
    pub fn start_server(&mut self, endpoint: Endpoint) -> Result<(), TetherError> {
        let next = self.state.start_server(endpoint);
        self.accept("start server", next)
    }

    /// Leaves or ends the session, whatever the current state.
    pub fn request_shutdown(&mut self) {
        tracing::info!(state = %self.state.kind(), "shutdown requested");
        let next = self.state.on_user_requested_shutdown(&mut self.ctx);
        self.apply(next);
    }

    // -----------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------

    fn accept(&mut self, command: &'static str, next: Transition) -> Result<(), TetherError> {
        match next {
            Some(next) => {
                self.change_state(next);
                Ok(())
            }
            None => {
                let state = self.state.kind();
                tracing::warn!(command, %state, "command rejected");
                Err(TetherError::InvalidState { command, state })
            }
        }
    }

    fn apply(&mut self, next: Transition) {
        if let Some(next) = next {
            self.change_state(next);
        }
    }

    fn change_state(&mut self, next: ConnectionState) {
        let mut next = Some(next);
        while let Some(state) = next {
            let from = self.state.kind();
            self.state.exit(&mut self.ctx);
            // Timers belong to the state that armed them.
            self.ctx.timers.cancel();
            self.ctx.is_connected_to_host = false;
            self.state = state;
            tracing::info!(%from, to = %self.state.kind(), "connection state changed");
            next = self.state.enter(&mut self.ctx);
        }
    }
}
