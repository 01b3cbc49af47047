//! Connected to a server or host as a client.

use tether_protocol::ConnectStatus;
use tether_transport::{ClientId, TransportAdapter};

use super::{ClientReconnecting, Offline, StateHandler, Transition};
use crate::context::StateContext;
use crate::method::ConnectionMethod;

#[derive(Debug)]
pub(crate) struct ClientConnected {
    method: ConnectionMethod,
    disconnect_reason: Option<ConnectStatus>,
}

impl ClientConnected {
    pub(crate) fn new(method: ConnectionMethod) -> Self {
        Self {
            method,
            disconnect_reason: None,
        }
    }

    /// The connection is gone. Reconnect if the reason allows it.
    fn connection_lost<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        let reason = self
            .disconnect_reason
            .take()
            .unwrap_or(ConnectStatus::GenericDisconnect);
        tracing::info!(endpoint = %self.method.endpoint, %reason, "lost connection");

        if reason.is_recoverable() {
            ctx.publish_status(ConnectStatus::Reconnecting);
            Some(ClientReconnecting::new(self.method.clone()).into())
        } else {
            ctx.publish_status(reason);
            Some(Offline.into())
        }
    }
}

impl StateHandler for ClientConnected {
    fn on_client_disconnect<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        if !ctx.is_local_client(client_id) {
            return None;
        }
        self.connection_lost(ctx)
    }

    fn on_disconnect_reason_received<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
        reason: ConnectStatus,
    ) -> Transition {
        self.disconnect_reason = Some(reason);
        None
    }

    fn on_user_requested_shutdown<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
    ) -> Transition {
        ctx.publish_status(ConnectStatus::UserRequestedDisconnect);
        Some(Offline.into())
    }

    fn on_transport_failure<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
    ) -> Transition {
        self.connection_lost(ctx)
    }
}
