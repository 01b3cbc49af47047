//! Waiting for the first connection to a server or host.

use tether_protocol::ConnectStatus;
use tether_transport::{ClientId, TransportAdapter};

use super::{ClientConnected, Offline, StateHandler, Transition};
use crate::context::StateContext;
use crate::method::ConnectionMethod;

#[derive(Debug)]
pub(crate) struct ClientConnecting {
    method: ConnectionMethod,
    /// Reason the server sent before dropping us, if any.
    disconnect_reason: Option<ConnectStatus>,
}

impl ClientConnecting {
    pub(crate) fn new(method: ConnectionMethod) -> Self {
        Self {
            method,
            disconnect_reason: None,
        }
    }

    fn fail<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        let status = self
            .disconnect_reason
            .take()
            .unwrap_or(ConnectStatus::StartClientFailed);
        tracing::info!(endpoint = %self.method.endpoint, %status, "client connect failed");
        ctx.publish_status(status);
        Some(Offline.into())
    }
}

impl StateHandler for ClientConnecting {
    fn enter<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        match ctx.connect(&self.method) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(endpoint = %self.method.endpoint, error = %e, "cannot start client");
                self.fail(ctx)
            }
        }
    }

    fn on_client_connected<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        if !ctx.is_local_client(client_id) {
            return None;
        }
        ctx.publish_status(ConnectStatus::Success);
        Some(ClientConnected::new(self.method.clone()).into())
    }

    fn on_client_disconnect<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        if !ctx.is_local_client(client_id) {
            return None;
        }
        self.fail(ctx)
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
        self.fail(ctx)
    }
}

#[cfg(test)]
mod tests {
    use tether_protocol::{Codec, ConnectionPayload, JsonCodec};
    use tether_transport::{Endpoint, TransportCall};

    use super::*;
    use crate::ConnectionConfig;
    use crate::state::StateKind;
    use crate::state::test_support::context;

    fn connecting() -> ClientConnecting {
        ClientConnecting::new(ConnectionMethod::ip("Alice", "10.0.0.5", 9000))
    }

    #[test]
    fn test_enter_connects_with_payload() {
        let (mut ctx, transport) = context(ConnectionConfig::default());

        assert!(connecting().enter(&mut ctx).is_none());

        let calls = transport.calls();
        let [TransportCall::Connect { endpoint, payload }] = calls.as_slice() else {
            panic!("expected one connect, got {calls:?}");
        };
        assert_eq!(*endpoint, Endpoint::ip("10.0.0.5", 9000));
        let decoded: ConnectionPayload = JsonCodec.decode(payload).unwrap();
        assert_eq!(decoded.player_id, "local-player");
        assert_eq!(decoded.player_name, "Alice");
        assert!(!decoded.is_debug);
    }

    #[test]
    fn test_enter_connect_error_goes_offline_start_client_failed() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.fail_connect(true);
        let mut status = ctx.observers.subscribe_status();

        let next = connecting().enter(&mut ctx);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
        assert_eq!(status.try_recv().unwrap(), ConnectStatus::StartClientFailed);
    }

    #[test]
    fn test_local_connected_publishes_success() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.set_local_client_id(Some(ClientId::new(4)));
        let mut status = ctx.observers.subscribe_status();

        let next = connecting().on_client_connected(&mut ctx, ClientId::new(4));

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::ClientConnected));
        assert_eq!(status.try_recv().unwrap(), ConnectStatus::Success);
    }

    #[test]
    fn test_disconnect_uses_received_reason() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        let mut status = ctx.observers.subscribe_status();
        let mut state = connecting();

        state.on_disconnect_reason_received(&mut ctx, ConnectStatus::ServerFull);
        let next = state.on_client_disconnect(&mut ctx, ClientId::new(1));

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
        assert_eq!(status.try_recv().unwrap(), ConnectStatus::ServerFull);
    }

    #[test]
    fn test_disconnect_without_reason_start_client_failed() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        let mut status = ctx.observers.subscribe_status();

        connecting().on_client_disconnect(&mut ctx, ClientId::new(1));

        assert_eq!(status.try_recv().unwrap(), ConnectStatus::StartClientFailed);
    }

    #[test]
    fn test_shutdown_publishes_user_requested() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());

        let next = connecting().on_user_requested_shutdown(&mut ctx);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
        assert_eq!(ctx.last_status, ConnectStatus::UserRequestedDisconnect);
    }
}
