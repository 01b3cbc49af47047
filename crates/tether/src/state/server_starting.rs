//! Waiting for a dedicated server's listener to come up.

use tether_protocol::ConnectStatus;
use tether_transport::{ClientId, Endpoint, TransportAdapter};

use super::{Offline, ServerListening, StateHandler, Transition};
use crate::context::StateContext;

#[derive(Debug)]
pub(crate) struct ServerStarting {
    endpoint: Endpoint,
}

impl ServerStarting {
    pub(crate) fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn fail<T: TransportAdapter>(&self, ctx: &mut StateContext<T>) -> Transition {
        ctx.publish_status(ConnectStatus::StartHostFailed);
        Some(Offline.into())
    }
}

impl StateHandler for ServerStarting {
    fn enter<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        match ctx.transport.start_server(&self.endpoint) {
            Ok(()) => {
                tracing::info!(endpoint = %self.endpoint, "starting server");
                None
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "cannot start server");
                self.fail(ctx)
            }
        }
    }

    fn on_server_started<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
    ) -> Transition {
        ctx.publish_status(ConnectStatus::Success);
        Some(ServerListening.into())
    }

    fn on_client_disconnect<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        if !ctx.is_local(client_id) {
            return None;
        }
        self.fail(ctx)
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
    use tether_transport::TransportCall;

    use super::*;
    use crate::ConnectionConfig;
    use crate::state::StateKind;
    use crate::state::test_support::context;

    fn starting() -> ServerStarting {
        ServerStarting::new(Endpoint::ip("0.0.0.0", 7777))
    }

    #[test]
    fn test_enter_starts_server() {
        let (mut ctx, transport) = context(ConnectionConfig::default());

        assert!(starting().enter(&mut ctx).is_none());
        assert_eq!(
            transport.calls(),
            vec![TransportCall::StartServer(Endpoint::ip("0.0.0.0", 7777))]
        );
    }

    #[test]
    fn test_bind_failure_surfaces_start_host_failed() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.fail_start(true);

        let next = starting().enter(&mut ctx);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
        assert_eq!(ctx.last_status, ConnectStatus::StartHostFailed);
    }

    #[test]
    fn test_server_started_goes_listening() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());

        let next = starting().on_server_started(&mut ctx);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::ServerListening));
    }

    #[test]
    fn test_transport_failure_goes_offline() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());

        let next = starting().on_transport_failure(&mut ctx);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
        assert_eq!(ctx.last_status, ConnectStatus::StartHostFailed);
    }
}
