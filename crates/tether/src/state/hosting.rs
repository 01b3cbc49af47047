//! Running as a host: a server with a local player of our own.

use tether_protocol::ConnectStatus;
use tether_transport::{ClientId, Target, TransportAdapter};

use super::{serving, DisconnectingWithReason, Offline, StateHandler, Transition};
use crate::approval::{ApprovalRequest, ApprovalResponse};
use crate::context::StateContext;

#[derive(Debug, Default)]
pub(crate) struct Hosting;

impl StateHandler for Hosting {
    fn enter<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        tracing::info!(players = ctx.sessions.connected_count(), "hosting");
        None
    }

    fn exit<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) {
        ctx.sessions.clear();
    }

    fn on_client_connected<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        serving::client_connected(ctx, client_id);
        None
    }

    fn on_client_disconnect<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        if ctx.is_local(client_id) {
            tracing::warn!(%client_id, "host lost its own client");
            ctx.publish_status(ConnectStatus::GenericDisconnect);
            return Some(Offline.into());
        }
        serving::client_disconnected(ctx, client_id);
        None
    }

    fn approval_check<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        request: &ApprovalRequest,
    ) -> ApprovalResponse {
        serving::approve(ctx, request, true)
    }

    fn on_user_requested_shutdown<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
    ) -> Transition {
        Some(DisconnectingWithReason::new(ConnectStatus::HostEndedSession, Target::All).into())
    }

    fn on_transport_failure<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
    ) -> Transition {
        Some(DisconnectingWithReason::new(ConnectStatus::GenericDisconnect, Target::All).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConnectionConfig;
    use crate::state::StateKind;
    use crate::state::test_support::{context, request};

    #[test]
    fn test_ninth_player_rejected_server_full() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.set_local_client_id(Some(ClientId::SERVER));
        transport.set_remote_clients(7);

        let response = Hosting.approval_check(&mut ctx, &request(9, "p-ninth", "Ninth"));

        assert_eq!(response, ApprovalResponse::reject(ConnectStatus::ServerFull));
    }

    #[test]
    fn test_shutdown_disconnects_everyone_with_host_ended_session() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());

        let next = Hosting.on_user_requested_shutdown(&mut ctx);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::DisconnectingWithReason));
    }

    #[test]
    fn test_exit_clears_sessions() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        Hosting.approval_check(&mut ctx, &request(4, "p-bob", "Bob"));
        assert_eq!(ctx.sessions.len(), 1);

        Hosting.exit(&mut ctx);

        assert!(ctx.sessions.is_empty());
    }

    #[test]
    fn test_local_disconnect_goes_offline() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.set_local_client_id(Some(ClientId::SERVER));

        let next = Hosting.on_client_disconnect(&mut ctx, ClientId::SERVER);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
    }

    #[test]
    fn test_remote_disconnect_stays_hosting() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.set_local_client_id(Some(ClientId::SERVER));
        Hosting.approval_check(&mut ctx, &request(4, "p-bob", "Bob"));

        let next = Hosting.on_client_disconnect(&mut ctx, ClientId::new(4));

        assert!(next.is_none());
        assert!(!ctx.sessions.get("p-bob").unwrap().is_connected());
    }
}
