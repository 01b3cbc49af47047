//! Running as a dedicated server: no local player.

use tether_protocol::ConnectStatus;
use tether_transport::{ClientId, Target, TransportAdapter};

use super::{serving, DisconnectingWithReason, Offline, StateHandler, Transition};
use crate::approval::{ApprovalRequest, ApprovalResponse};
use crate::context::StateContext;

#[derive(Debug, Default)]
pub(crate) struct ServerListening;

impl StateHandler for ServerListening {
    fn enter<T: TransportAdapter>(&mut self, _ctx: &mut StateContext<T>) -> Transition {
        tracing::info!("server listening");
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
            tracing::warn!(%client_id, "server endpoint went away");
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
        serving::approve(ctx, request, false)
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
    use tether_protocol::ChannelMessage;

    use super::*;
    use crate::ConnectionConfig;
    use crate::state::StateKind;
    use crate::state::test_support::{context, request};

    #[test]
    fn test_approval_tells_client_it_is_not_a_host() {
        let (mut ctx, transport) = context(ConnectionConfig::default());

        let response = ServerListening.approval_check(&mut ctx, &request(2, "p-amy", "Amy"));

        assert!(response.approved);
        let sent = transport.sent_messages();
        assert_eq!(
            ChannelMessage::decode(&sent[0].0, &sent[0].2).unwrap(),
            ChannelMessage::SuccessPayload { is_host: false }
        );
    }

    #[test]
    fn test_all_slots_go_to_remote_players() {
        let config = ConnectionConfig {
            max_connected_players: 2,
            ..Default::default()
        };
        let (mut ctx, transport) = context(config);
        transport.set_remote_clients(1);

        let response = ServerListening.approval_check(&mut ctx, &request(2, "p-amy", "Amy"));

        assert!(response.approved);
    }

    #[test]
    fn test_own_endpoint_lost_goes_offline_generic_disconnect() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.set_local_client_id(Some(ClientId::SERVER));
        ctx.publish_status(ConnectStatus::Success);

        let next = ServerListening.on_client_disconnect(&mut ctx, ClientId::SERVER);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
        assert_eq!(ctx.last_status, ConnectStatus::GenericDisconnect);
    }

    #[test]
    fn test_transport_failure_disconnects_with_generic_reason() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());

        let next = ServerListening.on_transport_failure(&mut ctx);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::DisconnectingWithReason));
    }
}
