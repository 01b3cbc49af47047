//! What `Hosting` and `ServerListening` have in common: admitting clients
//! and keeping their sessions in step with the transport.

use tether_protocol::{
    ChannelMessage, Codec, ConnectStatus, ConnectionEventMessage, ConnectionPayload,
};
use tether_session::Admission;
use tether_transport::{ClientId, Target, TransportAdapter};

use crate::approval::{ApprovalRequest, ApprovalResponse, admission_status};
use crate::context::StateContext;

/// Runs the full approval policy for a remote client.
///
/// Exactly one response per request. Approvals register the player's session
/// and send `SuccessPayload`; rejections send `SetDisconnectReason`. A player
/// back within the grace period is announced with a `Reconnecting` event.
pub(super) fn approve<T: TransportAdapter>(
    ctx: &mut StateContext<T>,
    request: &ApprovalRequest,
    is_host: bool,
) -> ApprovalResponse {
    let client_id = request.client_id;

    if request.payload.len() > ctx.config.max_connect_payload {
        tracing::warn!(
            %client_id,
            len = request.payload.len(),
            max = ctx.config.max_connect_payload,
            "connection payload too large"
        );
        return reject(ctx, client_id, ConnectStatus::GenericDisconnect, None);
    }

    let payload: ConnectionPayload = match ctx.codec.decode(&request.payload) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(%client_id, error = %e, "malformed connection payload");
            return reject(ctx, client_id, ConnectStatus::GenericDisconnect, None);
        }
    };

    ctx.sessions.expire_stale();

    let player_count = ctx.transport.remote_client_count() + usize::from(is_host);
    let status = admission_status(&ctx.config, &payload, player_count);
    if status != ConnectStatus::Success {
        return reject(ctx, client_id, status, Some(&payload.player_name));
    }

    let admission = match ctx
        .sessions
        .admit(client_id, &payload.player_id, &payload.player_name)
    {
        Ok(admission) => admission,
        Err(e) => {
            tracing::warn!(%client_id, error = %e, "cannot admit player");
            return reject(ctx, client_id, ConnectStatus::GenericDisconnect, None);
        }
    };

    match admission {
        Admission::Replaced { previous } => {
            ctx.disconnect_with_reason(Target::Client(previous), ConnectStatus::LoggedInAgain);
            ctx.observers.publish_event(ConnectionEventMessage::new(
                ConnectStatus::LoggedInAgain,
                &payload.player_name,
            ));
        }
        // Returned within the grace period.
        Admission::Reconnected => {
            ctx.observers.publish_event(ConnectionEventMessage::new(
                ConnectStatus::Reconnecting,
                &payload.player_name,
            ));
        }
        Admission::New | Admission::Unchanged => {}
    }

    ctx.send_channel_message(
        Target::Client(client_id),
        ChannelMessage::SuccessPayload { is_host },
    );
    tracing::info!(
        %client_id,
        player_id = %payload.player_id,
        player = %payload.player_name,
        ?admission,
        "connection approved"
    );
    ApprovalResponse::approve()
}

fn reject<T: TransportAdapter>(
    ctx: &mut StateContext<T>,
    client_id: ClientId,
    status: ConnectStatus,
    player_name: Option<&str>,
) -> ApprovalResponse {
    ctx.send_channel_message(
        Target::Client(client_id),
        ChannelMessage::SetDisconnectReason(status),
    );
    if let Some(name) = player_name {
        ctx.observers
            .publish_event(ConnectionEventMessage::new(status, name));
    }
    tracing::info!(%client_id, %status, "connection rejected");
    ApprovalResponse::reject(status)
}

pub(super) fn client_connected<T: TransportAdapter>(
    ctx: &mut StateContext<T>,
    client_id: ClientId,
) {
    match ctx.sessions.get_by_client(client_id) {
        Some(session) => {
            let event = ConnectionEventMessage::new(ConnectStatus::Success, &session.player_name);
            tracing::info!(%client_id, player = %session.player_name, "client joined");
            ctx.observers.publish_event(event);
        }
        None => tracing::debug!(%client_id, "connected client has no session"),
    }
}

pub(super) fn client_disconnected<T: TransportAdapter>(
    ctx: &mut StateContext<T>,
    client_id: ClientId,
) {
    match ctx.sessions.disconnect_client(client_id) {
        Ok(session) => {
            let event =
                ConnectionEventMessage::new(ConnectStatus::GenericDisconnect, &session.player_name);
            tracing::info!(%client_id, player = %session.player_name, "client left");
            ctx.observers.publish_event(event);
        }
        Err(e) => tracing::debug!(%client_id, error = %e, "disconnect for unknown client"),
    }
}

#[cfg(test)]
mod tests {
    use tether_transport::TransportCall;

    use super::*;
    use crate::ConnectionConfig;
    use crate::state::test_support::{context, payload_bytes, request};

    fn sent_reason(message: &(String, Target, Vec<u8>)) -> Option<ConnectStatus> {
        match ChannelMessage::decode(&message.0, &message.2).ok()? {
            ChannelMessage::SetDisconnectReason(status) => Some(status),
            ChannelMessage::SuccessPayload { .. } => None,
        }
    }

    #[test]
    fn test_approve_new_player_registers_session_and_sends_success_payload() {
        let (mut ctx, transport) = context(ConnectionConfig::default());

        let response = approve(&mut ctx, &request(5, "p-bob", "Bob"), true);

        assert_eq!(response, ApprovalResponse::approve());
        let session = ctx.sessions.get("p-bob").unwrap();
        assert_eq!(session.client_id, ClientId::new(5));
        let sent = transport.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            ChannelMessage::decode(&sent[0].0, &sent[0].2).unwrap(),
            ChannelMessage::SuccessPayload { is_host: true }
        );
        assert_eq!(sent[0].1, Target::Client(ClientId::new(5)));
    }

    #[test]
    fn test_approve_host_counts_itself() {
        let config = ConnectionConfig {
            max_connected_players: 2,
            ..Default::default()
        };
        let (mut ctx, transport) = context(config);
        transport.set_remote_clients(1);

        let as_host = approve(&mut ctx, &request(5, "p-bob", "Bob"), true);
        let as_server = approve(&mut ctx, &request(6, "p-carol", "Carol"), false);

        assert_eq!(as_host, ApprovalResponse::reject(ConnectStatus::ServerFull));
        assert_eq!(as_server, ApprovalResponse::approve());
    }

    #[test]
    fn test_approve_full_sends_reason_to_client() {
        let config = ConnectionConfig {
            max_connected_players: 1,
            ..Default::default()
        };
        let (mut ctx, transport) = context(config);
        let mut events = ctx.observers.subscribe_events();

        let response = approve(&mut ctx, &request(5, "p-bob", "Bob"), true);

        assert_eq!(response, ApprovalResponse::reject(ConnectStatus::ServerFull));
        let sent = transport.sent_messages();
        assert_eq!(sent_reason(&sent[0]), Some(ConnectStatus::ServerFull));
        assert_eq!(sent[0].1, Target::Client(ClientId::new(5)));
        assert!(ctx.sessions.is_empty());
        assert_eq!(events.try_recv().unwrap().connect_status, ConnectStatus::ServerFull);
    }

    #[test]
    fn test_approve_incompatible_build() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        let debug_request = ApprovalRequest {
            client_id: ClientId::new(5),
            payload: payload_bytes("p-bob", "Bob", true),
        };

        let response = approve(&mut ctx, &debug_request, true);

        assert_eq!(
            response,
            ApprovalResponse::reject(ConnectStatus::IncompatibleBuildType)
        );
    }

    #[test]
    fn test_approve_oversized_payload_rejected_unread() {
        let config = ConnectionConfig {
            max_connect_payload: 8,
            ..Default::default()
        };
        let (mut ctx, _transport) = context(config);

        let response = approve(&mut ctx, &request(5, "p-bob", "Bob"), false);

        assert_eq!(
            response,
            ApprovalResponse::reject(ConnectStatus::GenericDisconnect)
        );
    }

    #[test]
    fn test_approve_garbage_payload_rejected() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        let garbage = ApprovalRequest {
            client_id: ClientId::new(5),
            payload: b"not json".to_vec(),
        };

        let response = approve(&mut ctx, &garbage, false);

        assert_eq!(
            response,
            ApprovalResponse::reject(ConnectStatus::GenericDisconnect)
        );
    }

    #[test]
    fn test_approve_duplicate_login_kicks_old_client_reason_first() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        approve(&mut ctx, &request(5, "p-bob", "Bob"), false);
        transport.take_calls();

        let response = approve(&mut ctx, &request(9, "p-bob", "Bob"), false);

        assert_eq!(response, ApprovalResponse::approve());
        let calls = transport.calls();
        let old = Target::Client(ClientId::new(5));
        let reason_at = calls
            .iter()
            .position(|c| matches!(c, TransportCall::SendNamedMessage { target, .. } if *target == old))
            .unwrap();
        let kick_at = calls
            .iter()
            .position(|c| *c == TransportCall::Disconnect(old))
            .unwrap();
        assert!(reason_at < kick_at);
        assert_eq!(ctx.sessions.get("p-bob").unwrap().client_id, ClientId::new(9));
    }

    #[test]
    fn test_approve_same_request_twice_same_answer() {
        let (mut ctx, transport) = context(ConnectionConfig::default());

        let first = approve(&mut ctx, &request(5, "p-bob", "Bob"), false);
        let second = approve(&mut ctx, &request(5, "p-bob", "Bob"), false);

        assert_eq!(first, second);
        assert!(
            !transport.calls().iter().any(|c| matches!(c, TransportCall::Disconnect(_))),
            "re-approving the same client kicks nobody"
        );
    }

    #[test]
    fn test_client_disconnected_publishes_named_event() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        approve(&mut ctx, &request(5, "p-bob", "Bob"), false);
        let mut events = ctx.observers.subscribe_events();

        client_disconnected(&mut ctx, ClientId::new(5));

        let event = events.try_recv().unwrap();
        assert_eq!(event.connect_status, ConnectStatus::GenericDisconnect);
        assert_eq!(event.player_name.as_str(), "Bob");
    }

    #[test]
    fn test_approve_returning_player_publishes_reconnecting_event() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        approve(&mut ctx, &request(5, "p-bob", "Bob"), false);
        client_disconnected(&mut ctx, ClientId::new(5));
        let mut events = ctx.observers.subscribe_events();

        let response = approve(&mut ctx, &request(8, "p-bob", "Bob"), false);

        assert!(response.approved);
        let event = events.try_recv().unwrap();
        assert_eq!(event.connect_status, ConnectStatus::Reconnecting);
        assert_eq!(event.player_name.as_str(), "Bob");
    }

    #[test]
    fn test_approve_new_player_publishes_no_reconnect_event() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        let mut events = ctx.observers.subscribe_events();

        approve(&mut ctx, &request(5, "p-bob", "Bob"), false);

        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_client_connected_without_session_publishes_nothing() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        let mut events = ctx.observers.subscribe_events();

        client_connected(&mut ctx, ClientId::new(77));

        assert!(events.try_recv().is_err());
    }
}
