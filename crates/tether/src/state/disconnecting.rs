//! A host or server telling clients why they are being dropped, then
//! dropping them.
//!
//! On entry the reason goes out first and the transport disconnect second,
//! for the same target. The state then waits until the target is gone or
//! the drain timer fires, and goes offline either way.

use tether_protocol::ConnectStatus;
use tether_transport::{ClientId, Target, TransportAdapter};

use super::{Offline, StateHandler, Transition};
use crate::context::StateContext;
use crate::timer::TimerTicket;

#[derive(Debug)]
pub(crate) struct DisconnectingWithReason {
    reason: ConnectStatus,
    target: Target,
    drain_timer: Option<TimerTicket>,
}

impl DisconnectingWithReason {
    pub(crate) fn new(reason: ConnectStatus, target: Target) -> Self {
        Self {
            reason,
            target,
            drain_timer: None,
        }
    }
}

impl StateHandler for DisconnectingWithReason {
    fn enter<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        ctx.disconnect_with_reason(self.target, self.reason);

        if self.target == Target::All && ctx.transport.remote_client_count() == 0 {
            return Some(Offline.into());
        }
        self.drain_timer = Some(ctx.schedule_timer(ctx.config.disconnect_drain));
        None
    }

    fn on_client_disconnect<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        let drained = match self.target {
            _ if ctx.is_local(client_id) => true,
            Target::All => ctx.transport.remote_client_count() == 0,
            Target::Client(target) => target == client_id,
        };
        if drained {
            tracing::debug!(target = %self.target, "disconnect drained");
            return Some(Offline.into());
        }
        None
    }

    fn on_timer<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
        ticket: TimerTicket,
    ) -> Transition {
        if self.drain_timer != Some(ticket) {
            return None;
        }
        tracing::debug!(target = %self.target, "disconnect drain timed out");
        Some(Offline.into())
    }

    fn on_user_requested_shutdown<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
    ) -> Transition {
        Some(Offline.into())
    }

    fn on_transport_failure<T: TransportAdapter>(
        &mut self,
        _ctx: &mut StateContext<T>,
    ) -> Transition {
        Some(Offline.into())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tether_protocol::ChannelMessage;
    use tether_transport::TransportCall;

    use super::*;
    use crate::ConnectionConfig;
    use crate::state::StateKind;
    use crate::state::test_support::context;

    fn host_ended() -> DisconnectingWithReason {
        DisconnectingWithReason::new(ConnectStatus::HostEndedSession, Target::All)
    }

    #[test]
    fn test_enter_sends_reason_before_disconnect() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.set_remote_clients(2);

        assert!(host_ended().enter(&mut ctx).is_none());

        let calls = transport.calls();
        let reason = ChannelMessage::SetDisconnectReason(ConnectStatus::HostEndedSession);
        assert_eq!(
            calls,
            vec![
                TransportCall::SendNamedMessage {
                    name: reason.name().to_string(),
                    target: Target::All,
                    payload: reason.encode().unwrap().to_vec(),
                },
                TransportCall::Disconnect(Target::All),
            ]
        );
    }

    #[test]
    fn test_enter_without_clients_goes_offline_at_once() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());

        let next = host_ended().enter(&mut ctx);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
        assert!(ctx.timers.pending().is_none());
    }

    #[test]
    fn test_enter_arms_drain_timer() {
        let config = ConnectionConfig {
            disconnect_drain: Duration::from_millis(250),
            ..Default::default()
        };
        let (mut ctx, transport) = context(config);
        transport.set_remote_clients(1);

        host_ended().enter(&mut ctx);

        assert_eq!(ctx.timers.pending().unwrap().delay, Duration::from_millis(250));
    }

    #[test]
    fn test_last_client_leaving_goes_offline() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.set_remote_clients(2);
        let mut state = host_ended();
        state.enter(&mut ctx);

        transport.set_remote_clients(1);
        assert!(state.on_client_disconnect(&mut ctx, ClientId::new(1)).is_none());
        transport.set_remote_clients(0);
        let next = state.on_client_disconnect(&mut ctx, ClientId::new(2));

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
    }

    #[test]
    fn test_drain_timer_goes_offline() {
        let (mut ctx, transport) = context(ConnectionConfig::default());
        transport.set_remote_clients(3);
        let mut state = host_ended();
        state.enter(&mut ctx);
        let ticket = ctx.timers.pending().unwrap().ticket;

        let next = state.on_timer(&mut ctx, ticket);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
    }

    #[test]
    fn test_single_target_waits_for_that_client() {
        let (mut ctx, _transport) = context(ConnectionConfig::default());
        let target = ClientId::new(4);
        let mut state = DisconnectingWithReason::new(ConnectStatus::ServerFull, Target::Client(target));
        state.enter(&mut ctx);

        assert!(state.on_client_disconnect(&mut ctx, ClientId::new(5)).is_none());
        let next = state.on_client_disconnect(&mut ctx, target);

        assert_eq!(next.map(|s| s.kind()), Some(StateKind::Offline));
    }
}
