//! Lost the connection; retrying a bounded number of times.
//!
//! The first attempt starts on entry. Each attempt publishes a
//! [`ReconnectMessage`] before connecting. After a failed attempt the state
//! waits `reconnect_delay` (plus jitter) on a timer and tries again, until
//! the attempts run out or the failure reason says the session is over.

use tether_protocol::{ConnectStatus, ReconnectMessage};
use tether_transport::{ClientId, TransportAdapter};

use super::{ClientConnected, Offline, StateHandler, Transition};
use crate::context::StateContext;
use crate::method::ConnectionMethod;
use crate::timer::TimerTicket;

#[derive(Debug)]
pub(crate) struct ClientReconnecting {
    method: ConnectionMethod,
    /// Attempts started so far.
    attempts: u32,
    /// A connect is outstanding and its outcome has not arrived yet.
    in_flight: bool,
    retry_timer: Option<TimerTicket>,
    disconnect_reason: Option<ConnectStatus>,
}

impl ClientReconnecting {
    pub(crate) fn new(method: ConnectionMethod) -> Self {
        Self {
            method,
            attempts: 0,
            in_flight: false,
            retry_timer: None,
            disconnect_reason: None,
        }
    }

    fn attempt<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        let max_attempt = ctx.config.reconnect_attempts;
        ctx.observers
            .publish_reconnect(ReconnectMessage::new(self.attempts, max_attempt));
        self.attempts += 1;
        self.disconnect_reason = None;

        ctx.transport.shutdown();
        match ctx.connect(&self.method) {
            Ok(()) => {
                self.in_flight = true;
                tracing::info!(attempt = self.attempts, max_attempt, "reconnect attempt started");
                None
            }
            Err(e) => {
                tracing::warn!(attempt = self.attempts, error = %e, "reconnect attempt could not start");
                self.attempt_failed(ctx, ConnectStatus::StartClientFailed)
            }
        }
    }

    fn attempt_failed<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        status: ConnectStatus,
    ) -> Transition {
        self.in_flight = false;
        let max_attempt = ctx.config.reconnect_attempts;

        if status.ends_session() {
            tracing::info!(%status, "reconnect refused, giving up");
            ctx.publish_status(status);
            return Some(Offline.into());
        }

        if self.attempts < max_attempt {
            let delay = ctx.config.retry_delay();
            self.retry_timer = Some(ctx.schedule_timer(delay));
            tracing::info!(
                attempt = self.attempts,
                max_attempt,
                %status,
                ?delay,
                "reconnect attempt failed, retrying"
            );
            return None;
        }

        tracing::info!(attempts = self.attempts, %status, "reconnect attempts exhausted");
        ctx.publish_status(status);
        Some(Offline.into())
    }
}

impl StateHandler for ClientReconnecting {
    fn enter<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        if ctx.config.reconnect_attempts == 0 {
            ctx.publish_status(ConnectStatus::GenericDisconnect);
            return Some(Offline.into());
        }
        self.attempt(ctx)
    }

    fn on_client_connected<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        client_id: ClientId,
    ) -> Transition {
        if !ctx.is_local_client(client_id) {
            return None;
        }
        tracing::info!(attempt = self.attempts, "reconnected");
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
        if !self.in_flight {
            tracing::debug!(%client_id, "disconnect with no attempt in flight, ignoring");
            return None;
        }
        let status = self
            .disconnect_reason
            .take()
            .unwrap_or(ConnectStatus::GenericDisconnect);
        self.attempt_failed(ctx, status)
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
        if !self.in_flight {
            return None;
        }
        let status = self
            .disconnect_reason
            .take()
            .unwrap_or(ConnectStatus::GenericDisconnect);
        self.attempt_failed(ctx, status)
    }

    fn on_timer<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        ticket: TimerTicket,
    ) -> Transition {
        if self.retry_timer != Some(ticket) {
            return None;
        }
        self.retry_timer = None;
        self.attempt(ctx)
    }
}
