//! Waiting for the host's listener to come up.
//!
//! Only the host's own client is admitted here; everyone else has to wait
//! until `Hosting`.

use tether_protocol::{Codec, ConnectStatus, ConnectionPayload};
use tether_transport::{ClientId, TransportAdapter};

use super::{Hosting, Offline, StateHandler, Transition};
use crate::approval::{ApprovalRequest, ApprovalResponse};
use crate::context::StateContext;
use crate::method::ConnectionMethod;
use crate::TetherError;

#[derive(Debug)]
pub(crate) struct StartingHost {
    method: ConnectionMethod,
}

impl StartingHost {
    pub(crate) fn new(method: ConnectionMethod) -> Self {
        Self { method }
    }

    fn start<T: TransportAdapter>(&self, ctx: &mut StateContext<T>) -> Result<(), TetherError> {
        let payload = ctx.connection_payload(&self.method.player_name)?;
        ctx.transport.start_host(&self.method.endpoint, &payload)?;
        tracing::info!(endpoint = %self.method.endpoint, "starting host");
        Ok(())
    }

    fn fail<T: TransportAdapter>(&self, ctx: &mut StateContext<T>) -> Transition {
        ctx.publish_status(ConnectStatus::StartHostFailed);
        Some(Offline.into())
    }

    fn admit_host<T: TransportAdapter>(
        &self,
        ctx: &mut StateContext<T>,
        request: &ApprovalRequest,
    ) -> Result<(), TetherError> {
        let payload: ConnectionPayload = ctx.codec.decode(&request.payload)?;
        ctx.sessions
            .admit(request.client_id, &payload.player_id, &payload.player_name)?;
        Ok(())
    }
}

impl StateHandler for StartingHost {
    fn enter<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        match self.start(ctx) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(endpoint = %self.method.endpoint, error = %e, "cannot start host");
                self.fail(ctx)
            }
        }
    }

    fn on_server_started<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
    ) -> Transition {
        ctx.publish_status(ConnectStatus::Success);
        Some(Hosting.into())
    }

    // The listener is not up yet, so the only client that can possibly
    // show up is our own, possibly before the transport assigned its id.

    fn approval_check<T: TransportAdapter>(
        &mut self,
        ctx: &mut StateContext<T>,
        request: &ApprovalRequest,
    ) -> ApprovalResponse {
        if !ctx.is_local_client(request.client_id) {
            tracing::debug!(client_id = %request.client_id, "not admitting remote clients yet");
            return ApprovalResponse::unanswered();
        }
        match self.admit_host(ctx, request) {
            Ok(()) => ApprovalResponse::approve(),
            Err(e) => {
                tracing::warn!(error = %e, "host's own connection payload rejected");
                ApprovalResponse::reject(ConnectStatus::GenericDisconnect)
            }
        }
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
