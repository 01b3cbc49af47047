//! No session. The only state that accepts start commands.

use tether_transport::{Endpoint, TransportAdapter};

use super::{
    ClientConnecting, ServerStarting, StartingHost, StateHandler, Transition,
};
use crate::context::StateContext;
use crate::method::ConnectionMethod;

#[derive(Debug, Default)]
pub(crate) struct Offline;

impl StateHandler for Offline {
    fn enter<T: TransportAdapter>(&mut self, ctx: &mut StateContext<T>) -> Transition {
        ctx.transport.shutdown();
        ctx.sessions.clear();
        tracing::info!("offline");
        None
    }

    fn start_client(&mut self, method: ConnectionMethod) -> Transition {
        Some(ClientConnecting::new(method).into())
    }

    fn start_host(&mut self, method: ConnectionMethod) -> Transition {
        Some(StartingHost::new(method).into())
    }

    fn start_server(&mut self, endpoint: Endpoint) -> Transition {
        Some(ServerStarting::new(endpoint).into())
    }
}
