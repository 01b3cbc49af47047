//! Everything a connection state may touch.
//!
//! States own no resources. The manager lends them this context for the
//! duration of one call, so every effect a state has (transport commands,
//! published statuses, timers, session bookkeeping) goes through here.

use std::time::Duration;

use tether_protocol::{
    ChannelMessage, Codec, ConnectStatus, ConnectionPayload, JsonCodec,
};
use tether_session::SessionRegistry;
use tether_transport::{ClientId, Target, TransportAdapter};

use crate::method::ConnectionMethod;
use crate::timer::{TimerSlot, TimerTicket};
use crate::{ConnectionConfig, ConnectionObservers, TetherError};

pub(crate) struct StateContext<T: TransportAdapter> {
    pub(crate) transport: T,
    pub(crate) config: ConnectionConfig,
    pub(crate) sessions: SessionRegistry,
    pub(crate) observers: ConnectionObservers,
    pub(crate) codec: JsonCodec,
    /// Identity presented when this process joins as a client or host.
    pub(crate) player_id: String,
    pub(crate) timers: TimerSlot,
    /// Last status published, never `Undefined` once anything was published.
    pub(crate) last_status: ConnectStatus,
    pub(crate) is_connected_to_host: bool,
}

impl<T: TransportAdapter> StateContext<T> {
    pub(crate) fn new(
        transport: T,
        config: ConnectionConfig,
        observers: ConnectionObservers,
        player_id: String,
    ) -> Self {
        Self {
            transport,
            sessions: SessionRegistry::new(config.session.clone()),
            config,
            observers,
            codec: JsonCodec,
            player_id,
            timers: TimerSlot::default(),
            last_status: ConnectStatus::Undefined,
            is_connected_to_host: false,
        }
    }

    pub(crate) fn publish_status(&mut self, status: ConnectStatus) {
        if status == ConnectStatus::Undefined {
            tracing::warn!("refusing to publish Undefined connect status");
            return;
        }
        self.last_status = status;
        self.observers.publish_status(status);
    }

    /// Strict check, for host and server states: the transport must have
    /// assigned a local id and `client_id` must be it.
    pub(crate) fn is_local(&self, client_id: ClientId) -> bool {
        self.transport.local_client_id() == Some(client_id)
    }

    /// Client-side check. A client only ever hears about its own
    /// connection, so an id arriving before the transport assigned one is
    /// ours too.
    pub(crate) fn is_local_client(&self, client_id: ClientId) -> bool {
        self.transport
            .local_client_id()
            .is_none_or(|local| local == client_id)
    }

    pub(crate) fn connection_payload(
        &self,
        player_name: &str,
    ) -> Result<Vec<u8>, TetherError> {
        let payload = ConnectionPayload {
            player_id: self.player_id.clone(),
            player_name: player_name.to_string(),
            is_debug: self.config.debug_build,
        };
        Ok(self.codec.encode(&payload)?)
    }

    /// Starts a client connection for `method`.
    pub(crate) fn connect(&mut self, method: &ConnectionMethod) -> Result<(), TetherError> {
        let payload = self.connection_payload(&method.player_name)?;
        self.transport.connect(&method.endpoint, &payload)?;
        tracing::info!(
            endpoint = %method.endpoint,
            player = %method.player_name,
            "connecting as client"
        );
        Ok(())
    }

    /// Sends one message of the disconnect-reason channel. Delivery is
    /// best effort; failures are logged.
    pub(crate) fn send_channel_message(&mut self, target: Target, message: ChannelMessage) {
        let bytes = match message.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%target, ?message, error = %e, "cannot encode channel message");
                return;
            }
        };
        if let Err(e) = self
            .transport
            .send_named_message(message.name(), target, &bytes)
        {
            tracing::warn!(%target, ?message, error = %e, "channel message not sent");
        }
    }

    /// Tells `target` why, then disconnects it. The reason always goes out
    /// first.
    pub(crate) fn disconnect_with_reason(&mut self, target: Target, reason: ConnectStatus) {
        self.send_channel_message(target, ChannelMessage::SetDisconnectReason(reason));
        if let Err(e) = self.transport.disconnect(target) {
            tracing::warn!(%target, %reason, error = %e, "transport disconnect failed");
        }
        tracing::info!(%target, %reason, "disconnected with reason");
    }

    pub(crate) fn schedule_timer(&mut self, delay: Duration) -> TimerTicket {
        self.timers.schedule(delay)
    }
}
