//! Fan-out of connection outcomes to UI and game code.
//!
//! Three independent broadcast channels, one per message type. Subscribers
//! that fall behind lose the oldest messages (`RecvError::Lagged`); the
//! connection manager never waits for them.

use tether_protocol::{ConnectStatus, ConnectionEventMessage, ReconnectMessage};
use tokio::sync::broadcast;

/// Messages each channel buffers per subscriber.
pub const DEFAULT_OBSERVER_CAPACITY: usize = 64;

/// Publishers for the three observable message types.
///
/// Cheap to clone; clones publish into the same channels.
#[derive(Debug, Clone)]
pub struct ConnectionObservers {
    status: broadcast::Sender<ConnectStatus>,
    reconnect: broadcast::Sender<ReconnectMessage>,
    events: broadcast::Sender<ConnectionEventMessage>,
}

impl ConnectionObservers {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            status: broadcast::channel(capacity).0,
            reconnect: broadcast::channel(capacity).0,
            events: broadcast::channel(capacity).0,
        }
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<ConnectStatus> {
        self.status.subscribe()
    }

    pub fn subscribe_reconnect(&self) -> broadcast::Receiver<ReconnectMessage> {
        self.reconnect.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEventMessage> {
        self.events.subscribe()
    }

    // Sending only fails when nobody is subscribed, which is fine.

    pub(crate) fn publish_status(&self, status: ConnectStatus) {
        tracing::debug!(%status, "publishing connect status");
        let _ = self.status.send(status);
    }

    pub(crate) fn publish_reconnect(&self, message: ReconnectMessage) {
        tracing::debug!(
            current_attempt = message.current_attempt,
            max_attempt = message.max_attempt,
            "publishing reconnect attempt"
        );
        let _ = self.reconnect.send(message);
    }

    pub(crate) fn publish_event(&self, message: ConnectionEventMessage) {
        tracing::debug!(
            status = %message.connect_status,
            player = %message.player_name,
            "publishing connection event"
        );
        let _ = self.events.send(message);
    }
}

impl Default for ConnectionObservers {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_without_subscribers_does_not_panic() {
        let observers = ConnectionObservers::default();
        observers.publish_status(ConnectStatus::Success);
        observers.publish_reconnect(ReconnectMessage::new(0, 2));
        observers.publish_event(ConnectionEventMessage::new(ConnectStatus::Success, "Alice"));
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let observers = ConnectionObservers::default();
        let mut rx = observers.subscribe_status();

        observers.publish_status(ConnectStatus::Reconnecting);
        observers.publish_status(ConnectStatus::Success);

        assert_eq!(rx.try_recv().unwrap(), ConnectStatus::Reconnecting);
        assert_eq!(rx.try_recv().unwrap(), ConnectStatus::Success);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_clones_share_channels() {
        let observers = ConnectionObservers::default();
        let mut rx = observers.clone().subscribe_events();

        observers.publish_event(ConnectionEventMessage::new(ConnectStatus::Success, "Bob"));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.player_name.as_str(), "Bob");
    }

    #[test]
    fn test_channels_are_independent() {
        let observers = ConnectionObservers::default();
        let mut status_rx = observers.subscribe_status();
        let mut reconnect_rx = observers.subscribe_reconnect();

        observers.publish_reconnect(ReconnectMessage::new(1, 3));

        assert!(status_rx.try_recv().is_err());
        assert_eq!(reconnect_rx.try_recv().unwrap(), ReconnectMessage::new(1, 3));
    }
}
