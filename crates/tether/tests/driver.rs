//! Integration tests for the Tokio driver: commands, transport events, and
//! timers all flowing through one task.

use std::time::Duration;

use tether::{
    ClientId, ConnectStatus, ConnectionConfig, ConnectionDriver, ConnectionHandle,
    ConnectionManagerBuilder, ReconnectMessage, StateKind, TetherError,
};
use tether_transport::{RecordingTransport, TransportCall};
use tokio::time;

// =========================================================================
// Helpers
// =========================================================================

const LOCAL: ClientId = ClientId::SERVER;

fn spawn(config: ConnectionConfig) -> (ConnectionHandle, RecordingTransport) {
    let transport = RecordingTransport::new();
    transport.set_local_client_id(Some(LOCAL));
    let manager = ConnectionManagerBuilder::new()
        .config(config)
        .player_id("p-alice")
        .build(transport.clone());
    (ConnectionDriver::spawn(manager), transport)
}

fn retry_config(attempts: u32) -> ConnectionConfig {
    ConnectionConfig {
        reconnect_attempts: attempts,
        reconnect_delay: Duration::from_secs(5),
        ..Default::default()
    }
}

async fn state(handle: &ConnectionHandle) -> StateKind {
    handle.snapshot().await.unwrap().state
}

fn connects(transport: &RecordingTransport) -> usize {
    transport
        .calls()
        .iter()
        .filter(|c| matches!(c, TransportCall::Connect { .. }))
        .count()
}

// =========================================================================
// Reconnection timing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reconnect_waits_delay_between_attempts() {
    let (handle, transport) = spawn(retry_config(2));
    let events = handle.transport_events();
    let mut reconnect = handle.subscribe_reconnect();

    handle.start_client_ip("Alice", "10.0.0.2", 7777).await.unwrap();
    events.client_connected(LOCAL).unwrap();
    events.client_disconnect(LOCAL).unwrap();
    events.client_disconnect(LOCAL).unwrap();
    assert_eq!(state(&handle).await, StateKind::ClientReconnecting);
    assert_eq!(reconnect.recv().await.unwrap(), ReconnectMessage::new(0, 2));
    assert_eq!(connects(&transport), 2, "initial connect + first attempt");

    time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(connects(&transport), 2, "second attempt waits for the delay");

    time::sleep(Duration::from_millis(200)).await;
    assert_eq!(reconnect.recv().await.unwrap(), ReconnectMessage::new(1, 2));
    assert_eq!(connects(&transport), 3);

    events.client_connected(LOCAL).unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, StateKind::ClientConnected);
    assert_eq!(snapshot.last_status, ConnectStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_gives_up_after_bound() {
    let (handle, transport) = spawn(retry_config(2));
    let events = handle.transport_events();
    let mut status = handle.subscribe_status();

    handle.start_client_lobby("Alice").await.unwrap();
    events.client_connected(LOCAL).unwrap();
    events.client_disconnect(LOCAL).unwrap();
    events.client_disconnect(LOCAL).unwrap();
    time::sleep(Duration::from_secs(6)).await;
    events.client_disconnect(LOCAL).unwrap();

    assert_eq!(state(&handle).await, StateKind::Offline);
    let seen: Vec<_> = std::iter::from_fn(|| status.try_recv().ok()).collect();
    assert_eq!(
        seen,
        vec![
            ConnectStatus::Success,
            ConnectStatus::Reconnecting,
            ConnectStatus::GenericDisconnect,
        ]
    );
    assert_eq!(connects(&transport), 3);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_retry() {
    let (handle, transport) = spawn(retry_config(3));
    let events = handle.transport_events();

    handle.start_client_lobby("Alice").await.unwrap();
    events.client_connected(LOCAL).unwrap();
    events.client_disconnect(LOCAL).unwrap();
    events.client_disconnect(LOCAL).unwrap();
    handle.request_shutdown().unwrap();
    assert_eq!(state(&handle).await, StateKind::Offline);
    let before = connects(&transport);

    time::sleep(Duration::from_secs(30)).await;

    assert_eq!(connects(&transport), before, "cancelled retry never fires");
    assert_eq!(state(&handle).await, StateKind::Offline);
}

// =========================================================================
// Hosting through the driver
// =========================================================================

#[tokio::test]
async fn test_host_flow_through_driver() {
    let (handle, _transport) = spawn(ConnectionConfig::default());
    let events = handle.transport_events();
    let mut status = handle.subscribe_status();

    handle.start_host_ip("Alice", "127.0.0.1", 7777).await.unwrap();
    events.server_started().unwrap();

    assert_eq!(status.recv().await.unwrap(), ConnectStatus::Success);
    assert_eq!(state(&handle).await, StateKind::Hosting);

    let err = handle.start_server_ip("0.0.0.0", 7777).await.unwrap_err();
    assert!(matches!(err, TetherError::InvalidState { .. }));
}

#[tokio::test]
async fn test_named_message_routed_to_state() {
    let (handle, _transport) = spawn(ConnectionConfig::default());
    let events = handle.transport_events();

    handle.start_client_lobby("Alice").await.unwrap();
    events
        .named_message(ClientId::SERVER, "SetDisconnectReason", &[2])
        .unwrap();
    events.client_disconnect(LOCAL).unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, StateKind::Offline);
    assert_eq!(snapshot.last_status, ConnectStatus::ServerFull);
}

#[tokio::test]
async fn test_transport_failure_while_connecting() {
    let (handle, _transport) = spawn(ConnectionConfig::default());
    let events = handle.transport_events();

    handle.start_client_lobby("Alice").await.unwrap();
    events.transport_failure().unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, StateKind::Offline);
    assert_eq!(snapshot.last_status, ConnectStatus::StartClientFailed);
}
