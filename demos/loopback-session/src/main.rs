//! A host and two joining players wired through an in-process loopback.
//!
//! Run with `RUST_LOG=debug cargo run -p loopback-session` to watch every
//! state transition.

mod loopback;

use std::sync::Arc;
use std::time::Duration;

use tether::prelude::*;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use loopback::{ClientTransport, EventSlot, ListenerTransport, Network};

/// Spawns a driver for `transport` and plugs its event sink into `slot`.
fn spawn<T: TransportAdapter>(
    transport: T,
    slot: &EventSlot,
    player_id: &str,
    config: ConnectionConfig,
) -> ConnectionHandle {
    let manager = ConnectionManagerBuilder::new()
        .config(config)
        .player_id(player_id)
        .build(transport);
    let handle = ConnectionDriver::spawn(manager);
    if slot.set(handle.transport_events()).is_err() {
        tracing::warn!(player_id, "event sink already installed");
    }
    handle
}

fn join(net: &Arc<Network>, player_id: &str, config: ConnectionConfig) -> ConnectionHandle {
    let (transport, slot) = ClientTransport::new(Arc::clone(net));
    spawn(transport, &slot, player_id, config)
}

/// Logs everything a handle publishes, tagged with `who`.
fn watch(who: &'static str, handle: &ConnectionHandle) {
    let mut status = handle.subscribe_status();
    let mut events = handle.subscribe_events();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                s = status.recv() => match s {
                    Ok(s) => tracing::info!(who, status = %s, "connect status"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(who, missed = n, "status observer lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                e = events.recv() => match e {
                    Ok(e) => tracing::info!(
                        who,
                        status = %e.connect_status,
                        player = e.player_name.as_str(),
                        "peer event"
                    ),
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let net = Network::new();
    let config = ConnectionConfig {
        max_connected_players: 2,
        ..Default::default()
    };

    let (listener, slot) = ListenerTransport::new(Arc::clone(&net));
    let host = spawn(listener, &slot, "p-alice", config.clone());
    watch("alice", &host);
    host.start_host_ip("Alice", "127.0.0.1", 7777).await?;
    settle().await;

    let bob = join(&net, "p-bob", config.clone());
    watch("bob", &bob);
    bob.start_client_ip("Bob", "127.0.0.1", 7777).await?;
    settle().await;

    // Alice and Bob fill the session.
    let carol = join(&net, "p-carol", config);
    watch("carol", &carol);
    carol.start_client_ip("Carol", "127.0.0.1", 7777).await?;
    settle().await;

    host.request_shutdown()?;
    settle().await;

    for (who, handle) in [("alice", &host), ("bob", &bob), ("carol", &carol)] {
        let snapshot = handle.snapshot().await?;
        tracing::info!(
            who,
            state = %snapshot.state,
            last_status = %snapshot.last_status,
            "final"
        );
    }
    Ok(())
}
