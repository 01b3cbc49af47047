//! An in-process network: one listener and any number of clients, all
//! delivering their callbacks through Tether event sinks.
//!
//! Each transport keeps a sender into its own driver's queue, and the driver
//! owns the transport. The drivers therefore never stop on their own; they
//! end with the runtime when `main` returns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tether::{
    ApprovalRequest, ClientId, Endpoint, Target, TransportAdapter, TransportError,
    TransportEvents,
};

/// Where a transport's owner plugs in its driver's event sink once the
/// driver has been spawned.
pub type EventSlot = Arc<OnceLock<TransportEvents>>;

struct Peer {
    events: TransportEvents,
    /// Approved and counted as a remote client.
    connected: bool,
}

/// The shared wire between the listener and its clients.
#[derive(Default)]
pub struct Network {
    listener: EventSlot,
    listening: AtomicBool,
    next_id: AtomicU64,
    peers: Mutex<HashMap<ClientId, Peer>>,
}

impl Network {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            ..Default::default()
        })
    }

    fn peers(&self) -> MutexGuard<'_, HashMap<ClientId, Peer>> {
        self.peers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listener(&self) -> Result<TransportEvents, TransportError> {
        self.listener.get().cloned().ok_or(TransportError::NotRunning)
    }

    fn targets(&self, target: Target) -> Vec<ClientId> {
        match target {
            Target::All => self.peers().keys().copied().collect(),
            Target::Client(id) => vec![id],
        }
    }

    /// Drops `id` from the wire and tells the peer, if it was still there.
    fn drop_peer(&self, id: ClientId) {
        let removed = self.peers().remove(&id);
        if let Some(peer) = removed {
            let _ = peer.events.client_disconnect(id);
        }
    }
}

/// The hosting or dedicated-server side of the loopback.
pub struct ListenerTransport {
    net: Arc<Network>,
}

impl ListenerTransport {
    pub fn new(net: Arc<Network>) -> (Self, EventSlot) {
        let slot = Arc::clone(&net.listener);
        (Self { net }, slot)
    }

    fn listen(&mut self, endpoint: &Endpoint) -> Result<TransportEvents, TransportError> {
        if self.net.listening.swap(true, Ordering::SeqCst) {
            return Err(TransportError::BindFailed(format!("{endpoint} already in use")));
        }
        tracing::info!(%endpoint, "loopback listening");
        self.net.listener()
    }
}

impl TransportAdapter for ListenerTransport {
    fn connect(&mut self, endpoint: &Endpoint, _payload: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::ConnectFailed(format!(
            "listener cannot dial {endpoint}"
        )))
    }

    fn start_host(&mut self, endpoint: &Endpoint, payload: &[u8]) -> Result<(), TransportError> {
        let events = self.listen(endpoint)?;
        let request = ApprovalRequest {
            client_id: ClientId::SERVER,
            payload: payload.to_vec(),
        };
        tokio::spawn(async move {
            match events.approval_check(request).await {
                Ok(response) if response.approved => {
                    let _ = events.server_started();
                }
                _ => {
                    let _ = events.transport_failure();
                }
            }
        });
        Ok(())
    }

    fn start_server(&mut self, endpoint: &Endpoint) -> Result<(), TransportError> {
        let events = self.listen(endpoint)?;
        tokio::spawn(async move {
            let _ = events.server_started();
        });
        Ok(())
    }

    fn disconnect(&mut self, target: Target) -> Result<(), TransportError> {
        let listener = self.net.listener()?;
        for id in self.net.targets(target) {
            self.net.drop_peer(id);
            let _ = listener.client_disconnect(id);
        }
        Ok(())
    }

    fn send_named_message(
        &mut self,
        name: &str,
        target: Target,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let recipients: Vec<TransportEvents> = {
            let peers = self.net.peers();
            match target {
                Target::All => peers.values().map(|p| p.events.clone()).collect(),
                Target::Client(id) => peers.get(&id).map(|p| p.events.clone()).into_iter().collect(),
            }
        };
        for events in recipients {
            events
                .named_message(ClientId::SERVER, name, payload)
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.net.listening.swap(false, Ordering::SeqCst) {
            return;
        }
        let dropped: Vec<_> = self.net.peers().drain().collect();
        for (id, peer) in dropped {
            let _ = peer.events.client_disconnect(id);
        }
        tracing::info!("loopback listener closed");
    }

    fn local_client_id(&self) -> Option<ClientId> {
        self.net
            .listening
            .load(Ordering::SeqCst)
            .then_some(ClientId::SERVER)
    }

    fn remote_client_count(&self) -> usize {
        self.net.peers().values().filter(|p| p.connected).count()
    }
}

/// A joining player's side of the loopback.
pub struct ClientTransport {
    net: Arc<Network>,
    events: EventSlot,
    id: Option<ClientId>,
}

impl ClientTransport {
    pub fn new(net: Arc<Network>) -> (Self, EventSlot) {
        let events = EventSlot::default();
        let transport = Self {
            net,
            events: Arc::clone(&events),
            id: None,
        };
        (transport, events)
    }
}

impl TransportAdapter for ClientTransport {
    fn connect(&mut self, endpoint: &Endpoint, payload: &[u8]) -> Result<(), TransportError> {
        if !self.net.listening.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed(format!("nobody listening on {endpoint}")));
        }
        let listener = self.net.listener()?;
        let own = self.events.get().cloned().ok_or(TransportError::NotRunning)?;

        let id = ClientId::new(self.net.next_id.fetch_add(1, Ordering::SeqCst));
        self.id = Some(id);
        self.net.peers().insert(
            id,
            Peer {
                events: own.clone(),
                connected: false,
            },
        );

        let net = Arc::clone(&self.net);
        let request = ApprovalRequest {
            client_id: id,
            payload: payload.to_vec(),
        };
        tokio::spawn(async move {
            let approved = matches!(
                listener.approval_check(request).await,
                Ok(response) if response.approved
            );
            if !approved {
                net.drop_peer(id);
                return;
            }
            if let Some(peer) = net.peers().get_mut(&id) {
                peer.connected = true;
            }
            let _ = listener.client_connected(id);
            let _ = own.client_connected(id);
        });
        Ok(())
    }

    fn start_host(&mut self, _endpoint: &Endpoint, _payload: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::BindFailed("client transport cannot listen".into()))
    }

    fn start_server(&mut self, _endpoint: &Endpoint) -> Result<(), TransportError> {
        Err(TransportError::BindFailed("client transport cannot listen".into()))
    }

    fn disconnect(&mut self, _target: Target) -> Result<(), TransportError> {
        self.shutdown();
        Ok(())
    }

    fn send_named_message(
        &mut self,
        name: &str,
        _target: Target,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let id = self.id.ok_or(TransportError::NotRunning)?;
        self.net
            .listener()?
            .named_message(id, name, payload)
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    fn shutdown(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let was_connected = self
            .net
            .peers()
            .remove(&id)
            .is_some_and(|peer| peer.connected);
        if was_connected {
            if let Ok(listener) = self.net.listener() {
                let _ = listener.client_disconnect(id);
            }
        }
    }

    fn local_client_id(&self) -> Option<ClientId> {
        self.id
    }

    fn remote_client_count(&self) -> usize {
        0
    }
}
