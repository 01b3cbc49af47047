//! Runs a [`ConnectionManager`] inside a Tokio task.
//!
//! Commands, transport callbacks, and the manager's timer all land in one
//! queue, so the manager sees them one at a time, in arrival order. This is
//! the actor model: no shared mutable state, only messages.
//!
//! ```text
//!   ConnectionHandle ──┐
//!                      ├──→ mpsc ──→ driver task ──→ ConnectionManager
//!   TransportEvents ───┘                 ↑
//!                               sleep_until(timer)
//! ```
//!
//! The task stops once every `ConnectionHandle` and `TransportEvents` clone
//! has been dropped.

use tether_protocol::{ConnectionEventMessage, ConnectStatus, ReconnectMessage};
use tether_transport::{ClientId, Endpoint, TransportAdapter};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant as TokioInstant};

use crate::approval::{ApprovalRequest, ApprovalResponse};
use crate::manager::{ConnectionManager, ConnectionSnapshot};
use crate::method::ConnectionMethod;
use crate::timer::TimerTicket;
use crate::{ConnectionObservers, TetherError};

/// Commands from application code.
///
/// The `oneshot::Sender` in some variants is a reply channel: the driver
/// sends the result back through it.
enum Command {
    StartClient {
        method: ConnectionMethod,
        reply: oneshot::Sender<Result<(), TetherError>>,
    },
    StartHost {
        method: ConnectionMethod,
        reply: oneshot::Sender<Result<(), TetherError>>,
    },
    StartServer {
        endpoint: Endpoint,
        reply: oneshot::Sender<Result<(), TetherError>>,
    },
    Shutdown,
    Snapshot {
        reply: oneshot::Sender<ConnectionSnapshot>,
    },
}

/// Callbacks from the transport integration.
enum TransportEvent {
    ClientConnected(ClientId),
    ClientDisconnect(ClientId),
    ServerStarted,
    Approval {
        request: ApprovalRequest,
        reply: oneshot::Sender<ApprovalResponse>,
    },
    NamedMessage {
        sender: ClientId,
        name: String,
        payload: Vec<u8>,
    },
    Failure,
}

enum DriverInput {
    Command(Command),
    Event(TransportEvent),
}

type InputSender = mpsc::UnboundedSender<DriverInput>;

/// Handle to a running connection driver. Used by application code.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct ConnectionHandle {
    sender: InputSender,
    observers: ConnectionObservers,
}

impl ConnectionHandle {
    pub async fn start_client_lobby(&self, player_name: &str) -> Result<(), TetherError> {
        self.start_client(ConnectionMethod::lobby(player_name)).await
    }

    pub async fn start_client_ip(
        &self,
        player_name: &str,
        host: &str,
        port: u16,
    ) -> Result<(), TetherError> {
        self.start_client(ConnectionMethod::ip(player_name, host, port))
            .await
    }

    pub async fn start_host_lobby(&self, player_name: &str) -> Result<(), TetherError> {
        self.start_host(ConnectionMethod::lobby(player_name)).await
    }

    pub async fn start_host_ip(
        &self,
        player_name: &str,
        host: &str,
        port: u16,
    ) -> Result<(), TetherError> {
        self.start_host(ConnectionMethod::ip(player_name, host, port))
            .await
    }

    pub async fn start_server_ip(&self, host: &str, port: u16) -> Result<(), TetherError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::StartServer {
            endpoint: Endpoint::ip(host, port),
            reply: reply_tx,
        })?;
        reply_rx.await.map_err(|_| TetherError::DriverClosed)?
    }

    pub async fn start_client(&self, method: ConnectionMethod) -> Result<(), TetherError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::StartClient {
            method,
            reply: reply_tx,
        })?;
        reply_rx.await.map_err(|_| TetherError::DriverClosed)?
    }

    pub async fn start_host(&self, method: ConnectionMethod) -> Result<(), TetherError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::StartHost {
            method,
            reply: reply_tx,
        })?;
        reply_rx.await.map_err(|_| TetherError::DriverClosed)?
    }

    /// Leaves or ends the session (fire-and-forget).
    pub fn request_shutdown(&self) -> Result<(), TetherError> {
        self.send(Command::Shutdown)
    }

    pub async fn snapshot(&self) -> Result<ConnectionSnapshot, TetherError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot { reply: reply_tx })?;
        reply_rx.await.map_err(|_| TetherError::DriverClosed)
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<ConnectStatus> {
        self.observers.subscribe_status()
    }

    pub fn subscribe_reconnect(&self) -> broadcast::Receiver<ReconnectMessage> {
        self.observers.subscribe_reconnect()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEventMessage> {
        self.observers.subscribe_events()
    }

    /// A sink for the transport integration to report its callbacks into.
    pub fn transport_events(&self) -> TransportEvents {
        TransportEvents {
            sender: self.sender.clone(),
        }
    }

    fn send(&self, command: Command) -> Result<(), TetherError> {
        self.sender
            .send(DriverInput::Command(command))
            .map_err(|_| TetherError::DriverClosed)
    }
}

/// Where the transport integration reports its callbacks.
///
/// Every method except [`approval_check`](Self::approval_check) is
/// synchronous and never blocks, so it can be called from a transport's own
/// callback thread.
#[derive(Clone)]
pub struct TransportEvents {
    sender: InputSender,
}

impl TransportEvents {
    pub fn client_connected(&self, client_id: ClientId) -> Result<(), TetherError> {
        self.send(TransportEvent::ClientConnected(client_id))
    }

    pub fn client_disconnect(&self, client_id: ClientId) -> Result<(), TetherError> {
        self.send(TransportEvent::ClientDisconnect(client_id))
    }

    pub fn server_started(&self) -> Result<(), TetherError> {
        self.send(TransportEvent::ServerStarted)
    }

    pub fn named_message(
        &self,
        sender: ClientId,
        name: &str,
        payload: &[u8],
    ) -> Result<(), TetherError> {
        self.send(TransportEvent::NamedMessage {
            sender,
            name: name.to_string(),
            payload: payload.to_vec(),
        })
    }

    pub fn transport_failure(&self) -> Result<(), TetherError> {
        self.send(TransportEvent::Failure)
    }

    /// Asks the current state whether `request` may join, and waits for
    /// the answer.
    pub async fn approval_check(
        &self,
        request: ApprovalRequest,
    ) -> Result<ApprovalResponse, TetherError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(TransportEvent::Approval {
            request,
            reply: reply_tx,
        })?;
        reply_rx.await.map_err(|_| TetherError::DriverClosed)
    }

    fn send(&self, event: TransportEvent) -> Result<(), TetherError> {
        self.sender
            .send(DriverInput::Event(event))
            .map_err(|_| TetherError::DriverClosed)
    }
}

/// The actor that owns a [`ConnectionManager`]. Runs inside a Tokio task.
pub struct ConnectionDriver<T: TransportAdapter> {
    manager: ConnectionManager<T>,
    receiver: mpsc::UnboundedReceiver<DriverInput>,
    /// The timer currently being slept on, and when it is due.
    armed: Option<(TimerTicket, TokioInstant)>,
}

impl<T: TransportAdapter> ConnectionDriver<T> {
    /// Spawns a driver task for `manager` and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(manager: ConnectionManager<T>) -> ConnectionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let observers = manager.observers().clone();

        let driver = Self {
            manager,
            receiver: rx,
            armed: None,
        };
        tokio::spawn(driver.run());

        ConnectionHandle {
            sender: tx,
            observers,
        }
    }

    async fn run(mut self) {
        tracing::info!(player_id = self.manager.player_id(), "connection driver started");

        loop {
            self.rearm();
            let armed = self.armed;

            tokio::select! {
                input = self.receiver.recv() => match input {
                    Some(input) => self.handle(input),
                    None => break,
                },
                ticket = timer_expiry(armed) => {
                    self.armed = None;
                    self.manager.on_timer(ticket);
                }
            }
        }

        tracing::info!(state = %self.manager.state_kind(), "connection driver stopped");
    }

    /// Follows the manager's pending timer. A timer that was already armed
    /// keeps its original deadline.
    fn rearm(&mut self) {
        self.armed = match (self.manager.pending_timer(), self.armed) {
            (Some(pending), Some((ticket, deadline))) if pending.ticket == ticket => {
                Some((ticket, deadline))
            }
            (Some(pending), _) => Some((pending.ticket, TokioInstant::now() + pending.delay)),
            (None, _) => None,
        };
    }

    fn handle(&mut self, input: DriverInput) {
        match input {
            DriverInput::Command(command) => self.handle_command(command),
            DriverInput::Event(event) => self.handle_event(event),
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::StartClient { method, reply } => {
                let _ = reply.send(self.manager.start_client(method));
            }
            Command::StartHost { method, reply } => {
                let _ = reply.send(self.manager.start_host(method));
            }
            Command::StartServer { endpoint, reply } => {
                let _ = reply.send(self.manager.start_server(endpoint));
            }
            Command::Shutdown => self.manager.request_shutdown(),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.manager.snapshot());
            }
        }
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::ClientConnected(client_id) => {
                self.manager.on_client_connected(client_id);
            }
            TransportEvent::ClientDisconnect(client_id) => {
                self.manager.on_client_disconnect(client_id);
            }
            TransportEvent::ServerStarted => self.manager.on_server_started(),
            TransportEvent::Approval { request, reply } => {
                let response = self.manager.approval_check(&request);
                if reply.send(response).is_err() {
                    tracing::debug!(client_id = %request.client_id, "approval answer not awaited");
                }
            }
            TransportEvent::NamedMessage {
                sender,
                name,
                payload,
            } => self.manager.on_named_message(sender, &name, &payload),
            TransportEvent::Failure => self.manager.on_transport_failure(),
        }
    }
}

/// Resolves with the ticket once the armed deadline passes. With nothing
/// armed it pends forever; `select!` keeps serving the queue.
async fn timer_expiry(armed: Option<(TimerTicket, TokioInstant)>) -> TimerTicket {
    match armed {
        Some((ticket, deadline)) => {
            time::sleep_until(deadline).await;
            ticket
        }
        None => std::future::pending().await,
    }
}
