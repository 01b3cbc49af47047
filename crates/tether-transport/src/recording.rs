//! A [`TransportAdapter`] test double that records every command.
//!
//! Clones share the same log, so a test can keep one handle while the
//! connection manager owns another.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::{ClientId, Endpoint, Target, TransportAdapter, TransportError};

/// One recorded command, in the order it was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect { endpoint: Endpoint, payload: Vec<u8> },
    StartHost { endpoint: Endpoint, payload: Vec<u8> },
    StartServer(Endpoint),
    Disconnect(Target),
    SendNamedMessage {
        name: String,
        target: Target,
        payload: Vec<u8>,
    },
    Shutdown,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<TransportCall>,
    local_client_id: Option<ClientId>,
    remote_clients: usize,
    fail_connect: bool,
    fail_start: bool,
}

/// Recording transport. Commands succeed unless told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingTransport {
    /// Creates a transport with no local client id and no connected clients.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the id returned by [`TransportAdapter::local_client_id`].
    pub fn set_local_client_id(&self, id: Option<ClientId>) {
        self.lock().local_client_id = id;
    }

    /// Sets the value returned by [`TransportAdapter::remote_client_count`].
    pub fn set_remote_clients(&self, count: usize) {
        self.lock().remote_clients = count;
    }

    /// Makes every subsequent `connect` fail immediately.
    pub fn fail_connect(&self, fail: bool) {
        self.lock().fail_connect = fail;
    }

    /// Makes every subsequent `start_host`/`start_server` fail immediately.
    pub fn fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    /// Snapshot of all commands issued so far.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Drains the recorded commands.
    pub fn take_calls(&self) -> Vec<TransportCall> {
        std::mem::take(&mut self.lock().calls)
    }

    /// Named messages sent so far, as `(name, target, payload)`.
    pub fn sent_messages(&self) -> Vec<(String, Target, Vec<u8>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::SendNamedMessage {
                    name,
                    target,
                    payload,
                } => Some((name.clone(), *target, payload.clone())),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the log from the others.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TransportAdapter for RecordingTransport {
    fn connect(
        &mut self,
        endpoint: &Endpoint,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::Connect {
            endpoint: endpoint.clone(),
            payload: payload.to_vec(),
        });
        if inner.fail_connect {
            return Err(TransportError::ConnectFailed(format!(
                "refused by test transport: {endpoint}"
            )));
        }
        Ok(())
    }

    fn start_host(
        &mut self,
        endpoint: &Endpoint,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::StartHost {
            endpoint: endpoint.clone(),
            payload: payload.to_vec(),
        });
        if inner.fail_start {
            return Err(TransportError::BindFailed(endpoint.to_string()));
        }
        Ok(())
    }

    fn start_server(
        &mut self,
        endpoint: &Endpoint,
    ) -> Result<(), TransportError> {
        let mut inner = self.lock();
        inner.calls.push(TransportCall::StartServer(endpoint.clone()));
        if inner.fail_start {
            return Err(TransportError::BindFailed(endpoint.to_string()));
        }
        Ok(())
    }

    fn disconnect(&mut self, target: Target) -> Result<(), TransportError> {
        self.lock().calls.push(TransportCall::Disconnect(target));
        Ok(())
    }

    fn send_named_message(
        &mut self,
        name: &str,
        target: Target,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        self.lock().calls.push(TransportCall::SendNamedMessage {
            name: name.to_string(),
            target,
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn shutdown(&mut self) {
        self.lock().calls.push(TransportCall::Shutdown);
    }

    fn local_client_id(&self) -> Option<ClientId> {
        self.lock().local_client_id
    }

    fn remote_client_count(&self) -> usize {
        self.lock().remote_clients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_transport_clones_share_log() {
        let observer = RecordingTransport::new();
        let mut owned = observer.clone();

        owned.disconnect(Target::All).unwrap();
        owned.shutdown();

        assert_eq!(
            observer.calls(),
            vec![TransportCall::Disconnect(Target::All), TransportCall::Shutdown]
        );
    }

    #[test]
    fn test_recording_transport_fail_connect_returns_error() {
        let mut transport = RecordingTransport::new();
        transport.fail_connect(true);

        let result = transport.connect(&Endpoint::ip("10.0.0.1", 9000), b"{}");

        assert!(matches!(result, Err(TransportError::ConnectFailed(_))));
        assert_eq!(transport.calls().len(), 1, "failed commands are still recorded");
    }

    #[test]
    fn test_take_calls_drains_log() {
        let mut transport = RecordingTransport::new();
        transport.shutdown();

        assert_eq!(transport.take_calls().len(), 1);
        assert!(transport.calls().is_empty());
    }
}
