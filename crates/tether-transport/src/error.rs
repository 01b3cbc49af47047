/// Errors reported synchronously by a [`TransportAdapter`](crate::TransportAdapter)
/// command.
///
/// Asynchronous outcomes (a connect that later fails, a peer dropping) are
/// delivered as callbacks instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint could not be parsed or resolved.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Starting an outgoing connection failed immediately.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Binding the listening socket for a host or server failed.
    #[error("bind failed: {0}")]
    BindFailed(String),

    /// A named message could not be queued for delivery.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The command requires a running transport.
    #[error("transport is not running")]
    NotRunning,
}
