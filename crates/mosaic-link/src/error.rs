use crate::connection::ConnectionState;

/// Errors that can occur in link operations.
///
/// Transient transport failures inside the dispatch loop never surface here;
/// they demote the connection and are retried. These variants cover setup and
/// explicit calls such as [`ConnectionManager::write`](crate::ConnectionManager::write).
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] mosaic_transport::TransportError),

    /// The operation needs an established connection.
    #[error("receiver not connected (state: {0})")]
    NotConnected(ConnectionState),
}

pub type Result<T> = std::result::Result<T, LinkError>;

/// Error type returned by message handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;
