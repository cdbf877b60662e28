/// Errors raised while parsing a connection descriptor.
///
/// These are fatal: they surface before any connection attempt and are never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The descriptor names a network protocol this crate cannot open.
    #[error("protocol '{0}' is unsupported")]
    UnsupportedProtocol(String),

    /// The descriptor is empty or does not have the expected shape.
    #[error("malformed connection descriptor '{descriptor}': {reason}")]
    MalformedDescriptor {
        descriptor: String,
        reason: &'static str,
    },
}

/// Errors that can occur in receiver transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open serial device {path}: {source}")]
    Serial {
        path: String,
        source: serialport::Error,
    },

    /// Failed to connect to the network endpoint.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    /// An I/O error occurred on an open transport.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote end closed the stream.
    #[error("transport closed by peer")]
    Closed,

    /// The transport is not open.
    #[error("transport not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, TransportError>;
