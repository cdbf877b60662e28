use std::time::Duration;

use crate::endpoint::{Protocol, TransportEndpoint};
use crate::error::{ConfigError, Result};
use crate::serial::SerialTransport;
use crate::tcp::TcpTransport;

/// A duplex byte channel to the receiver.
///
/// Implementations open the underlying device or socket on [`open`](Transport::open)
/// and never retry internally. Reads are short-timeout: when no data arrives
/// within the read timeout they return `Ok(0)` instead of blocking.
pub trait Transport: Send {
    /// Open the device or socket. Calling `open` on an open transport reopens it.
    fn open(&mut self) -> Result<()>;

    /// Read available bytes into `buf`, returning `Ok(0)` when none arrived.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write bytes to the receiver.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Whether the handle is still usable.
    ///
    /// Reflects the outcome of the last open/read/write; it does not probe
    /// the device.
    fn is_alive(&self) -> bool;

    /// Release the handle. Safe to call more than once.
    fn close(&mut self);

    /// The endpoint this transport talks to.
    fn endpoint(&self) -> &TransportEndpoint;
}

/// Timing knobs shared by all transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// How long a read waits for data before returning `Ok(0)`.
    pub read_timeout: Duration,
    /// Upper bound for establishing a network connection.
    pub connect_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(10),
            connect_timeout: Duration::from_secs(2),
        }
    }
}

/// Build the transport for `endpoint` without opening it.
pub fn open_transport(
    endpoint: &TransportEndpoint,
    options: TransportOptions,
) -> std::result::Result<Box<dyn Transport>, ConfigError> {
    match endpoint {
        TransportEndpoint::Serial { .. } => {
            Ok(Box::new(SerialTransport::new(endpoint.clone(), options)))
        }
        TransportEndpoint::Network {
            protocol: Protocol::Tcp,
            ..
        } => Ok(Box::new(TcpTransport::new(endpoint.clone(), options))),
        TransportEndpoint::Network { protocol, .. } => {
            Err(ConfigError::UnsupportedProtocol(protocol.as_str().to_string()))
        }
    }
}
