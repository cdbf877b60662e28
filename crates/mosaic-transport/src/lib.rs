//! Byte transports for a GNSS receiver.
//!
//! Provides one interface over the channels a receiver can be reached on:
//! - Serial devices (USB CDC-ACM, UART)
//! - TCP streams
//!
//! This is the lowest layer of mosaic. Everything else builds on top of
//! the [`Transport`] trait provided here. Transports never retry on their own;
//! reconnection belongs to the layer above.

pub mod endpoint;
pub mod error;
pub mod serial;
pub mod tcp;
pub mod traits;

#[cfg(feature = "mock")]
pub mod mock;

pub use endpoint::{Protocol, TransportEndpoint, DEFAULT_BAUD_RATE};
pub use error::{ConfigError, Result, TransportError};
pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use traits::{open_transport, Transport, TransportOptions};

#[cfg(feature = "mock")]
pub use mock::MockTransport;
