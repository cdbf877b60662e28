//! Connection management and message dispatch for a GNSS receiver.
//!
//! [`ConnectionManager`] keeps the transport open and reconnects on its own
//! after failures. [`Dispatcher`] drives the read loop: it feeds bytes to a
//! [`FrameDecoder`](mosaic_frame::FrameDecoder), drops invalid frames, applies
//! the [`EnablementFilter`], and hands the rest to handlers registered in the
//! [`CallbackRegistry`]. Registrations survive reconnection.

pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod registry;

pub use connection::{ConnectionManager, ConnectionState, ReconnectConfig, DEFAULT_RECONNECT_DELAY};
pub use dispatcher::{
    DispatchStats, Dispatcher, DispatcherConfig, DEFAULT_IDLE_INTERVAL, DEFAULT_READ_CHUNK_SIZE,
};
pub use error::{HandlerError, LinkError, Result};
pub use filter::EnablementFilter;
pub use registry::{CallbackRegistry, HandlerId, HandlerResult};
