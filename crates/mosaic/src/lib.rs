//! Driver for Septentrio mosaic GNSS receivers.
//!
//! Reads the receiver's mixed SBF / NMEA stream over serial or TCP, keeps the
//! link up across unplugs and restarts, and hands each enabled message type to
//! a publisher.
//!
//! # Crate Structure
//!
//! - [`transport`] - Serial and TCP byte transports
//! - [`frame`] - Incremental SBF block and NMEA sentence decoding
//! - [`link`] - Connection management, handler registry, and dispatch
//! - [`config`] - JSON node configuration
//! - [`node`] - Subscribe phase and the publish primitive

pub mod config;
pub mod node;

/// Re-export transport types.
pub mod transport {
    pub use mosaic_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mosaic_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use mosaic_link::*;
}

pub use config::{NodeConfig, NodeConfigError};
pub use node::{destination, Node, Publisher};
