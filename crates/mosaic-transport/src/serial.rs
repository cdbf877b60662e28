use std::io::{ErrorKind, Read, Write};

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::endpoint::TransportEndpoint;
use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportOptions};

/// Serial transport for receivers attached over USB or UART.
///
/// The port is configured 8N1 without flow control. Reads use the short
/// timeout from [`TransportOptions`] so a quiet line yields `Ok(0)`.
pub struct SerialTransport {
    endpoint: TransportEndpoint,
    options: TransportOptions,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    /// Create a closed serial transport for `endpoint`.
    pub fn new(endpoint: TransportEndpoint, options: TransportOptions) -> Self {
        Self {
            endpoint,
            options,
            port: None,
        }
    }

    fn path_and_baud(&self) -> (&str, u32) {
        match &self.endpoint {
            TransportEndpoint::Serial {
                port_path,
                baud_rate,
            } => (port_path.as_str(), *baud_rate),
            // Only constructed for serial endpoints by `open_transport`.
            TransportEndpoint::Network { host, .. } => (host.as_str(), 0),
        }
    }

    fn drop_port(&mut self, reason: &str) {
        if self.port.take().is_some() {
            debug!(endpoint = %self.endpoint, reason, "serial port released");
        }
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<()> {
        self.drop_port("reopen");
        let (path, baud_rate) = self.path_and_baud();
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.options.read_timeout)
            .open()
            .map_err(|source| TransportError::Serial {
                path: path.to_string(),
                source,
            })?;

        info!(path, baud_rate, "opened serial port");
        self.port = Some(port);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(port) = self.port.as_mut() else {
            return Err(TransportError::NotOpen);
        };
        match port.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(0),
            Err(err) if err.kind() == ErrorKind::Interrupted => Ok(0),
            Err(err) => {
                self.drop_port("read error");
                Err(TransportError::Io(err))
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let Some(port) = self.port.as_mut() else {
            return Err(TransportError::NotOpen);
        };
        let written = match port.write(data) {
            Ok(n) => port.flush().map(|()| n),
            Err(err) => Err(err),
        };
        match written {
            Ok(n) => Ok(n),
            Err(err) => {
                self.drop_port("write error");
                Err(TransportError::Io(err))
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.port.is_some()
    }

    fn close(&mut self) {
        self.drop_port("close");
    }

    fn endpoint(&self) -> &TransportEndpoint {
        &self.endpoint
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("endpoint", &self.endpoint)
            .field("open", &self.port.is_some())
            .finish()
    }
}
