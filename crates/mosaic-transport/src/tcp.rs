use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use tracing::{debug, info};

use crate::endpoint::TransportEndpoint;
use crate::error::{Result, TransportError};
use crate::traits::{Transport, TransportOptions};

/// TCP transport for receivers exposing an IP port.
pub struct TcpTransport {
    endpoint: TransportEndpoint,
    options: TransportOptions,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    /// Create a closed TCP transport for `endpoint`.
    pub fn new(endpoint: TransportEndpoint, options: TransportOptions) -> Self {
        Self {
            endpoint,
            options,
            stream: None,
        }
    }

    fn address(&self) -> (String, u16) {
        match &self.endpoint {
            TransportEndpoint::Network { host, port, .. } => (host.clone(), *port),
            // Only constructed for network endpoints by `open_transport`.
            TransportEndpoint::Serial { port_path, .. } => (port_path.clone(), 0),
        }
    }

    fn connect(&self) -> std::io::Result<TcpStream> {
        let (host, port) = self.address();
        let mut last_err = None;
        for addr in (host.as_str(), port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.options.connect_timeout) {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
        }))
    }

    fn drop_stream(&mut self, reason: &str) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            debug!(endpoint = %self.endpoint, reason, "tcp stream released");
        }
    }
}

impl Transport for TcpTransport {
    fn open(&mut self) -> Result<()> {
        self.drop_stream("reopen");
        let stream = self.connect().map_err(|source| TransportError::Connect {
            address: self.endpoint.to_string(),
            source,
        })?;
        stream.set_read_timeout(Some(self.options.read_timeout))?;
        stream.set_nodelay(true)?;

        info!(endpoint = %self.endpoint, "connected to receiver");
        self.stream = Some(stream);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotOpen);
        };
        match stream.read(buf) {
            Ok(0) if !buf.is_empty() => {
                self.drop_stream("end of stream");
                Err(TransportError::Closed)
            }
            Ok(n) => Ok(n),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => {
                self.drop_stream("read error");
                Err(TransportError::Io(err))
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(TransportError::NotOpen);
        };
        match stream.write_all(data) {
            Ok(()) => Ok(data.len()),
            Err(err) => {
                self.drop_stream("write error");
                Err(TransportError::Io(err))
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        self.drop_stream("close");
    }

    fn endpoint(&self) -> &TransportEndpoint {
        &self.endpoint
    }
}

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("endpoint", &self.endpoint)
            .field("open", &self.stream.is_some())
            .finish()
    }
}
