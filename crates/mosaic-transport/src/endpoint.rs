use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Baud rate used when the configuration does not name one.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Network protocol named in a `proto://host:port` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

/// Where the receiver is reached.
///
/// Built once from a connection descriptor and never modified afterwards;
/// reconnect attempts reuse the same endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransportEndpoint {
    /// A serial device such as `/dev/ttyACM0`.
    Serial { port_path: String, baud_rate: u32 },
    /// A network socket.
    Network {
        protocol: Protocol,
        host: String,
        port: u16,
    },
}

impl TransportEndpoint {
    /// Parse a connection descriptor.
    ///
    /// `proto://host:port` selects a network endpoint, anything else is taken
    /// as a serial device path opened at `baud_rate`. Only `tcp` is accepted as
    /// a protocol; `udp` and unknown tokens are rejected here, before any
    /// connection attempt is made.
    pub fn parse(descriptor: &str, baud_rate: u32) -> Result<Self, ConfigError> {
        let descriptor = descriptor.trim();
        if descriptor.is_empty() {
            return Err(malformed(descriptor, "descriptor is empty"));
        }

        let Some((proto, rest)) = descriptor.split_once("://") else {
            return Ok(TransportEndpoint::Serial {
                port_path: descriptor.to_string(),
                baud_rate,
            });
        };

        let protocol = match proto.to_ascii_lowercase().as_str() {
            "tcp" => Protocol::Tcp,
            _ => return Err(ConfigError::UnsupportedProtocol(proto.to_string())),
        };

        let Some((host, port)) = rest.rsplit_once(':') else {
            return Err(malformed(descriptor, "expected host:port"));
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(malformed(descriptor, "host is empty"));
        }
        if port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed(descriptor, "port must be numeric"));
        }
        let port = match port.parse::<u16>() {
            Ok(0) | Err(_) => return Err(malformed(descriptor, "port out of range")),
            Ok(port) => port,
        };

        Ok(TransportEndpoint::Network {
            protocol,
            host: host.to_string(),
            port,
        })
    }

    /// True for serial device endpoints.
    pub fn is_serial(&self) -> bool {
        matches!(self, TransportEndpoint::Serial { .. })
    }
}

impl FromStr for TransportEndpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, DEFAULT_BAUD_RATE)
    }
}

impl fmt::Display for TransportEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEndpoint::Serial {
                port_path,
                baud_rate,
            } => write!(f, "{port_path}@{baud_rate}"),
            TransportEndpoint::Network {
                protocol,
                host,
                port,
            } => write!(f, "{}://{host}:{port}", protocol.as_str()),
        }
    }
}

fn malformed(descriptor: &str, reason: &'static str) -> ConfigError {
    ConfigError::MalformedDescriptor {
        descriptor: descriptor.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_path_is_serial() {
        let endpoint = TransportEndpoint::parse("/dev/ttyACM0", 230_400).unwrap();
        assert_eq!(
            endpoint,
            TransportEndpoint::Serial {
                port_path: "/dev/ttyACM0".to_string(),
                baud_rate: 230_400,
            }
        );
        assert!(endpoint.is_serial());
    }

    #[test]
    fn tcp_descriptor_is_network() {
        let endpoint = TransportEndpoint::parse("tcp://192.168.3.1:28784", 0).unwrap();
        assert_eq!(
            endpoint,
            TransportEndpoint::Network {
                protocol: Protocol::Tcp,
                host: "192.168.3.1".to_string(),
                port: 28784,
            }
        );
        assert_eq!(endpoint.to_string(), "tcp://192.168.3.1:28784");
    }

    #[test]
    fn bracketed_ipv6_host() {
        let endpoint: TransportEndpoint = "tcp://[::1]:5000".parse().unwrap();
        assert!(matches!(
            endpoint,
            TransportEndpoint::Network { ref host, port: 5000, .. } if host == "::1"
        ));
    }

    #[test]
    fn udp_is_rejected_before_connecting() {
        let err = TransportEndpoint::parse("udp://10.0.0.1:28784", DEFAULT_BAUD_RATE).unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedProtocol("udp".to_string()));
    }

    #[test]
    fn unknown_protocol_is_rejected() {
        let err = TransportEndpoint::parse("ntrip://caster:2101", DEFAULT_BAUD_RATE).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProtocol(p) if p == "ntrip"));
    }

    #[test]
    fn malformed_descriptors() {
        for descriptor in [
            "",
            "   ",
            "tcp://host",
            "tcp://:28784",
            "tcp://host:port",
            "tcp://host:0",
            "tcp://host:70000",
        ] {
            let err = TransportEndpoint::parse(descriptor, DEFAULT_BAUD_RATE).unwrap_err();
            assert!(
                matches!(err, ConfigError::MalformedDescriptor { .. }),
                "{descriptor:?} should be malformed, got {err:?}"
            );
        }
    }

    #[test]
    fn display_serial() {
        let endpoint: TransportEndpoint = "/dev/ttyUSB1".parse().unwrap();
        assert_eq!(endpoint.to_string(), "/dev/ttyUSB1@115200");
    }
}
