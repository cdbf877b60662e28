//! Node configuration, loaded from a JSON file.
//!
//! ```json
//! {
//!   "device": "/dev/ttyACM0",
//!   "serial": { "baudrate": 115200 },
//!   "reconnect_delay_s": 0.5,
//!   "frame_id": "gnss",
//!   "debug": true,
//!   "publish": { "GPGGA": true }
//! }
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mosaic_link::{EnablementFilter, ReconnectConfig};
use mosaic_transport::{TransportEndpoint, DEFAULT_BAUD_RATE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DEVICE: &str = "/dev/ttyACM0";
pub const DEFAULT_FRAME_ID: &str = "gnss";
pub const DEFAULT_RECONNECT_DELAY_S: f64 = 0.5;

/// Errors raised while loading or validating node configuration.
#[derive(Debug, thiserror::Error)]
pub enum NodeConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid configuration in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("invalid device: {0}")]
    Device(#[from] mosaic_transport::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baudrate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: DEFAULT_BAUD_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Serial device path or `tcp://host:port`.
    pub device: String,
    pub serial: SerialConfig,
    /// Seconds between reconnection attempts.
    pub reconnect_delay_s: f64,
    /// Frame label attached to every published record.
    pub frame_id: String,
    /// Raise the default log level to `debug`.
    pub debug: bool,
    /// Identifiers to publish.
    pub publish: EnablementFilter,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            serial: SerialConfig::default(),
            reconnect_delay_s: DEFAULT_RECONNECT_DELAY_S,
            frame_id: DEFAULT_FRAME_ID.to_string(),
            debug: true,
            publish: [("GPGGA", true)].into_iter().collect(),
        }
    }
}

impl NodeConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, NodeConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| NodeConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| NodeConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), NodeConfigError> {
        if !self.reconnect_delay_s.is_finite() || self.reconnect_delay_s <= 0.0 {
            return Err(NodeConfigError::Invalid {
                key: "reconnect_delay_s",
                reason: format!(
                    "must be a positive number of seconds, got {}",
                    self.reconnect_delay_s
                ),
            });
        }
        if self.serial.baudrate == 0 {
            return Err(NodeConfigError::Invalid {
                key: "serial.baudrate",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// The endpoint named by `device`.
    pub fn endpoint(&self) -> Result<TransportEndpoint, NodeConfigError> {
        self.validate()?;
        Ok(TransportEndpoint::parse(&self.device, self.serial.baudrate)?)
    }

    pub fn reconnect_config(&self) -> Result<ReconnectConfig, NodeConfigError> {
        self.validate()?;
        let reconnect_delay = Duration::try_from_secs_f64(self.reconnect_delay_s).map_err(|err| {
            NodeConfigError::Invalid {
                key: "reconnect_delay_s",
                reason: err.to_string(),
            }
        })?;
        Ok(ReconnectConfig { reconnect_delay })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = NodeConfig::from_json("{}").unwrap();
        assert_eq!(config, NodeConfig::default());
        assert!(config.publish.is_enabled("GPGGA"));
        assert!(config.debug);
        assert_eq!(
            config.reconnect_config().unwrap().reconnect_delay,
            Duration::from_millis(500)
        );
    }

    #[test]
    fn parses_full_file() {
        let config = NodeConfig::from_json(
            r#"{
                "device": "tcp://192.168.3.1:28784",
                "serial": { "baudrate": 230400 },
                "reconnect_delay_s": 2.0,
                "frame_id": "rover",
                "debug": true,
                "publish": { "GPGGA": false, "4007.2": true }
            }"#,
        )
        .unwrap();

        assert_eq!(config.frame_id, "rover");
        assert!(config.debug);
        assert_eq!(config.publish.enabled_identifiers(), vec!["4007.2"]);
        assert_eq!(
            config.endpoint().unwrap().to_string(),
            "tcp://192.168.3.1:28784"
        );
    }

    #[test]
    fn serial_device_carries_baudrate() {
        let config = NodeConfig {
            serial: SerialConfig { baudrate: 460_800 },
            ..NodeConfig::default()
        };
        assert_eq!(
            config.endpoint().unwrap(),
            TransportEndpoint::Serial {
                port_path: DEFAULT_DEVICE.to_string(),
                baud_rate: 460_800,
            }
        );
    }

    #[test]
    fn rejects_non_positive_delay() {
        for delay in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = NodeConfig {
                reconnect_delay_s: delay,
                ..NodeConfig::default()
            };
            assert!(matches!(
                config.reconnect_config(),
                Err(NodeConfigError::Invalid { key: "reconnect_delay_s", .. })
            ));
        }
    }

    #[test]
    fn rejects_zero_baudrate() {
        let config = NodeConfig {
            serial: SerialConfig { baudrate: 0 },
            ..NodeConfig::default()
        };
        assert!(matches!(
            config.endpoint(),
            Err(NodeConfigError::Invalid { key: "serial.baudrate", .. })
        ));
    }

    #[test]
    fn udp_device_is_a_config_error() {
        let config = NodeConfig {
            device: "udp://10.0.0.1:5000".to_string(),
            ..NodeConfig::default()
        };
        assert!(matches!(config.endpoint(), Err(NodeConfigError::Device(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = NodeConfig::load(Path::new("/nonexistent/mosaic.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mosaic.json"));
    }
}
