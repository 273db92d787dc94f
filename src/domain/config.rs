use crate::domain::error::{DevCmdError, DevCmdResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Port the power meter firmware listens on
pub const DEFAULT_DEVICE_PORT: u16 = 6438;

/// Meter constant printed on most single-phase energy meters
pub const DEFAULT_PULSES_PER_KWH: u32 = 1000;

/// DevCmd configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevCmdConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Device configurations
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Device used when no target is given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_device: Option<String>,
}

/// Named device entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device name
    pub name: String,
    /// Device description
    #[serde(default)]
    pub description: String,
    pub host: String,
    pub port: u16,
    /// Connect timeout in milliseconds, none blocks until the OS gives up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    /// Read timeout in milliseconds, none waits for the reply indefinitely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,
    /// LED pulses the meter emits per kWh
    #[serde(default = "default_pulses_per_kwh")]
    pub pulses_per_kwh: u32,
}

/// Network address of a device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceAddress {
    pub host: String,
    pub port: u16,
}

/// Everything a client needs to reach one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub address: DeviceAddress,
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub pulses_per_kwh: u32,
}

fn default_pulses_per_kwh() -> u32 {
    DEFAULT_PULSES_PER_KWH
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_device: None,
        }
    }
}

impl DeviceAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bracket IPv6 literals so the port stays unambiguous
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl TargetConfig {
    /// Target without any timeouts; connect and read may block indefinitely.
    pub fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            connect_timeout: None,
            read_timeout: None,
            pulses_per_kwh: DEFAULT_PULSES_PER_KWH,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }
}

impl From<DeviceAddress> for TargetConfig {
    fn from(address: DeviceAddress) -> Self {
        TargetConfig::new(address)
    }
}

impl From<&DeviceConfig> for TargetConfig {
    fn from(device: &DeviceConfig) -> Self {
        Self {
            address: DeviceAddress::new(device.host.clone(), device.port),
            connect_timeout: device.connect_timeout_ms.map(Duration::from_millis),
            read_timeout: device.read_timeout_ms.map(Duration::from_millis),
            pulses_per_kwh: device.pulses_per_kwh,
        }
    }
}

impl DevCmdConfig {
    /// Look up a device entry by name
    pub fn find_device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|device| device.name == name)
    }

    /// Pick the device to talk to: the named one, else the configured
    /// default, else the only device if exactly one is configured.
    pub fn resolve_device(&self, name: Option<&str>) -> DevCmdResult<&DeviceConfig> {
        if let Some(name) = name.or(self.global.default_device.as_deref()) {
            return self.find_device(name).ok_or_else(|| DevCmdError::Config {
                message: format!("Unknown device '{}'", name),
            });
        }

        match self.devices.as_slice() {
            [only] => Ok(only),
            [] => Err(DevCmdError::Config {
                message: "No devices configured; pass --host and --port".to_string(),
            }),
            _ => Err(DevCmdError::Config {
                message: "Several devices configured; pick one with --device or set global.default_device"
                    .to_string(),
            }),
        }
    }

    /// Check cross-field constraints that deserialization cannot express.
    pub fn validate(&self) -> DevCmdResult<()> {
        if let Some(name) = &self.global.default_device {
            if self.find_device(name).is_none() {
                return Err(DevCmdError::Config {
                    message: format!("Default device '{}' is not defined", name),
                });
            }
        }

        if let Some(device) = self.devices.iter().find(|device| device.pulses_per_kwh == 0) {
            return Err(DevCmdError::Config {
                message: format!("Device '{}' has pulses_per_kwh = 0", device.name),
            });
        }

        Ok(())
    }
}
