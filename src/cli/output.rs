use crate::cli::args::OutputFormat;
use crate::domain::config::{DevCmdConfig, DeviceConfig};
use serde::Serialize;
use std::io;
use tabled::{Table, Tabled};

/// Result of one command exchange as shown to the user
#[derive(Debug, Clone, Serialize, Tabled)]
pub struct ExchangeReport {
    pub device: String,
    pub command: String,
    pub response: String,
    /// Energy equivalent of a pulse counter reply
    #[serde(skip_serializing_if = "Option::is_none")]
    #[tabled(display_with = "display_energy")]
    pub energy_kwh: Option<f64>,
}

fn display_energy(energy_kwh: &Option<f64>) -> String {
    energy_kwh.map_or_else(|| "-".to_string(), |kwh| format!("{:.3}", kwh))
}

/// Output writer trait for different formats
pub trait OutputWriter {
    fn write_response(&self, report: &ExchangeReport) -> Result<(), OutputError>;
    fn write_config(&self, config: &DevCmdConfig) -> Result<(), OutputError>;
    fn write_devices(&self, devices: &[DeviceConfig]) -> Result<(), OutputError>;
    fn write_message(&self, message: &str) -> Result<(), OutputError>;
    fn write_error(&self, error: &str) -> Result<(), OutputError>;
}

/// Output formatting errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("TOML serialization error: {0}")]
    TomlError(#[from] toml::ser::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

impl From<OutputError> for crate::domain::error::DevCmdError {
    fn from(err: OutputError) -> Self {
        Self::Output(err.to_string())
    }
}

/// Console output writer
pub struct ConsoleWriter {
    format: OutputFormat,
}

impl ConsoleWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputWriter for ConsoleWriter {
    fn write_response(&self, report: &ExchangeReport) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                println!("{}", report.response);
                if let Some(kwh) = report.energy_kwh {
                    println!("Equivalent kWh: {:.3}", kwh);
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
            OutputFormat::Table => println!("{}", Table::new([report.clone()])),
        }
        Ok(())
    }

    fn write_config(&self, config: &DevCmdConfig) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => print!("{}", toml::to_string_pretty(config)?),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
            OutputFormat::Table => {
                println!("Log level: {}", config.global.log_level);
                println!(
                    "Default device: {}",
                    config.global.default_device.as_deref().unwrap_or("-")
                );
                self.write_devices(&config.devices)?;
            }
        }
        Ok(())
    }

    fn write_devices(&self, devices: &[DeviceConfig]) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Text => {
                for device in devices {
                    println!("Device: {}", device.name);
                    let desc = if device.description.is_empty() { "No description" } else { &device.description };
                    println!("  Description: {}", desc);
                    println!("  Address: {}:{}", device.host, device.port);
                    println!("  Pulses per kWh: {}", device.pulses_per_kwh);
                    println!();
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(devices)?);
            }
            OutputFormat::Table => {
                if !devices.is_empty() {
                    let table_data: Vec<DeviceTableRow> = devices.iter().map(DeviceTableRow::from).collect();
                    println!("{}", Table::new(table_data));
                }
            }
        }
        Ok(())
    }

    fn write_message(&self, message: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "message": message,
                    "level": "info"
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                println!("{}", message);
            }
        }
        Ok(())
    }

    fn write_error(&self, error: &str) -> Result<(), OutputError> {
        match self.format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "error": error,
                    "level": "error"
                });
                eprintln!("{}", serde_json::to_string_pretty(&output)?);
            }
            _ => {
                eprintln!("Error: {}", error);
            }
        }
        Ok(())
    }
}

/// Table row for device configuration
#[derive(Tabled)]
struct DeviceTableRow {
    name: String,
    address: String,
    description: String,
}

impl From<&DeviceConfig> for DeviceTableRow {
    fn from(device: &DeviceConfig) -> Self {
        Self {
            name: device.name.clone(),
            address: format!("{}:{}", device.host, device.port),
            description: device.description.clone(),
        }
    }
}
