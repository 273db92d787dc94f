//! DevCmd Library
//!
//! One-shot text command client for embedded devices on a TCP socket:
//! connect, send `command + "\n"`, read a single reply of up to 1 KiB,
//! close, and hand back the trimmed text.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::{send_command, CommandClient, Connector, ExchangeState, TcpConnector, RESPONSE_BUFFER_SIZE};
pub use crate::domain::command::{Command, DeviceCommand, Response};
pub use crate::domain::config::{DevCmdConfig, DeviceAddress, DeviceConfig, TargetConfig};
pub use crate::domain::error::{DevCmdError, DevCmdResult};
pub use crate::infrastructure::tcp::DeviceEmulator;
