use crate::domain::error::DevCmdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Line terminator appended to every command on the wire
pub const COMMAND_TERMINATOR: &str = "\n";

/// Text instruction for the device.
///
/// Any string is accepted and forwarded verbatim; the device decides what it
/// means.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command(String);

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bytes written to the socket: the command text plus one line feed.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.0.len() + COMMAND_TERMINATOR.len());
        payload.extend_from_slice(self.0.as_bytes());
        payload.extend_from_slice(COMMAND_TERMINATOR.as_bytes());
        payload
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trimmed device reply for a single command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response(String);

impl Response {
    /// Decode raw reply bytes and strip surrounding whitespace.
    pub fn decode(bytes: &[u8]) -> Result<Self, DevCmdError> {
        let text = String::from_utf8(bytes.to_vec())?;
        Ok(Self(text.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpret the reply as a pulse counter and convert it to kWh.
    ///
    /// Returns `None` when the reply is not a plain unsigned integer or
    /// `pulses_per_kwh` is zero.
    pub fn energy_kwh(&self, pulses_per_kwh: u32) -> Option<f64> {
        let pulses: u64 = self.0.parse().ok()?;
        if pulses_per_kwh == 0 {
            return None;
        }
        Some(pulses as f64 / f64::from(pulses_per_kwh))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Response> for String {
    fn from(response: Response) -> Self {
        response.0
    }
}

/// Commands understood by the power meter / garage door firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCommand {
    /// Read the pulse counter
    PulseCount,
    /// Press the garage door relay
    ToggleDoor,
}

impl DeviceCommand {
    pub const ALL: [DeviceCommand; 2] = [DeviceCommand::PulseCount, DeviceCommand::ToggleDoor];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCommand::PulseCount => "P",
            DeviceCommand::ToggleDoor => "D",
        }
    }

}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceCommand {
    type Err = DevCmdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceCommand::ALL
            .into_iter()
            .find(|command| command.as_str() == s)
            .ok_or_else(|| DevCmdError::InvalidInput(format!("Unknown device command '{}'", s)))
    }
}

impl From<DeviceCommand> for Command {
    fn from(command: DeviceCommand) -> Self {
        Command::new(command.as_str())
    }
}
