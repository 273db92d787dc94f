//! One-shot command client.
//!
//! Each call opens its own connection, writes `command + "\n"`, performs a
//! single read of at most [`RESPONSE_BUFFER_SIZE`] bytes, closes the
//! connection and returns the UTF-8 decoded, whitespace-trimmed reply.
//!
//! Replies longer than one read are truncated: whatever the first read
//! delivers is the whole response. Device-level error text such as
//! `Unknown command` is returned as an ordinary response.

use crate::core::exchange::ScopedConnection;
use crate::core::transport::{Connector, TcpConnector};
use crate::domain::command::{Command, Response};
use crate::domain::config::{DeviceAddress, TargetConfig};
use crate::domain::error::DevCmdResult;
use tracing::{debug, info_span, warn};

/// Upper bound for the single response read
pub const RESPONSE_BUFFER_SIZE: usize = 1024;

/// Synchronous command client bound to one device address
#[derive(Debug, Clone)]
pub struct CommandClient<C = TcpConnector> {
    address: DeviceAddress,
    connector: C,
}

impl CommandClient<TcpConnector> {
    /// Client without timeouts.
    pub fn new(address: DeviceAddress) -> Self {
        Self {
            address,
            connector: TcpConnector::new(),
        }
    }

    /// Client using the timeouts in `target`.
    pub fn from_target(target: &TargetConfig) -> Self {
        Self {
            address: target.address.clone(),
            connector: TcpConnector::from_target(target),
        }
    }
}

impl<C: Connector> CommandClient<C> {
    pub fn with_connector(address: DeviceAddress, connector: C) -> Self {
        Self { address, connector }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Send `command` and return the trimmed reply text.
    pub fn send_command(&self, command: &str) -> DevCmdResult<String> {
        self.send(&Command::new(command)).map(Response::into_string)
    }

    /// Run one exchange: connect, send, read once, close, decode.
    pub fn send(&self, command: &Command) -> DevCmdResult<Response> {
        let span = info_span!("exchange", addr = %self.address, command = %command);
        let _enter = span.enter();

        let mut connection = ScopedConnection::open(&self.connector, &self.address)?;
        connection.send(&command.to_wire())?;

        let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
        let n = connection.receive_once(&mut buf)?;
        connection.close();

        if n == buf.len() {
            warn!("Reply filled the {} byte buffer and may be truncated", RESPONSE_BUFFER_SIZE);
        }

        let response = Response::decode(&buf[..n])?;
        debug!("response {:?}", response.as_str());
        Ok(response)
    }
}

/// Send one command to `host:port` with no timeouts and return the reply.
pub fn send_command(host: &str, port: u16, command: &str) -> DevCmdResult<String> {
    CommandClient::new(DeviceAddress::new(host, port)).send_command(command)
}
