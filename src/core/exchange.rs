use crate::core::transport::Connector;
use crate::domain::config::DeviceAddress;
use crate::domain::error::{DevCmdError, DevCmdResult};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use tracing::{debug, trace};

/// Lifecycle of a single command exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeState {
    Idle,
    Connecting,
    Connected,
    Sent,
    AwaitingResponse,
    Closed,
}

impl std::fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExchangeState::Idle => write!(f, "idle"),
            ExchangeState::Connecting => write!(f, "connecting"),
            ExchangeState::Connected => write!(f, "connected"),
            ExchangeState::Sent => write!(f, "sent"),
            ExchangeState::AwaitingResponse => write!(f, "awaiting response"),
            ExchangeState::Closed => write!(f, "closed"),
        }
    }
}

/// Connection owned by one exchange.
///
/// The stream is closed when the guard is dropped, so every early return
/// through `?` releases the socket before the error reaches the caller.
pub struct ScopedConnection<S: Read + Write> {
    stream: S,
    addr: String,
    state: ExchangeState,
}

impl<S: Read + Write> ScopedConnection<S> {
    /// Connect through `connector`, moving Idle -> Connecting -> Connected.
    pub fn open<C>(connector: &C, address: &DeviceAddress) -> DevCmdResult<Self>
    where
        C: Connector<Stream = S> + ?Sized,
    {
        let addr = address.to_string();
        debug!(%addr, "{} -> {}", ExchangeState::Idle, ExchangeState::Connecting);

        let stream = connector.connect(address).map_err(|source| {
            debug!(%addr, "connect failed: {}", source);
            if is_timeout(&source) {
                DevCmdError::Timeout {
                    addr: addr.clone(),
                    stage: ExchangeState::Connecting,
                }
            } else {
                DevCmdError::Connection {
                    addr: addr.clone(),
                    source,
                }
            }
        })?;

        let mut connection = Self {
            stream,
            addr,
            state: ExchangeState::Connecting,
        };
        connection.transition(ExchangeState::Connected);
        Ok(connection)
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Write the whole payload, retrying partial writes, then flush.
    pub fn send(&mut self, payload: &[u8]) -> DevCmdResult<()> {
        trace!(addr = %self.addr, "tx {}", hex::encode(payload));

        let result = self
            .stream
            .write_all(payload)
            .and_then(|_| self.stream.flush());

        if let Err(source) = result {
            return Err(DevCmdError::Transmission {
                addr: self.addr.clone(),
                source,
            });
        }

        debug!(addr = %self.addr, "sent {} bytes", payload.len());
        self.transition(ExchangeState::Sent);
        Ok(())
    }

    /// Perform exactly one read into `buf`. Returns the number of bytes
    /// delivered; zero means the peer closed without replying.
    pub fn receive_once(&mut self, buf: &mut [u8]) -> DevCmdResult<usize> {
        self.transition(ExchangeState::AwaitingResponse);

        let n = loop {
            match self.stream.read(buf) {
                Ok(n) => break n,
                // Signal delivery, not data; the single read has not happened yet
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(source) if is_timeout(&source) => {
                    return Err(DevCmdError::Timeout {
                        addr: self.addr.clone(),
                        stage: ExchangeState::AwaitingResponse,
                    });
                }
                Err(source) => {
                    return Err(DevCmdError::Connection {
                        addr: self.addr.clone(),
                        source,
                    });
                }
            }
        };

        trace!(addr = %self.addr, "rx {}", hex::encode(&buf[..n]));
        debug!(addr = %self.addr, "received {} bytes", n);
        Ok(n)
    }

    /// Release the connection now instead of at end of scope.
    pub fn close(self) {
        drop(self);
    }

    fn transition(&mut self, next: ExchangeState) {
        debug!(addr = %self.addr, "{} -> {}", self.state, next);
        self.state = next;
    }
}

impl<S: Read + Write> Drop for ScopedConnection<S> {
    fn drop(&mut self) {
        self.transition(ExchangeState::Closed);
    }
}

/// Read timeouts surface as WouldBlock on Unix and TimedOut on Windows.
fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FixedConnector;

    impl Connector for FixedConnector {
        type Stream = Cursor<Vec<u8>>;

        fn connect(&self, _address: &DeviceAddress) -> io::Result<Self::Stream> {
            Ok(Cursor::new(b"hello\n".to_vec()))
        }
    }

    struct RefusingConnector(io::ErrorKind);

    impl Connector for RefusingConnector {
        type Stream = Cursor<Vec<u8>>;

        fn connect(&self, _address: &DeviceAddress) -> io::Result<Self::Stream> {
            Err(io::Error::new(self.0, "nope"))
        }
    }

    fn address() -> DeviceAddress {
        DeviceAddress::new("device.local", 6438)
    }

    #[test]
    fn test_state_progression() {
        let mut connection = ScopedConnection::open(&FixedConnector, &address()).unwrap();
        assert_eq!(connection.state(), ExchangeState::Connected);
        assert_eq!(connection.addr(), "device.local:6438");

        let mut buf = [0u8; 16];
        let n = connection.receive_once(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello\n");
        assert_eq!(connection.state(), ExchangeState::AwaitingResponse);
    }

    #[test]
    fn test_send_moves_to_sent() {
        let mut connection = ScopedConnection::open(&FixedConnector, &address()).unwrap();
        connection.send(b"P\n").unwrap();
        assert_eq!(connection.state(), ExchangeState::Sent);
    }

    #[test]
    fn test_connect_error_mapping() {
        let refused = ScopedConnection::open(&RefusingConnector(io::ErrorKind::ConnectionRefused), &address());
        assert!(matches!(refused, Err(DevCmdError::Connection { .. })));

        let timed_out = ScopedConnection::open(&RefusingConnector(io::ErrorKind::TimedOut), &address());
        assert!(matches!(
            timed_out,
            Err(DevCmdError::Timeout { stage: ExchangeState::Connecting, .. })
        ));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ExchangeState::AwaitingResponse.to_string(), "awaiting response");
        assert_eq!(ExchangeState::Closed.to_string(), "closed");
    }
}
