use crate::domain::config::{DeviceAddress, TargetConfig};
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, warn};

/// Opens a fresh byte stream to a device for one command exchange.
///
/// Every call must return a new, unshared stream. Dropping the stream closes
/// the underlying connection.
pub trait Connector: Send + Sync {
    type Stream: Read + Write;

    fn connect(&self, address: &DeviceAddress) -> io::Result<Self::Stream>;
}

/// Blocking TCP connector backed by `std::net::TcpStream`
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    no_delay: bool,
}

impl TcpConnector {
    /// Connector without timeouts; connect and read block as long as the OS allows.
    pub fn new() -> Self {
        Self {
            connect_timeout: None,
            read_timeout: None,
            no_delay: true,
        }
    }

    pub fn from_target(target: &TargetConfig) -> Self {
        Self {
            connect_timeout: target.connect_timeout,
            read_timeout: target.read_timeout,
            no_delay: true,
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    fn connect_with_timeout(address: &DeviceAddress, timeout: Duration) -> io::Result<TcpStream> {
        let mut last_error = None;

        for addr in (address.host.as_str(), address.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} did not resolve to any address", address),
            )
        }))
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self, address: &DeviceAddress) -> io::Result<TcpStream> {
        let stream = match self.connect_timeout {
            Some(timeout) => Self::connect_with_timeout(address, timeout)?,
            None => TcpStream::connect((address.host.as_str(), address.port))?,
        };

        // A zero duration is rejected by set_read_timeout
        if let Some(timeout) = self.read_timeout.filter(|t| !t.is_zero()) {
            stream.set_read_timeout(Some(timeout))?;
        }

        if self.no_delay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY: {}", e);
            }
        }

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_connector_from_target() {
        let target = TargetConfig::new(DeviceAddress::new("127.0.0.1", 6438))
            .with_connect_timeout(Duration::from_millis(250))
            .with_read_timeout(Duration::from_secs(2));

        let connector = TcpConnector::from_target(&target);
        assert_eq!(connector.connect_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(connector.read_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(TcpConnector::new().connect_timeout(), None);
    }

    #[test]
    fn test_connect_applies_read_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let target = TargetConfig::new(DeviceAddress::new("127.0.0.1", port))
            .with_connect_timeout(Duration::from_secs(1))
            .with_read_timeout(Duration::from_millis(500));
        let stream = TcpConnector::from_target(&target)
            .connect(&target.address)
            .unwrap();

        assert_eq!(stream.read_timeout().unwrap(), Some(Duration::from_millis(500)));
        assert!(stream.nodelay().unwrap());
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = TcpConnector::new().connect(&DeviceAddress::new("127.0.0.1", port));
        assert!(result.is_err());
    }
}
