// Core module - command exchange over a per-call connection
pub mod client;
pub mod exchange;
pub mod transport;

pub use client::{send_command, CommandClient, RESPONSE_BUFFER_SIZE};
pub use exchange::{ExchangeState, ScopedConnection};
pub use transport::{Connector, TcpConnector};
