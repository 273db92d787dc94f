use crate::core::exchange::ExchangeState;
use thiserror::Error;

/// DevCmd unified error type
#[derive(Error, Debug)]
pub enum DevCmdError {
    /// Could not establish or maintain the TCP connection
    #[error("Connection error for {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing the command bytes failed
    #[error("Transmission error for {addr}: {source}")]
    Transmission {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The device reply was not valid UTF-8
    #[error("Decode error: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// A configured connect or read timeout elapsed
    #[error("Communication timeout for {addr} while {stage}")]
    Timeout { addr: String, stage: ExchangeState },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Emulator error: {message}")]
    Emulator { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output error: {0}")]
    Output(String),
}

impl DevCmdError {
    /// True for failures of the command exchange itself, as opposed to
    /// configuration or local I/O problems.
    pub fn is_exchange_error(&self) -> bool {
        matches!(
            self,
            DevCmdError::Connection { .. }
                | DevCmdError::Transmission { .. }
                | DevCmdError::Decode(_)
                | DevCmdError::Timeout { .. }
        )
    }
}

pub type DevCmdResult<T> = Result<T, DevCmdError>;
