//! Client error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] betsync_protocol::ProtocolError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("cancelled by shutdown")]
    Cancelled,

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open bet file '{path}': {source}")]
    OpenSource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed bet at line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: betsync_protocol::ProtocolError,
    },
}

impl ClientError {
    /// Returns whether this error means the connection to the server is gone.
    ///
    /// None of these are retried; a fresh connection would be needed.
    pub fn is_connection_error(&self) -> bool {
        match self {
            ClientError::Connect { .. } | ClientError::ConnectionClosed => true,
            ClientError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::WriteZero
            ),
            _ => false,
        }
    }
}
