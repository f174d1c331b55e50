//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or payload handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u64, max: u32 },

    #[error("invalid end flag: {0:#x}")]
    InvalidEndFlag(u8),

    #[error("wrong field count: expected {expected}, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    #[error("malformed winners request: {0:?}")]
    MalformedRequest(String),

    #[error("invalid UTF-8 in payload")]
    InvalidUtf8,
}
