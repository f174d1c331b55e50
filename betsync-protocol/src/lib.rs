//! # betsync-protocol
//!
//! Wire protocol spoken between a betsync agency client and the central
//! lottery server.
//!
//! This crate provides:
//! - Binary framing with a length prefix and an end-of-exchange flag
//! - Bet record serialization and batch payload parsing
//! - Winners query request/response payloads
//! - Protocol errors and constants
//!
//! It performs no I/O; socket handling lives in `betsync-client`.

pub mod bet;
pub mod error;
pub mod frame;
pub mod winners;

pub use bet::{parse_batch, Bet, BET_FIELD_COUNT, SOURCE_FIELD_COUNT};
pub use error::ProtocolError;
pub use frame::{Frame, FrameHeader, FRAME_HEADER_SIZE};
pub use winners::{WinnersRequest, WinnersResponse, WINNERS_COMMAND};

/// Separator between the fields of one record, and between tokens of the
/// winners request and response.
pub const FIELD_DELIMITER: char = ',';

/// Separator between consecutive records inside one batch payload.
pub const RECORD_SEPARATOR: char = '\n';

/// Default port of the lottery server.
pub const DEFAULT_PORT: u16 = 12345;

/// Maximum frame payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;
