//! # betsync-client
//!
//! Agency client for betsync.
//!
//! This crate provides:
//! - Frame I/O over any async byte stream, tolerant of short reads/writes
//! - Batched upload of a CSV bet file over one TCP connection
//! - The post-upload winners query
//! - Signal-driven shutdown that closes the socket and file exactly once

pub mod batch;
pub mod closable;
pub mod config;
pub mod connection;
pub mod error;
pub mod session;
pub mod shutdown;
pub mod source;
pub mod winners;

pub use batch::{BatchStats, BatchTransmitter};
pub use closable::Closable;
pub use config::{ClientConfig, ConfigError};
pub use connection::FrameConnection;
pub use error::ClientError;
pub use session::{RunOutcome, RunSummary, Session, SessionState};
pub use shutdown::{spawn_signal_listener, ShutdownHandle};
pub use source::{CsvSource, RecordSource};
pub use winners::query_winners;
