//! Client session.
//!
//! A session owns the run's socket and bet file and drives the protocol:
//!
//! ```text
//! Connected -> SendingBatches -> AwaitingAggregate -> Done
//!      \______________\__________________\___-> Cancelled | Failed
//! ```
//!
//! Shutdown is never polled by the I/O path. The [`ShutdownHandle`] fires the
//! tokens watched by the session's [`Closable`] socket and file, and the
//! resulting I/O error is classified as a cancellation because the handle
//! reports itself closed.

use crate::batch::{BatchStats, BatchTransmitter};
use crate::closable::Closable;
use crate::config::ClientConfig;
use crate::connection::FrameConnection;
use crate::error::ClientError;
use crate::shutdown::ShutdownHandle;
use crate::source::{CsvSource, RecordSource};
use crate::winners::query_winners;
use betsync_protocol::WinnersResponse;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::Instrument;

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Socket and bet file open.
    Connected,
    /// Uploading bet batches.
    SendingBatches,
    /// Upload complete, waiting for the winners answer.
    AwaitingAggregate,
    /// Run completed; resources released.
    Done,
    /// Shutdown interrupted the run; resources released.
    Cancelled,
    /// A fault ended the run; resources released.
    Failed,
}

impl SessionState {
    /// Returns whether the session can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Cancelled | SessionState::Failed
        )
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: BatchStats,
    pub winners: WinnersResponse,
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunSummary),
    Cancelled,
}

/// One agency's upload-and-query run over a single connection.
pub struct Session<T, S> {
    agency: String,
    max_amount: usize,
    conn: FrameConnection<Closable<T>>,
    source: S,
    shutdown: ShutdownHandle,
    state: SessionState,
}

impl Session<TcpStream, CsvSource> {
    /// Opens the configured bet file and connects to the server.
    pub async fn connect(
        config: &ClientConfig,
        shutdown: ShutdownHandle,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        let path = config.data_path();
        let source = CsvSource::open(&path, shutdown.file_token()).await?;

        let addr = config.server.address.as_str();
        tracing::debug!("Connecting to {}...", addr);
        let cancelled = shutdown.socket_token();
        let stream = tokio::select! {
            result = TcpStream::connect(addr) => result.map_err(|source| {
                tracing::error!(client_id = config.client.id, error = %source, "connection failed");
                ClientError::Connect {
                    addr: addr.to_string(),
                    source,
                }
            })?,
            _ = cancelled.cancelled() => return Err(ClientError::Cancelled),
        };

        // Batches are flushed one frame at a time; don't let Nagle hold them.
        stream.set_nodelay(true).ok();
        tracing::debug!("TCP connected to {}", addr);

        Ok(Self::new(config, stream, source, shutdown))
    }
}

impl<T, S> Session<T, S>
where
    T: AsyncRead + AsyncWrite + Unpin,
    S: RecordSource,
{
    /// Creates a connected session over an already open stream and source.
    pub fn new(config: &ClientConfig, stream: T, source: S, shutdown: ShutdownHandle) -> Self {
        let socket = Closable::new(stream, shutdown.socket_token(), "socket");
        Self {
            agency: config.agency(),
            max_amount: config.batch.max_amount,
            conn: FrameConnection::new(socket),
            source,
            shutdown,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns whether the socket is still open.
    pub fn is_socket_open(&self) -> bool {
        self.conn.get_ref().is_open()
    }

    /// Uploads every bet, then asks for the agency's winners.
    ///
    /// Socket and file are released on every path. A shutdown during the
    /// run yields `Ok(RunOutcome::Cancelled)`; any other failure is returned
    /// as an error.
    pub async fn run(&mut self) -> Result<RunOutcome, ClientError> {
        if self.state != SessionState::Connected {
            return Err(ClientError::NotConnected);
        }

        let span = tracing::info_span!("session", client_id = %self.agency);
        async {
            let result = self.drive().await;
            self.finish(result).await
        }
        .instrument(span)
        .await
    }

    async fn drive(&mut self) -> Result<RunSummary, ClientError> {
        self.ensure_alive()?;
        self.state = SessionState::SendingBatches;
        let transmitter = BatchTransmitter::new(self.agency.as_str(), self.max_amount);
        let batches = transmitter.run(&mut self.source, &mut self.conn).await?;
        tracing::info!(
            frames = batches.frames,
            records = batches.records,
            "all bets sent"
        );

        self.ensure_alive()?;
        self.state = SessionState::AwaitingAggregate;
        let winners = query_winners(&mut self.conn, &self.agency).await?;
        tracing::info!(
            winners = winners.count(),
            "winners received"
        );

        Ok(RunSummary { batches, winners })
    }

    fn ensure_alive(&self) -> Result<(), ClientError> {
        if self.shutdown.is_alive() {
            Ok(())
        } else {
            Err(ClientError::Cancelled)
        }
    }

    async fn finish(
        &mut self,
        result: Result<RunSummary, ClientError>,
    ) -> Result<RunOutcome, ClientError> {
        self.close().await;

        match result {
            Ok(summary) => {
                self.state = SessionState::Done;
                Ok(RunOutcome::Completed(summary))
            }
            Err(e) if self.shutdown.is_closed() => {
                tracing::info!(state = ?self.state, "run cancelled by shutdown");
                tracing::debug!(error = %e, "interrupted operation");
                self.state = SessionState::Cancelled;
                Ok(RunOutcome::Cancelled)
            }
            Err(e) => {
                tracing::error!(state = ?self.state, error = %e, "run failed");
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Closes the socket, then the bet file. Safe to call repeatedly and
    /// concurrently with a shutdown; each resource is closed at most once.
    pub async fn close(&mut self) {
        if self.conn.get_mut().close().await {
            tracing::debug!("socket closed");
        }
        if self.source.close().await {
            tracing::debug!("bet file closed");
        }
    }
}
