//! Frame I/O over a byte stream.
//!
//! A single write or read on a stream socket may move fewer bytes than
//! asked for. Sends go through `write_all` and receives through
//! `read_exact`, which resume from the current offset until the whole frame
//! has moved; a frame is never handed to the caller half read.

use crate::error::ClientError;
use betsync_protocol::{Frame, FrameHeader, FRAME_HEADER_SIZE};
use bytes::Bytes;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A framed connection over `T`.
#[derive(Debug)]
pub struct FrameConnection<T> {
    stream: T,
}

impl<T> FrameConnection<T> {
    pub fn new(stream: T) -> Self {
        Self { stream }
    }

    /// Returns the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.stream
    }

    /// Returns the underlying stream mutably.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.stream
    }
}

impl<T: AsyncWrite + Unpin> FrameConnection<T> {
    /// Sends one frame: length, end flag, then the payload.
    pub async fn send_frame(&mut self, payload: Bytes, end: bool) -> Result<(), ClientError> {
        let encoded = Frame::new(payload, end).encode()?;
        self.stream.write_all(&encoded).await?;
        self.stream.flush().await?;
        tracing::trace!(bytes = encoded.len(), end, "frame sent");
        Ok(())
    }
}

impl<T: AsyncRead + Unpin> FrameConnection<T> {
    /// Receives one complete frame.
    ///
    /// A zero-length payload is a valid frame. The peer closing the stream
    /// before the header or payload is complete yields
    /// [`ClientError::ConnectionClosed`].
    pub async fn receive_frame(&mut self) -> Result<Frame, ClientError> {
        let mut raw = [0u8; FRAME_HEADER_SIZE];
        self.stream.read_exact(&mut raw).await.map_err(map_read_error)?;
        let header = FrameHeader::parse(&raw)?;

        let mut payload = vec![0u8; header.payload_len as usize];
        self.stream
            .read_exact(&mut payload)
            .await
            .map_err(map_read_error)?;

        tracing::trace!(bytes = payload.len(), end = header.end, "frame received");
        Ok(Frame::new(payload, header.end))
    }
}

fn map_read_error(e: io::Error) -> ClientError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ClientError::ConnectionClosed
    } else {
        ClientError::Io(e)
    }
}
