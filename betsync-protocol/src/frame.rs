//! Binary frame format.
//!
//! Frame layout (5 bytes header + payload):
//!
//! ```text
//! +-------------+----------+---------------------+
//! | payload_len | end_flag | payload             |
//! |   4 bytes   |  1 byte  | payload_len bytes   |
//! +-------------+----------+---------------------+
//! ```
//!
//! `payload_len` is an unsigned big-endian integer. `end_flag` is `0` while
//! more frames of the current exchange follow and `1` on the terminal frame.
//! Framing is length based: payloads may contain any byte, including the
//! field delimiter, and carry no terminator of their own.

use crate::error::ProtocolError;
use crate::MAX_PAYLOAD_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of the fixed frame header in bytes (4 + 1 = 5).
pub const FRAME_HEADER_SIZE: usize = 5;

const FLAG_MORE: u8 = 0;
const FLAG_END: u8 = 1;

/// A parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Exact number of payload bytes that follow the header.
    pub payload_len: u32,
    /// Whether this is the terminal frame of its exchange.
    pub end: bool,
}

impl FrameHeader {
    /// Parses a header, rejecting unknown flag values and oversized lengths.
    pub fn parse(bytes: &[u8; FRAME_HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let payload_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let end = match bytes[4] {
            FLAG_MORE => false,
            FLAG_END => true,
            other => return Err(ProtocolError::InvalidEndFlag(other)),
        };

        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len as u64,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self { payload_len, end })
    }

    /// Encodes the header into its wire representation.
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let len = self.payload_len.to_be_bytes();
        let flag = if self.end { FLAG_END } else { FLAG_MORE };
        [len[0], len[1], len[2], len[3], flag]
    }
}

/// A complete frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Whether this is the terminal frame of its exchange.
    pub end: bool,
    /// Frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a frame with the given payload and end flag.
    pub fn new(payload: impl Into<Bytes>, end: bool) -> Self {
        Self {
            end,
            payload: payload.into(),
        }
    }

    /// Returns the header describing this frame.
    pub fn header(&self) -> Result<FrameHeader, ProtocolError> {
        let size = self.payload.len() as u64;
        if size > MAX_PAYLOAD_SIZE as u64 {
            return Err(ProtocolError::FrameTooLarge {
                size,
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(FrameHeader {
            payload_len: size as u32,
            end: self.end,
        })
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let header = self.header()?;
        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        buf.put_slice(&header.to_bytes());
        buf.put_slice(&self.payload);
        Ok(buf)
    }

    /// Decodes a frame from bytes.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    /// Nothing is consumed until the whole frame is buffered.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let mut raw = [0u8; FRAME_HEADER_SIZE];
        raw.copy_from_slice(&buf[..FRAME_HEADER_SIZE]);
        let header = FrameHeader::parse(&raw)?;

        let total_len = FRAME_HEADER_SIZE + header.payload_len as usize;
        if buf.len() < total_len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        let payload = buf.split_to(header.payload_len as usize).freeze();

        Ok(Some(Self {
            end: header.end,
            payload,
        }))
    }

    /// Returns the payload as UTF-8 text.
    pub fn payload_str(&self) -> Result<&str, ProtocolError> {
        std::str::from_utf8(&self.payload).map_err(|_| ProtocolError::InvalidUtf8)
    }
}
