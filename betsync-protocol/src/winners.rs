//! Winners query payloads.
//!
//! After its last batch an agency asks for its winners with one terminal
//! frame carrying `WINNERS,<agency>`. The server answers with one frame whose
//! payload is empty (no winners) or the comma-joined documents of the
//! agency's winning bets.

use crate::error::ProtocolError;
use crate::FIELD_DELIMITER;
use bytes::Bytes;

/// Command token opening a winners request.
pub const WINNERS_COMMAND: &str = "WINNERS";

/// A winners request for one agency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnersRequest {
    pub agency: String,
}

impl WinnersRequest {
    pub fn new(agency: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
        }
    }

    /// Encodes the request payload.
    pub fn encode(&self) -> Bytes {
        Bytes::from(format!(
            "{}{}{}",
            WINNERS_COMMAND, FIELD_DELIMITER, self.agency
        ))
    }

    /// Parses a request payload.
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
        match text.split_once(FIELD_DELIMITER) {
            Some((WINNERS_COMMAND, agency)) if !agency.is_empty() => Ok(Self::new(agency)),
            _ => Err(ProtocolError::MalformedRequest(text.to_string())),
        }
    }
}

/// The server's answer to a winners request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WinnersResponse {
    /// Documents of the winning bets, in server order.
    pub documents: Vec<String>,
}

impl WinnersResponse {
    pub fn new(documents: Vec<String>) -> Self {
        Self { documents }
    }

    /// Number of winners.
    pub fn count(&self) -> usize {
        self.documents.len()
    }

    /// Encodes the response payload.
    pub fn encode(&self) -> Bytes {
        Bytes::from(self.documents.join(FIELD_DELIMITER.to_string().as_str()))
    }

    /// Parses a response payload. An empty payload means zero winners.
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
        if text.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self::new(
            text.split(FIELD_DELIMITER).map(str::to_string).collect(),
        ))
    }
}
