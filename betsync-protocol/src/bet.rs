//! Bet records and batch payloads.
//!
//! A bet serializes to its six fields joined by [`FIELD_DELIMITER`], agency
//! first. Records in a batch payload are separated by [`RECORD_SEPARATOR`];
//! there is no separator after the last record and no per-record terminator.
//!
//! Fields are not escaped. A field containing the delimiter or the record
//! separator produces a payload the receiver will split incorrectly.

use crate::error::ProtocolError;
use crate::{FIELD_DELIMITER, RECORD_SEPARATOR};
use bytes::{BufMut, BytesMut};

/// Number of fields a source row carries (everything but the agency).
pub const SOURCE_FIELD_COUNT: usize = 5;

/// Number of fields of a serialized bet, agency included.
pub const BET_FIELD_COUNT: usize = SOURCE_FIELD_COUNT + 1;

/// One lottery bet placed at an agency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    pub agency: String,
    pub first_name: String,
    pub last_name: String,
    pub document: String,
    pub birthdate: String,
    pub number: String,
}

impl Bet {
    /// Builds a bet from a source row, prepending the agency identity.
    ///
    /// The row must hold exactly first name, last name, document, birthdate
    /// and number, in that order.
    pub fn from_fields<S: AsRef<str>>(
        agency: impl Into<String>,
        fields: &[S],
    ) -> Result<Self, ProtocolError> {
        match fields {
            [first_name, last_name, document, birthdate, number] => Ok(Self {
                agency: agency.into(),
                first_name: first_name.as_ref().to_string(),
                last_name: last_name.as_ref().to_string(),
                document: document.as_ref().to_string(),
                birthdate: birthdate.as_ref().to_string(),
                number: number.as_ref().to_string(),
            }),
            _ => Err(ProtocolError::FieldCount {
                expected: SOURCE_FIELD_COUNT,
                actual: fields.len(),
            }),
        }
    }

    fn fields(&self) -> [&str; BET_FIELD_COUNT] {
        [
            self.agency.as_str(),
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.document.as_str(),
            self.birthdate.as_str(),
            self.number.as_str(),
        ]
    }

    /// Serializes the bet into its delimiter-joined form.
    pub fn serialize(&self) -> String {
        self.fields().join(FIELD_DELIMITER.to_string().as_str())
    }

    /// Length in bytes of the serialized bet, without a record separator.
    pub fn encoded_len(&self) -> usize {
        self.fields().iter().map(|f| f.len()).sum::<usize>() + BET_FIELD_COUNT - 1
    }

    /// Appends the serialized bet to a batch buffer, inserting the record
    /// separator when the buffer already holds a record.
    pub fn encode_into(&self, buf: &mut BytesMut) {
        if !buf.is_empty() {
            buf.put_u8(RECORD_SEPARATOR as u8);
        }
        for (i, field) in self.fields().iter().enumerate() {
            if i > 0 {
                buf.put_u8(FIELD_DELIMITER as u8);
            }
            buf.put_slice(field.as_bytes());
        }
    }

    /// Parses one serialized bet (six fields, agency first).
    pub fn parse(record: &str) -> Result<Self, ProtocolError> {
        let fields: Vec<&str> = record.split(FIELD_DELIMITER).collect();
        match fields.as_slice() {
            [agency, rest @ ..] if rest.len() == SOURCE_FIELD_COUNT => {
                Self::from_fields(*agency, rest)
            }
            _ => Err(ProtocolError::FieldCount {
                expected: BET_FIELD_COUNT,
                actual: fields.len(),
            }),
        }
    }
}

/// Parses a batch payload into its bets, in transmission order.
///
/// An empty payload holds no bets.
pub fn parse_batch(payload: &[u8]) -> Result<Vec<Bet>, ProtocolError> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
    text.split(RECORD_SEPARATOR).map(Bet::parse).collect()
}
