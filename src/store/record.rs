//! On-disk record framing for the file store
//!
//! Each fact is one record:
//! - Record Length (u32 LE), counting every byte including this field
//! - Position (u64 LE), the fact's 1-based number in its log
//! - Payload (UTF-8 fact body)
//! - Checksum (u32 LE), CRC32 over the length field and body
//!
//! Any checksum mismatch is corruption. A record cut short at the end of
//! a file is a torn tail from an interrupted write, not corruption; the
//! reader reports it distinctly so the store can drop it.

use crc32fast::Hasher;
use thiserror::Error;

/// Length + position + checksum, the size of a record with an empty body.
const MIN_RECORD_SIZE: usize = 4 + 8 + 4;

/// Reasons a byte slice does not decode into a record.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The slice ends before the record does. At the end of a file this
    /// is a torn write; anywhere else it cannot be distinguished from one.
    #[error("record truncated")]
    Truncated,

    /// The length field is smaller than any record can be.
    #[error("record length {length} out of range")]
    BadLength { length: u32 },

    #[error("checksum mismatch: computed {computed:08x}, stored {stored:08x}")]
    ChecksumMismatch { computed: u32, stored: u32 },

    #[error("payload is not valid UTF-8")]
    BadUtf8,
}

/// One framed fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactRecord {
    /// 1-based position of the fact in its log.
    pub position: u64,
    /// The fact body.
    pub payload: String,
}

impl FactRecord {
    pub fn new(position: u64, payload: impl Into<String>) -> Self {
        Self {
            position,
            payload: payload.into(),
        }
    }

    /// Serialize the complete record, checksum included.
    pub fn serialize(&self) -> Vec<u8> {
        let payload = self.payload.as_bytes();
        let record_length = (MIN_RECORD_SIZE + payload.len()) as u32;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&self.position.to_le_bytes());
        record.extend_from_slice(payload);

        let checksum = checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());
        record
    }

    /// Deserialize one record from the front of `data`, verifying its
    /// checksum. Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> Result<(Self, usize), RecordError> {
        if data.len() < 4 {
            return Err(RecordError::Truncated);
        }
        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        if (record_length as usize) < MIN_RECORD_SIZE {
            return Err(RecordError::BadLength {
                length: record_length,
            });
        }
        let record_length = record_length as usize;
        if data.len() < record_length {
            return Err(RecordError::Truncated);
        }

        let checksum_offset = record_length - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed = checksum(&data[..checksum_offset]);
        if computed != stored {
            return Err(RecordError::ChecksumMismatch { computed, stored });
        }

        let position = u64::from_le_bytes([
            data[4], data[5], data[6], data[7], data[8], data[9], data[10], data[11],
        ]);
        let payload = std::str::from_utf8(&data[12..checksum_offset])
            .map_err(|_| RecordError::BadUtf8)?
            .to_string();

        Ok((Self { position, payload }, record_length))
    }
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_round_trips() {
        let record = FactRecord::new(7, "cool");
        let bytes = record.serialize();
        let (decoded, consumed) = FactRecord::deserialize(&bytes).unwrap();

        assert_eq!(decoded, record);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn empty_payload_round_trips() {
        let record = FactRecord::new(1, "");
        let bytes = record.serialize();
        assert_eq!(bytes.len(), MIN_RECORD_SIZE);
        let (decoded, _) = FactRecord::deserialize(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn serialization_is_deterministic() {
        let record = FactRecord::new(3, "same fact");
        assert_eq!(record.serialize(), record.serialize());
    }

    #[test]
    fn checksum_detects_corruption() {
        let mut bytes = FactRecord::new(1, "cool").serialize();
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;

        let err = FactRecord::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, RecordError::ChecksumMismatch { .. }));
    }

    #[test]
    fn truncated_record_is_reported_as_torn() {
        let bytes = FactRecord::new(1, "a longer fact body").serialize();
        for cut in [1, 3, 10, bytes.len() - 1] {
            let err = FactRecord::deserialize(&bytes[..cut]).unwrap_err();
            assert!(matches!(err, RecordError::Truncated), "cut at {cut}");
        }
    }

    #[test]
    fn undersized_length_field_is_rejected() {
        let mut bytes = FactRecord::new(1, "cool").serialize();
        bytes[0] = 3;
        bytes[1] = 0;
        bytes[2] = 0;
        bytes[3] = 0;

        let err = FactRecord::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, RecordError::BadLength { length: 3 }));
    }

    #[test]
    fn consecutive_records_parse_in_sequence() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&FactRecord::new(1, "first").serialize());
        bytes.extend_from_slice(&FactRecord::new(2, "second").serialize());

        let (first, consumed) = FactRecord::deserialize(&bytes).unwrap();
        let (second, _) = FactRecord::deserialize(&bytes[consumed..]).unwrap();
        assert_eq!(first.payload, "first");
        assert_eq!(second.position, 2);
    }
}
