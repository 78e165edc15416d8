//! Wire envelope framing
//!
//! ```text
//! byte 0       : 0x00 (marker)
//! bytes 1..4   : schema id, u32 big-endian
//! bytes 5..end : Avro binary payload
//! ```

use crate::error::{Result, SchemaError};
use crate::schema::SchemaId;

/// Marker byte that opens every envelope
pub const MAGIC_BYTE: u8 = 0x00;

/// Marker byte plus the 4-byte schema id
pub const HEADER_LEN: usize = 5;

/// Allocate an envelope buffer with the header already written
pub fn with_header(id: SchemaId, payload_capacity: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload_capacity);
    buf.push(MAGIC_BYTE);
    buf.extend_from_slice(&id.to_be_bytes());
    buf
}

/// Validate the header and split an envelope into schema id and payload
pub fn split(envelope: &[u8]) -> Result<(SchemaId, &[u8])> {
    if envelope.len() < HEADER_LEN {
        return Err(SchemaError::Format {
            length: envelope.len(),
            reason: format!("shorter than the {HEADER_LEN} byte header"),
        });
    }
    if envelope[0] != MAGIC_BYTE {
        return Err(SchemaError::Format {
            length: envelope.len(),
            reason: format!("marker byte is {:#04x}, expected {:#04x}", envelope[0], MAGIC_BYTE),
        });
    }
    let id = SchemaId::from_be_bytes([envelope[1], envelope[2], envelope[3], envelope[4]]);
    Ok((id, &envelope[HEADER_LEN..]))
}

/// Read only the schema id from an envelope
pub fn peek_id(envelope: &[u8]) -> Result<SchemaId> {
    split(envelope).map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let buf = with_header(SchemaId(7), 0);
        assert_eq!(buf, vec![0x00, 0x00, 0x00, 0x00, 0x07]);
    }

    #[test]
    fn test_split_header_only() {
        let (id, payload) = split(&[0, 0, 0, 1, 0]).unwrap();
        assert_eq!(id, SchemaId(256));
        assert!(payload.is_empty());
    }

    #[test]
    fn test_short_envelope_is_format_error() {
        let err = split(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, SchemaError::Format { length: 3, .. }));
    }

    #[test]
    fn test_wrong_marker_is_format_error() {
        let err = split(&[1, 0, 0, 0, 7, 2]).unwrap_err();
        assert!(matches!(err, SchemaError::Format { length: 6, .. }));
    }
}
