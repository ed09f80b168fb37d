//! IPFIX message header and datagram assembly.
//!
//! # Header format (16 bytes, big-endian)
//!
//! ```text
//! 0x00 0x0A  <length: u16>  <export time: u32>  <sequence: u32>  <observation domain: u32>
//! ```
//!
//! The length covers the whole message: header, template sets, and data sets.

use bytes::{BufMut, BytesMut};
use pskreporter_core::{Error, Result};

/// IPFIX protocol version.
pub const IPFIX_VERSION: u16 = 0x000A;

/// Size of the message header in bytes.
pub const HEADER_LEN: usize = 16;

/// Per-message header values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Export time, Unix seconds.
    pub export_time: u32,
    /// Number of messages sent before this one in the session.
    pub sequence_number: u32,
    /// Observation domain ID; the client's random session identifier.
    pub observation_domain: u32,
}

/// Assemble a complete message from a header, the (possibly empty) template
/// sets, and the encoded data sets.
///
/// Returns [`Error::Encoding`] if the message exceeds the 16-bit length field.
///
/// # Example
///
/// ```
/// use pskreporter_ipfix::message::{encode_message, MessageHeader, HEADER_LEN};
///
/// let header = MessageHeader { export_time: 1, sequence_number: 2, observation_domain: 3 };
/// let msg = encode_message(&header, &[], &[]).unwrap();
/// assert_eq!(msg.len(), HEADER_LEN);
/// assert_eq!(&msg[..4], &[0x00, 0x0A, 0x00, 0x10]);
/// ```
pub fn encode_message(header: &MessageHeader, templates: &[u8], records: &[u8]) -> Result<Vec<u8>> {
    let total = HEADER_LEN + templates.len() + records.len();
    let length = u16::try_from(total).map_err(|_| {
        Error::Encoding(format!("message is {total} bytes, limit is {}", u16::MAX))
    })?;

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u16(IPFIX_VERSION);
    buf.put_u16(length);
    buf.put_u32(header.export_time);
    buf.put_u32(header.sequence_number);
    buf.put_u32(header.observation_domain);
    buf.put_slice(templates);
    buf.put_slice(records);
    Ok(buf.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> MessageHeader {
        MessageHeader {
            export_time: 0x6553_F100,
            sequence_number: 7,
            observation_domain: 0xDEAD_BEEF,
        }
    }

    #[test]
    fn header_layout() {
        let msg = encode_message(&header(), &[], &[]).unwrap();
        assert_eq!(
            msg,
            vec![
                0x00, 0x0A, 0x00, 0x10, // version, length
                0x65, 0x53, 0xF1, 0x00, // export time
                0x00, 0x00, 0x00, 0x07, // sequence
                0xDE, 0xAD, 0xBE, 0xEF, // observation domain
            ]
        );
    }

    #[test]
    fn length_covers_templates_and_records() {
        let templates = [0x11; 36];
        let records = [0x22; 12];
        let msg = encode_message(&header(), &templates, &records).unwrap();
        assert_eq!(msg.len(), 64);
        assert_eq!(u16::from_be_bytes([msg[2], msg[3]]), 64);
        assert_eq!(&msg[16..52], &templates);
        assert_eq!(&msg[52..], &records);
    }

    #[test]
    fn oversized_message_is_rejected() {
        let records = vec![0u8; u16::MAX as usize];
        let result = encode_message(&header(), &[], &records);
        assert!(matches!(result, Err(Error::Encoding(_))));
    }
}
