//! Data set framing and 4-byte alignment.
//!
//! ```text
//! <set id: u16> <set length: u16> <records...> <0x00 padding>
//! ```
//!
//! The set length covers the 4-byte header, the records, and the padding.
//! Padding brings the set to a multiple of four bytes; an already aligned
//! set gets no padding at all.

use bytes::{BufMut, BytesMut};
use pskreporter_core::{Error, Result};

/// Set ID of the receiver data set (matches the receiver options template).
pub const RECEIVER_SET_ID: u16 = 0x9992;

/// Set ID of the sender data set (matches the sender template).
pub const SENDER_SET_ID: u16 = 0x9993;

/// Size of a set header in bytes.
pub const SET_HEADER_LEN: usize = 4;

/// Worst-case padding a set can need.
pub const MAX_PADDING: usize = 3;

/// Number of zero bytes needed to align `len` to four bytes.
///
/// # Example
///
/// ```
/// use pskreporter_ipfix::set::padding_len;
///
/// assert_eq!(padding_len(8), 0);
/// assert_eq!(padding_len(9), 3);
/// assert_eq!(padding_len(11), 1);
/// ```
pub fn padding_len(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Total on-wire length of a set whose records occupy `payload_len` bytes.
pub fn padded_set_len(payload_len: usize) -> usize {
    let unpadded = SET_HEADER_LEN + payload_len;
    unpadded + padding_len(unpadded)
}

/// Frame `payload` as a data set with the given set ID.
///
/// Returns [`Error::Encoding`] if the padded set would not fit the 16-bit
/// set length field.
pub fn encode_data_set(set_id: u16, payload: &[u8]) -> Result<Vec<u8>> {
    let total = padded_set_len(payload.len());
    let length = u16::try_from(total).map_err(|_| {
        Error::Encoding(format!(
            "data set 0x{set_id:04X} is {total} bytes, limit is {}",
            u16::MAX
        ))
    })?;

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u16(set_id);
    buf.put_u16(length);
    buf.put_slice(payload);
    buf.put_bytes(0, total - SET_HEADER_LEN - payload.len());
    Ok(buf.to_vec())
}
