//! Receiver and sender record encoding.
//!
//! Strings are IPFIX variable-length fields in their short form: one length
//! byte followed by the UTF-8 bytes. Only the short form is used, so every
//! string must be at most 255 bytes; longer values fail with
//! [`Error::Encoding`] instead of corrupting the record.
//!
//! # Receiver record
//!
//! ```text
//! <callsign> <locator> <decoder software> [<antenna>]
//! ```
//!
//! # Sender record
//!
//! ```text
//! <callsign> <frequency: u32> [<snr: i8> <imd: u8>] <mode> <source: u8> [<locator>] <flow start: u32>
//! ```
//!
//! Bracketed fields depend on the [`SpotKind`] (sender) or on whether an
//! antenna was configured (receiver).

use bytes::{BufMut, BytesMut};
use pskreporter_core::{Error, Result, Spot, SpotKind, Station};

/// Longest string that fits a one-byte length prefix.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Append a length-prefixed string.
///
/// `field` names the value in the error message.
pub fn put_string(buf: &mut BytesMut, field: &str, value: &str) -> Result<()> {
    let len = u8::try_from(value.len()).map_err(|_| {
        Error::Encoding(format!(
            "{field} is {} bytes, limit is {MAX_STRING_LEN}",
            value.len()
        ))
    })?;
    buf.put_u8(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

/// Check that a string fits a one-byte length prefix without encoding it.
pub fn check_string(field: &str, value: &str) -> Result<()> {
    if value.len() > MAX_STRING_LEN {
        return Err(Error::Encoding(format!(
            "{field} is {} bytes, limit is {MAX_STRING_LEN}",
            value.len()
        )));
    }
    Ok(())
}

/// Encode the receiver record (without set header).
///
/// `antenna` is `None` when no antenna was configured; the field is then
/// omitted entirely, matching the shorter receiver template.
///
/// # Example
///
/// ```
/// use pskreporter_core::Station;
/// use pskreporter_ipfix::record::encode_receiver_record;
///
/// let rec = encode_receiver_record(&Station::new("N0CALL", "JJ00"), "sw", None).unwrap();
/// assert_eq!(rec, b"\x06N0CALL\x04JJ00\x02sw");
/// ```
pub fn encode_receiver_record(
    receiver: &Station,
    decoder_software: &str,
    antenna: Option<&str>,
) -> Result<Vec<u8>> {
    let capacity = 4
        + receiver.callsign.len()
        + receiver.locator.len()
        + decoder_software.len()
        + antenna.map_or(0, str::len);
    let mut buf = BytesMut::with_capacity(capacity);
    put_string(&mut buf, "receiver callsign", &receiver.callsign)?;
    put_string(&mut buf, "receiver locator", &receiver.locator)?;
    put_string(&mut buf, "decoder software", decoder_software)?;
    if let Some(antenna) = antenna {
        put_string(&mut buf, "antenna information", antenna)?;
    }
    Ok(buf.to_vec())
}

/// Encode one sender record (without set header) for the given spot kind.
///
/// Fails with [`Error::Encoding`] if a string exceeds 255 bytes or the
/// frequency does not fit in 32 bits.
pub fn encode_sender_record(spot: &Spot, kind: SpotKind) -> Result<Vec<u8>> {
    let frequency = u32::try_from(spot.frequency).map_err(|_| {
        Error::Encoding(format!(
            "frequency {} Hz does not fit the 4-byte field",
            spot.frequency
        ))
    })?;

    let capacity = 1
        + spot.sender.callsign.len()
        + 4
        + 2
        + 1
        + spot.mode.len()
        + 1
        + 1
        + spot.sender.locator.len()
        + 4;
    let mut buf = BytesMut::with_capacity(capacity);

    put_string(&mut buf, "sender callsign", &spot.sender.callsign)?;
    buf.put_u32(frequency);

    if kind.has_snr_imd() {
        buf.put_i8(spot.snr);
        buf.put_u8(spot.imd);
    }

    put_string(&mut buf, "mode", &spot.mode)?;
    buf.put_u8(spot.information_source.raw());

    if kind.has_locator() {
        put_string(&mut buf, "sender locator", &spot.sender.locator)?;
    }

    buf.put_u32(spot.flow_start_seconds);
    Ok(buf.to_vec())
}
