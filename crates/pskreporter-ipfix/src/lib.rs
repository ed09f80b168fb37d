//! IPFIX encoder for PSK Reporter reception reports.
//!
//! PSK Reporter accepts reports as IPFIX (RFC 5101) messages over UDP. A
//! message is a 16-byte header, optionally the template sets describing the
//! records, then one receiver data set and one sender data set. This crate is
//! pure encoding: no I/O, no clock reads, no randomness.
//!
//! - [`template`] -- the fixed template sets, selected by spot kind and antenna
//! - [`record`] -- receiver and sender record bodies
//! - [`set`] -- data set framing and padding
//! - [`message`] -- header and datagram assembly
//!
//! See <https://pskreporter.info/pskdev.html> for the collector's view of
//! these fields.

pub mod message;
pub mod record;
pub mod set;
pub mod template;

pub use message::{encode_message, MessageHeader, HEADER_LEN, IPFIX_VERSION};
pub use record::{encode_receiver_record, encode_sender_record};
pub use set::{encode_data_set, padded_set_len, RECEIVER_SET_ID, SENDER_SET_ID};
pub use template::{template_sets, ENTERPRISE_NUMBER};
