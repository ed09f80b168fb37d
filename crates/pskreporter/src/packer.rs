//! Record packer: fills one sender data set from the queue under a byte budget.
//!
//! The budget covers the whole sender data set, set header and padding
//! included. A record is accepted only if the set would still fit with the
//! worst-case 3 bytes of padding, so the encoded datagram can never exceed
//! the transport's payload limit.
//!
//! The first spot that does not fit goes back to the tail of the queue and
//! packing stops; it is sent by a later flush, possibly one without
//! templates. Spots that could not fit even alone in a template-less
//! datagram, and spots whose fields cannot be encoded, are dropped with a
//! warning instead of blocking the queue forever.

use pskreporter_core::SpotKind;
use pskreporter_ipfix::record::encode_sender_record;
use pskreporter_ipfix::set::{MAX_PADDING, SET_HEADER_LEN};

use crate::queue::SpotQueue;

/// Result of one packing pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackedRecords {
    /// Concatenated sender records, without set header.
    pub payload: Vec<u8>,
    /// Number of records in `payload`.
    pub records: usize,
    /// Spots discarded because they could not be sent at all.
    pub dropped: usize,
    /// Whether a spot was put back because the set was full.
    pub overflowed: bool,
}

/// Drain spots from `queue` into sender records until the set is full or the
/// queue is empty.
///
/// `budget` is the number of bytes available for the complete sender data
/// set in this datagram. `ceiling` is the same quantity for a datagram
/// without template sets, the most any flush can offer. Records keep the
/// dequeue order.
pub fn pack_sender_records(
    queue: &mut SpotQueue,
    kind: SpotKind,
    budget: usize,
    ceiling: usize,
) -> PackedRecords {
    let mut packed = PackedRecords::default();

    while let Some(spot) = queue.try_pop() {
        let record = match encode_sender_record(&spot, kind) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(spot = %spot, error = %e, "Dropping spot that cannot be encoded");
                packed.dropped += 1;
                continue;
            }
        };

        if SET_HEADER_LEN + record.len() + MAX_PADDING > ceiling {
            tracing::warn!(
                spot = %spot,
                bytes = record.len(),
                ceiling,
                "Dropping spot too large for any datagram"
            );
            packed.dropped += 1;
            continue;
        }

        if SET_HEADER_LEN + packed.payload.len() + record.len() + MAX_PADDING > budget {
            queue.requeue(spot);
            packed.overflowed = true;
            break;
        }

        packed.payload.extend_from_slice(&record);
        packed.records += 1;
    }

    packed
}
