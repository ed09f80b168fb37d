//! Template-driven IPFIX reader.
//!
//! [`IpfixReader`] decodes messages the way a collector does: template and
//! options template sets are remembered across messages (keyed by template
//! ID), and data sets are decoded with whatever template was last seen for
//! their set ID. Data sets with no known template are reported as undecoded,
//! which is what happens at PSK Reporter when a datagram carrying templates
//! is lost.
//!
//! Nothing here is specific to the client's field layout; tests look fields
//! up by enterprise number and information element ID.

use std::collections::HashMap;

use pskreporter_core::error::{Error, Result};
use pskreporter_ipfix::message::{MessageHeader, HEADER_LEN, IPFIX_VERSION};
use pskreporter_ipfix::set::MAX_PADDING;
use pskreporter_ipfix::template::{OPTIONS_TEMPLATE_SET_ID, TEMPLATE_SET_ID, VARIABLE_LENGTH};

/// One field specifier from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Information element ID without the enterprise bit.
    pub id: u16,
    /// Fixed length, or [`VARIABLE_LENGTH`].
    pub length: u16,
    /// Enterprise number, `None` for IANA elements.
    pub enterprise: Option<u32>,
}

/// A decoded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Template ID; data sets with this set ID use it.
    pub id: u16,
    /// Number of scope fields (options templates only).
    pub scope_field_count: u16,
    /// Field specifiers in record order.
    pub fields: Vec<FieldSpec>,
}

impl Template {
    fn min_record_len(&self) -> usize {
        self.fields
            .iter()
            .map(|f| {
                if f.length == VARIABLE_LENGTH {
                    1
                } else {
                    f.length as usize
                }
            })
            .sum()
    }
}

/// One field value of a decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    /// The specifier the value was decoded with.
    pub spec: FieldSpec,
    /// Raw value bytes (length prefix removed for variable-length fields).
    pub bytes: Vec<u8>,
}

/// One decoded data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// Set ID (= template ID) the record came from.
    pub set_id: u16,
    /// Values in record order.
    pub values: Vec<FieldValue>,
}

impl DecodedRecord {
    /// Look up a field by enterprise number and element ID.
    pub fn field(&self, enterprise: Option<u32>, id: u16) -> Option<&[u8]> {
        self.values
            .iter()
            .find(|v| v.spec.enterprise == enterprise && v.spec.id == id)
            .map(|v| v.bytes.as_slice())
    }

    /// Field decoded as UTF-8 text.
    pub fn string(&self, enterprise: Option<u32>, id: u16) -> Option<String> {
        self.field(enterprise, id)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Field decoded as a big-endian unsigned integer of up to 8 bytes.
    pub fn unsigned(&self, enterprise: Option<u32>, id: u16) -> Option<u64> {
        let bytes = self.field(enterprise, id)?;
        if bytes.len() > 8 {
            return None;
        }
        Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
    }

    /// `(enterprise, id)` of every field, in record order.
    pub fn field_keys(&self) -> Vec<(Option<u32>, u16)> {
        self.values
            .iter()
            .map(|v| (v.spec.enterprise, v.spec.id))
            .collect()
    }
}

/// Everything decoded from one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// The message header.
    pub header: MessageHeader,
    /// Declared message length.
    pub length: u16,
    /// IDs of templates carried in this message.
    pub template_ids: Vec<u16>,
    /// Records from data sets with a known template.
    pub records: Vec<DecodedRecord>,
    /// Set IDs of data sets that could not be decoded (no template yet).
    pub undecoded_sets: Vec<u16>,
    /// `(set id, declared set length)` of every set, in order.
    pub sets: Vec<(u16, u16)>,
}

impl DecodedMessage {
    /// Records from one data set ID, in order.
    pub fn records_in(&self, set_id: u16) -> Vec<&DecodedRecord> {
        self.records.iter().filter(|r| r.set_id == set_id).collect()
    }
}

/// Stateful reader holding the templates seen so far.
#[derive(Debug, Default)]
pub struct IpfixReader {
    templates: HashMap<u16, Template>,
}

impl IpfixReader {
    /// Create a reader with no known templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// The template currently known for `id`.
    pub fn template(&self, id: u16) -> Option<&Template> {
        self.templates.get(&id)
    }

    /// Decode one message, learning any templates it carries.
    pub fn read(&mut self, data: &[u8]) -> Result<DecodedMessage> {
        if data.len() < HEADER_LEN {
            return Err(Error::Protocol(format!(
                "message too short: {} bytes, minimum is {HEADER_LEN}",
                data.len()
            )));
        }

        let version = read_u16(data, 0);
        if version != IPFIX_VERSION {
            return Err(Error::Protocol(format!("unsupported version {version}")));
        }
        let length = read_u16(data, 2);
        if length as usize != data.len() {
            return Err(Error::Protocol(format!(
                "declared length {length} does not match datagram length {}",
                data.len()
            )));
        }

        let header = MessageHeader {
            export_time: read_u32(data, 4),
            sequence_number: read_u32(data, 8),
            observation_domain: read_u32(data, 12),
        };

        let mut msg = DecodedMessage {
            header,
            length,
            template_ids: Vec::new(),
            records: Vec::new(),
            undecoded_sets: Vec::new(),
            sets: Vec::new(),
        };

        let mut offset = HEADER_LEN;
        while offset < data.len() {
            if data.len() - offset < 4 {
                return Err(Error::Protocol(format!(
                    "{} trailing bytes after last set",
                    data.len() - offset
                )));
            }
            let set_id = read_u16(data, offset);
            let set_len = read_u16(data, offset + 2) as usize;
            if set_len < 4 || offset + set_len > data.len() {
                return Err(Error::Protocol(format!(
                    "set 0x{set_id:04X} has invalid length {set_len}"
                )));
            }
            msg.sets.push((set_id, set_len as u16));
            let body = &data[offset + 4..offset + set_len];

            match set_id {
                TEMPLATE_SET_ID | OPTIONS_TEMPLATE_SET_ID => {
                    for template in parse_templates(body, set_id == OPTIONS_TEMPLATE_SET_ID)? {
                        msg.template_ids.push(template.id);
                        self.templates.insert(template.id, template);
                    }
                }
                id if id >= 256 => match self.templates.get(&id) {
                    Some(template) => {
                        msg.records.extend(parse_records(body, template)?);
                    }
                    None => msg.undecoded_sets.push(id),
                },
                other => {
                    return Err(Error::Protocol(format!("reserved set ID {other}")));
                }
            }

            offset += set_len;
        }

        Ok(msg)
    }
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([data[at], data[at + 1]])
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn parse_templates(body: &[u8], options: bool) -> Result<Vec<Template>> {
    let record_header = if options { 6 } else { 4 };
    let mut templates = Vec::new();
    let mut offset = 0;

    // Anything shorter than a template record header is padding.
    while body.len() - offset >= record_header {
        let id = read_u16(body, offset);
        let field_count = read_u16(body, offset + 2);
        let scope_field_count = if options { read_u16(body, offset + 4) } else { 0 };
        offset += record_header;

        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            if body.len() - offset < 4 {
                return Err(Error::Protocol(format!("template {id} truncated")));
            }
            let raw_id = read_u16(body, offset);
            let length = read_u16(body, offset + 2);
            offset += 4;
            let enterprise = if raw_id & 0x8000 != 0 {
                if body.len() - offset < 4 {
                    return Err(Error::Protocol(format!("template {id} truncated")));
                }
                let pen = read_u32(body, offset);
                offset += 4;
                Some(pen)
            } else {
                None
            };
            fields.push(FieldSpec {
                id: raw_id & 0x7FFF,
                length,
                enterprise,
            });
        }

        templates.push(Template {
            id,
            scope_field_count,
            fields,
        });
    }

    if body[offset..].iter().any(|b| *b != 0) {
        return Err(Error::Protocol("non-zero template set padding".into()));
    }
    Ok(templates)
}

fn parse_records(body: &[u8], template: &Template) -> Result<Vec<DecodedRecord>> {
    let min_len = template.min_record_len();
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < body.len() {
        let rest = &body[offset..];
        if rest.len() <= MAX_PADDING && (rest.len() < min_len || rest.iter().all(|b| *b == 0)) {
            // Set padding.
            break;
        }

        let mut values = Vec::with_capacity(template.fields.len());
        for spec in &template.fields {
            let len = if spec.length == VARIABLE_LENGTH {
                let first = *body
                    .get(offset)
                    .ok_or_else(|| truncated(template.id))?;
                offset += 1;
                if first == 255 {
                    if body.len() - offset < 2 {
                        return Err(truncated(template.id));
                    }
                    let long = read_u16(body, offset) as usize;
                    offset += 2;
                    long
                } else {
                    first as usize
                }
            } else {
                spec.length as usize
            };
            if body.len() - offset < len {
                return Err(truncated(template.id));
            }
            values.push(FieldValue {
                spec: *spec,
                bytes: body[offset..offset + len].to_vec(),
            });
            offset += len;
        }

        records.push(DecodedRecord {
            set_id: template.id,
            values,
        });
    }

    Ok(records)
}

fn truncated(template_id: u16) -> Error {
    Error::Protocol(format!("record for template {template_id} truncated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pskreporter_core::{InformationSource, Spot, SpotKind, Station};
    use pskreporter_ipfix::record::{encode_receiver_record, encode_sender_record};
    use pskreporter_ipfix::set::{encode_data_set, RECEIVER_SET_ID, SENDER_SET_ID};
    use pskreporter_ipfix::template::{ie, template_sets, ENTERPRISE_NUMBER};
    use pskreporter_ipfix::{encode_message, MessageHeader};

    const PSK: Option<u32> = Some(ENTERPRISE_NUMBER);

    fn header(seq: u32) -> MessageHeader {
        MessageHeader {
            export_time: 1_700_000_000,
            sequence_number: seq,
            observation_domain: 0x1234_5678,
        }
    }

    fn spot(n: u64) -> Spot {
        Spot::new(
            "N1CALL",
            "II00OG",
            50_313_650 + n,
            -12,
            7,
            "FT8",
            InformationSource::AUTOMATIC,
            1_700_000_000,
        )
    }

    fn message(kind: SpotKind, antenna: Option<&str>, templates: bool, spots: &[Spot]) -> Vec<u8> {
        let receiver = Station::new("N0CALL", "JJ00AA");
        let mut records =
            encode_data_set(RECEIVER_SET_ID, &encode_receiver_record(&receiver, "testsw", antenna).unwrap())
                .unwrap();
        let mut senders = Vec::new();
        for s in spots {
            senders.extend(encode_sender_record(s, kind).unwrap());
        }
        records.extend(encode_data_set(SENDER_SET_ID, &senders).unwrap());
        let tmpl = if templates {
            template_sets(kind, antenna.is_some())
        } else {
            Vec::new()
        };
        encode_message(&header(0), &tmpl, &records).unwrap()
    }

    #[test]
    fn receiver_record_round_trip() {
        let kind = SpotKind::CallsignFrequencyModeSourceFlowstart;
        let data = message(kind, Some("Dipole"), true, &[]);
        let msg = IpfixReader::new().read(&data).unwrap();

        let receivers = msg.records_in(RECEIVER_SET_ID);
        assert_eq!(receivers.len(), 1);
        let r = receivers[0];
        assert_eq!(r.string(PSK, ie::RECEIVER_CALLSIGN).unwrap(), "N0CALL");
        assert_eq!(r.string(PSK, ie::RECEIVER_LOCATOR).unwrap(), "JJ00AA");
        assert_eq!(r.string(PSK, ie::DECODER_SOFTWARE).unwrap(), "testsw");
        assert_eq!(r.string(PSK, ie::ANTENNA_INFORMATION).unwrap(), "Dipole");
    }

    #[test]
    fn sender_fields_match_spot_kind() {
        let base = vec![
            (PSK, ie::SENDER_CALLSIGN),
            (PSK, ie::FREQUENCY),
            (PSK, ie::MODE),
            (PSK, ie::INFORMATION_SOURCE),
            (None, ie::FLOW_START_SECONDS),
        ];
        for kind in SpotKind::ALL {
            let data = message(kind, None, true, &[spot(0)]);
            let msg = IpfixReader::new().read(&data).unwrap();
            let senders = msg.records_in(SENDER_SET_ID);
            assert_eq!(senders.len(), 1, "{kind}");

            let keys = senders[0].field_keys();
            let mut expected = base.clone();
            if kind.has_snr_imd() {
                expected.insert(2, (PSK, ie::SNR));
                expected.insert(3, (PSK, ie::IMD));
            }
            if kind.has_locator() {
                let at = expected.len() - 1;
                expected.insert(at, (PSK, ie::SENDER_LOCATOR));
            }
            assert_eq!(keys, expected, "{kind}");
        }
    }

    #[test]
    fn sender_values_decode() {
        let kind = SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart;
        let data = message(kind, None, true, &[spot(0), spot(1)]);
        let msg = IpfixReader::new().read(&data).unwrap();
        let senders = msg.records_in(SENDER_SET_ID);
        assert_eq!(senders.len(), 2);

        let s = senders[1];
        assert_eq!(s.string(PSK, ie::SENDER_CALLSIGN).unwrap(), "N1CALL");
        assert_eq!(s.unsigned(PSK, ie::FREQUENCY).unwrap(), 50_313_651);
        assert_eq!(s.field(PSK, ie::SNR).unwrap(), &[(-12i8) as u8]);
        assert_eq!(s.unsigned(PSK, ie::IMD).unwrap(), 7);
        assert_eq!(s.string(PSK, ie::MODE).unwrap(), "FT8");
        assert_eq!(s.unsigned(PSK, ie::INFORMATION_SOURCE).unwrap(), 1);
        assert_eq!(s.string(PSK, ie::SENDER_LOCATOR).unwrap(), "II00OG");
        assert_eq!(
            s.unsigned(None, ie::FLOW_START_SECONDS).unwrap(),
            1_700_000_000
        );
    }

    #[test]
    fn data_without_templates_is_undecoded() {
        let kind = SpotKind::CallsignFrequencyModeSourceFlowstart;
        let data = message(kind, None, false, &[spot(0)]);
        let msg = IpfixReader::new().read(&data).unwrap();
        assert!(msg.records.is_empty());
        assert_eq!(msg.undecoded_sets, vec![RECEIVER_SET_ID, SENDER_SET_ID]);
    }

    #[test]
    fn templates_persist_across_messages() {
        let kind = SpotKind::CallsignFrequencyModeSourceLocatorFlowstart;
        let mut reader = IpfixReader::new();
        reader.read(&message(kind, None, true, &[])).unwrap();

        let msg = reader.read(&message(kind, None, false, &[spot(0)])).unwrap();
        assert!(msg.template_ids.is_empty());
        assert_eq!(msg.records_in(SENDER_SET_ID).len(), 1);
        assert!(reader.template(SENDER_SET_ID).is_some());
        assert_eq!(reader.template(RECEIVER_SET_ID).unwrap().scope_field_count, 0);
    }

    #[test]
    fn header_fields_decode() {
        let data = message(SpotKind::default(), None, true, &[]);
        let msg = IpfixReader::new().read(&data).unwrap();
        assert_eq!(msg.header, header(0));
        assert_eq!(msg.length as usize, data.len());
        assert_eq!(msg.template_ids, vec![RECEIVER_SET_ID, SENDER_SET_ID]);
    }

    #[test]
    fn sets_are_aligned() {
        let data = message(SpotKind::default(), Some("Dipole"), true, &[spot(0), spot(1), spot(2)]);
        let msg = IpfixReader::new().read(&data).unwrap();
        for (_, len) in msg.sets {
            assert_eq!(len % 4, 0);
        }
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut data = message(SpotKind::default(), None, true, &[]);
        data.push(0);
        assert!(matches!(
            IpfixReader::new().read(&data),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn rejects_wrong_version() {
        let mut data = message(SpotKind::default(), None, true, &[]);
        data[1] = 0x09;
        assert!(matches!(
            IpfixReader::new().read(&data),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn rejects_truncated_record() {
        let mut reader = IpfixReader::new();
        reader
            .read(&message(SpotKind::default(), None, true, &[]))
            .unwrap();

        // Sender set claiming a 12-byte record body that stops mid-frequency.
        let records = [0x99, 0x93, 0x00, 0x0C, 0x06, b'N', b'1', b'C', b'A', b'L', b'L', 0x00];
        let data = encode_message(&header(1), &[], &records).unwrap();
        assert!(matches!(reader.read(&data), Err(Error::Protocol(_))));
    }
}
