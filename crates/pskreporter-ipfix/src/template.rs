//! Canonical template sets advertised to the collector.
//!
//! PSK Reporter decodes data sets using templates built from its private
//! information elements (enterprise number 30351) plus the IANA
//! `flowStartSeconds` element (150). The templates a client needs depend only
//! on whether it reports an antenna and on its [`SpotKind`], so they are
//! fixed byte blobs selected once when the client is built.
//!
//! Each blob is a complete IPFIX set: the receiver templates are Options
//! Template Sets (set ID 3) describing data set 0x9992, the sender templates
//! are Template Sets (set ID 2) describing data set 0x9993.
//!
//! # Field specifier layout
//!
//! ```text
//! 0x80 <ie>  <len hi> <len lo>  0x00 0x00 0x76 0x8F    enterprise IE, 8 bytes
//! 0x00 0x96  0x00 0x04                                  flowStartSeconds, 4 bytes
//! ```
//!
//! A length of `0xFFFF` marks a variable-length field.

use pskreporter_core::SpotKind;

/// PSK Reporter's private enterprise number.
pub const ENTERPRISE_NUMBER: u32 = 30351;

/// Set ID of an IPFIX Template Set.
pub const TEMPLATE_SET_ID: u16 = 2;

/// Set ID of an IPFIX Options Template Set.
pub const OPTIONS_TEMPLATE_SET_ID: u16 = 3;

/// Field length marking a variable-length information element.
pub const VARIABLE_LENGTH: u16 = 0xFFFF;

/// Information element IDs (without the enterprise bit).
pub mod ie {
    /// Sender callsign (30351.1), variable length.
    pub const SENDER_CALLSIGN: u16 = 1;
    /// Receiver callsign (30351.2), variable length.
    pub const RECEIVER_CALLSIGN: u16 = 2;
    /// Sender locator (30351.3), variable length.
    pub const SENDER_LOCATOR: u16 = 3;
    /// Receiver locator (30351.4), variable length.
    pub const RECEIVER_LOCATOR: u16 = 4;
    /// Frequency in Hz (30351.5), 4 bytes.
    pub const FREQUENCY: u16 = 5;
    /// Signal-to-noise ratio (30351.6), 1 byte.
    pub const SNR: u16 = 6;
    /// Intermodulation distortion (30351.7), 1 byte.
    pub const IMD: u16 = 7;
    /// Decoder software name and version (30351.8), variable length.
    pub const DECODER_SOFTWARE: u16 = 8;
    /// Antenna description (30351.9), variable length.
    pub const ANTENNA_INFORMATION: u16 = 9;
    /// Mode (30351.10), variable length.
    pub const MODE: u16 = 10;
    /// Information source (30351.11), 1 byte.
    pub const INFORMATION_SOURCE: u16 = 11;
    /// IANA `flowStartSeconds` (150), 4 bytes, no enterprise number.
    pub const FLOW_START_SECONDS: u16 = 150;
}

/// Receiver: callsign, locator, decoder software.
pub const RECEIVER_CALLSIGN_LOCATOR_SOFTWARE: [u8; 36] = [
    0x00, 0x03, 0x00, 0x24, 0x99, 0x92, 0x00, 0x03, 0x00, 0x00, //
    0x80, 0x02, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x04, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x08, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x00, 0x00,
];

/// Receiver: callsign, locator, decoder software, antenna.
pub const RECEIVER_CALLSIGN_LOCATOR_SOFTWARE_ANTENNA: [u8; 44] = [
    0x00, 0x03, 0x00, 0x2C, 0x99, 0x92, 0x00, 0x04, 0x00, 0x00, //
    0x80, 0x02, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x04, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x08, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x09, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x00, 0x00,
];

/// Sender: callsign, frequency, mode, source, flow start.
pub const SENDER_CALLSIGN_FREQUENCY_MODE_SOURCE_FLOWSTART: [u8; 44] = [
    0x00, 0x02, 0x00, 0x2C, 0x99, 0x93, 0x00, 0x05, //
    0x80, 0x01, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x05, 0x00, 0x04, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x0A, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x0B, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, //
    0x00, 0x96, 0x00, 0x04,
];

/// Sender: callsign, frequency, mode, source, locator, flow start.
pub const SENDER_CALLSIGN_FREQUENCY_MODE_SOURCE_LOCATOR_FLOWSTART: [u8; 52] = [
    0x00, 0x02, 0x00, 0x34, 0x99, 0x93, 0x00, 0x06, //
    0x80, 0x01, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x05, 0x00, 0x04, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x0A, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x0B, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x03, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x00, 0x96, 0x00, 0x04,
];

/// Sender: callsign, frequency, SNR, IMD, mode, source, flow start.
pub const SENDER_CALLSIGN_FREQUENCY_SNR_IMD_MODE_SOURCE_FLOWSTART: [u8; 60] = [
    0x00, 0x02, 0x00, 0x3C, 0x99, 0x93, 0x00, 0x07, //
    0x80, 0x01, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x05, 0x00, 0x04, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x07, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x0A, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x0B, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, //
    0x00, 0x96, 0x00, 0x04,
];

/// Sender: callsign, frequency, SNR, IMD, mode, source, locator, flow start.
pub const SENDER_CALLSIGN_FREQUENCY_SNR_IMD_MODE_SOURCE_LOCATOR_FLOWSTART: [u8; 68] = [
    0x00, 0x02, 0x00, 0x44, 0x99, 0x93, 0x00, 0x08, //
    0x80, 0x01, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x05, 0x00, 0x04, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x07, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x0A, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x0B, 0x00, 0x01, 0x00, 0x00, 0x76, 0x8F, //
    0x80, 0x03, 0xFF, 0xFF, 0x00, 0x00, 0x76, 0x8F, //
    0x00, 0x96, 0x00, 0x04,
];

/// The receiver options template for a client with or without an antenna.
pub fn receiver_template(has_antenna: bool) -> &'static [u8] {
    if has_antenna {
        &RECEIVER_CALLSIGN_LOCATOR_SOFTWARE_ANTENNA
    } else {
        &RECEIVER_CALLSIGN_LOCATOR_SOFTWARE
    }
}

/// The sender template for a spot kind.
pub fn sender_template(kind: SpotKind) -> &'static [u8] {
    match kind {
        SpotKind::CallsignFrequencyModeSourceFlowstart => {
            &SENDER_CALLSIGN_FREQUENCY_MODE_SOURCE_FLOWSTART
        }
        SpotKind::CallsignFrequencyModeSourceLocatorFlowstart => {
            &SENDER_CALLSIGN_FREQUENCY_MODE_SOURCE_LOCATOR_FLOWSTART
        }
        SpotKind::CallsignFrequencySnrImdModeSourceFlowstart => {
            &SENDER_CALLSIGN_FREQUENCY_SNR_IMD_MODE_SOURCE_FLOWSTART
        }
        SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart => {
            &SENDER_CALLSIGN_FREQUENCY_SNR_IMD_MODE_SOURCE_LOCATOR_FLOWSTART
        }
    }
}

/// Receiver template followed by the sender template, as sent in a message.
pub fn template_sets(kind: SpotKind, has_antenna: bool) -> Vec<u8> {
    let receiver = receiver_template(has_antenna);
    let sender = sender_template(kind);
    let mut out = Vec::with_capacity(receiver.len() + sender.len());
    out.extend_from_slice(receiver);
    out.extend_from_slice(sender);
    out
}
