//! Core types describing stations and spots.
//!
//! A [`Spot`] is one observed transmission: who was heard, on what
//! frequency and mode, with what signal quality, and when. The reporting
//! station itself is described by a [`Station`] held in the client
//! configuration. Which optional sender fields go on the wire is selected
//! once per client by a [`SpotKind`].

use std::fmt;
use std::str::FromStr;

use crate::helpers::format_freq_mhz;

/// A callsign + Maidenhead locator pair.
///
/// Identifies either the reporting receiver or the heard sender. Neither
/// field is validated; both may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Station {
    /// Station callsign, e.g. `"N0CALL"`.
    pub callsign: String,
    /// Maidenhead grid locator, e.g. `"JJ00AA"`.
    pub locator: String,
}

impl Station {
    /// Create a station from a callsign and locator.
    pub fn new(callsign: impl Into<String>, locator: impl Into<String>) -> Self {
        Station {
            callsign: callsign.into(),
            locator: locator.into(),
        }
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.locator.is_empty() {
            write!(f, "{}", self.callsign)
        } else {
            write!(f, "{} ({})", self.callsign, self.locator)
        }
    }
}

/// Provenance of a spot, as carried in the `informationSource` field.
///
/// The bottom two bits hold the provenance code and the `0x80` bit marks
/// a test transmission. Any byte is accepted; the collector interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InformationSource(u8);

impl InformationSource {
    /// Automatically extracted by decoding software.
    pub const AUTOMATIC: InformationSource = InformationSource(1);
    /// Taken from a call log (QSO).
    pub const LOG: InformationSource = InformationSource(2);
    /// Other manual entry.
    pub const MANUAL: InformationSource = InformationSource(3);
    /// Flag bit marking a test transmission.
    pub const TEST_FLAG: u8 = 0x80;

    /// Wrap a raw wire byte.
    pub fn from_raw(raw: u8) -> Self {
        InformationSource(raw)
    }

    /// The raw byte sent on the wire.
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// Provenance code from the low two bits (1 = automatic, 2 = log, 3 = manual).
    pub fn provenance(&self) -> u8 {
        self.0 & 0x03
    }

    /// Whether the test-transmission bit is set.
    pub fn is_test(&self) -> bool {
        self.0 & Self::TEST_FLAG != 0
    }

    /// Return a copy with the test-transmission bit set.
    pub fn as_test(self) -> Self {
        InformationSource(self.0 | Self::TEST_FLAG)
    }
}

impl Default for InformationSource {
    fn default() -> Self {
        InformationSource::AUTOMATIC
    }
}

/// One observed transmission, ready to be queued for reporting.
///
/// Spots are moved into the client's queue by `feed` and dropped after
/// they have been encoded into a datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spot {
    /// The station that was heard.
    pub sender: Station,
    /// Frequency of the transmission in hertz.
    pub frequency: u64,
    /// Signal-to-noise ratio in dB. Only sent for SNR/IMD spot kinds.
    pub snr: i8,
    /// Intermodulation distortion. Only sent for SNR/IMD spot kinds.
    pub imd: u8,
    /// Mode name, one of the ADIF MODE or SUBMODE values (e.g. `"FT8"`).
    pub mode: String,
    /// Where the report came from.
    pub information_source: InformationSource,
    /// Start of the transmission, Unix seconds.
    pub flow_start_seconds: u32,
}

impl Spot {
    /// Create a spot.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        callsign: impl Into<String>,
        locator: impl Into<String>,
        frequency: u64,
        snr: i8,
        imd: u8,
        mode: impl Into<String>,
        information_source: InformationSource,
        flow_start_seconds: u32,
    ) -> Self {
        Spot {
            sender: Station::new(callsign, locator),
            frequency,
            snr,
            imd,
            mode: mode.into(),
            information_source,
            flow_start_seconds,
        }
    }
}

impl fmt::Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {} {} {} dB",
            self.sender,
            format_freq_mhz(self.frequency),
            self.mode,
            self.snr
        )
    }
}

/// Which sender fields a client reports.
///
/// Chosen once when the client is built; every spot from that client is
/// encoded with the same layout and the matching template is advertised.
/// Callsign, frequency, mode, information source, and flow start are
/// always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpotKind {
    /// Callsign, frequency, mode, source, flow start.
    #[default]
    CallsignFrequencyModeSourceFlowstart,
    /// As above plus the sender locator.
    CallsignFrequencyModeSourceLocatorFlowstart,
    /// As above (without locator) plus SNR and IMD.
    CallsignFrequencySnrImdModeSourceFlowstart,
    /// All fields: SNR, IMD, and sender locator.
    CallsignFrequencySnrImdModeSourceLocatorFlowstart,
}

impl SpotKind {
    /// All spot kinds, in template order.
    pub const ALL: [SpotKind; 4] = [
        SpotKind::CallsignFrequencyModeSourceFlowstart,
        SpotKind::CallsignFrequencyModeSourceLocatorFlowstart,
        SpotKind::CallsignFrequencySnrImdModeSourceFlowstart,
        SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart,
    ];

    /// Whether sender records carry the SNR and IMD bytes.
    pub fn has_snr_imd(&self) -> bool {
        matches!(
            self,
            SpotKind::CallsignFrequencySnrImdModeSourceFlowstart
                | SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart
        )
    }

    /// Whether sender records carry the sender locator.
    pub fn has_locator(&self) -> bool {
        matches!(
            self,
            SpotKind::CallsignFrequencyModeSourceLocatorFlowstart
                | SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart
        )
    }
}

impl fmt::Display for SpotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpotKind::CallsignFrequencyModeSourceFlowstart => "basic",
            SpotKind::CallsignFrequencyModeSourceLocatorFlowstart => "locator",
            SpotKind::CallsignFrequencySnrImdModeSourceFlowstart => "snr-imd",
            SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart => "snr-imd-locator",
        };
        write!(f, "{s}")
    }
}

/// Error returned when a string cannot be parsed into a [`SpotKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSpotKindError(String);

impl fmt::Display for ParseSpotKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown spot kind: {}", self.0)
    }
}

impl std::error::Error for ParseSpotKindError {}

impl FromStr for SpotKind {
    type Err = ParseSpotKindError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(SpotKind::CallsignFrequencyModeSourceFlowstart),
            "locator" => Ok(SpotKind::CallsignFrequencyModeSourceLocatorFlowstart),
            "snr-imd" | "snrimd" => Ok(SpotKind::CallsignFrequencySnrImdModeSourceFlowstart),
            "snr-imd-locator" | "snrimdlocator" | "full" => {
                Ok(SpotKind::CallsignFrequencySnrImdModeSourceLocatorFlowstart)
            }
            _ => Err(ParseSpotKindError(s.to_string())),
        }
    }
}
