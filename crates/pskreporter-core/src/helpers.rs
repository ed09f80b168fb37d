//! Small formatting and time helpers shared across the workspace.

use std::time::{SystemTime, UNIX_EPOCH};

/// Format a frequency in hertz as a human-readable MHz string.
///
/// Returns a string like `"14.074000 MHz"` with six decimal places.
///
/// # Example
///
/// ```
/// use pskreporter_core::format_freq_mhz;
///
/// assert_eq!(format_freq_mhz(14_074_000), "14.074000 MHz");
/// assert_eq!(format_freq_mhz(50_313_000), "50.313000 MHz");
/// ```
pub fn format_freq_mhz(freq_hz: u64) -> String {
    let mhz = freq_hz as f64 / 1_000_000.0;
    format!("{mhz:.6} MHz")
}

/// Current Unix time in whole seconds.
///
/// IPFIX export times and flow start times are 32-bit seconds. A clock set
/// before 1970 yields 0; see [`epoch_seconds_u32`] for the upper end.
pub fn unix_time_seconds() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| epoch_seconds_u32(d.as_secs()))
        .unwrap_or(0)
}

/// Narrow epoch seconds to the 32-bit IPFIX field, saturating at
/// `u32::MAX` (early 2106) rather than wrapping back to 1970.
pub fn epoch_seconds_u32(secs: u64) -> u32 {
    u32::try_from(secs).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_freq_mhz_hf() {
        assert_eq!(format_freq_mhz(14_074_000), "14.074000 MHz");
        assert_eq!(format_freq_mhz(7_074_000), "7.074000 MHz");
    }

    #[test]
    fn format_freq_mhz_zero() {
        assert_eq!(format_freq_mhz(0), "0.000000 MHz");
    }

    #[test]
    fn epoch_seconds_saturate() {
        assert_eq!(epoch_seconds_u32(1_700_000_000), 1_700_000_000);
        assert_eq!(epoch_seconds_u32(u32::MAX as u64), u32::MAX);
        assert_eq!(epoch_seconds_u32(u32::MAX as u64 + 1), u32::MAX);
        assert_eq!(epoch_seconds_u32(u64::MAX), u32::MAX);
    }

    #[test]
    fn unix_time_is_recent() {
        // 2023-11-14; any sane build host is past this.
        assert!(unix_time_seconds() > 1_700_000_000);
    }
}
