//! Stateless transaction verification.
//!
//! Pure functions shared by both roles. None of them decide policy: they
//! return a [`Violation`] and the caller chooses whether it is fatal.

use sim_platform::{Level, SimDuration};

use crate::config::{SpiMode, EDGES_PER_BYTE};
use crate::violation::Violation;

/// What a clock edge means for the data lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    /// Receivers latch the data line.
    Sample,
    /// Transmitters present the next bit.
    Drive,
}

/// Classify the edge that left the clock at `level`.
///
/// The drive edge is the one that reaches `CPOL XOR CPHA`; the other edge of
/// each bit is the sample edge.
#[must_use]
pub fn classify_edge(mode: SpiMode, level: Level) -> EdgeKind {
    if level == mode.data_level() {
        EdgeKind::Drive
    } else {
        EdgeKind::Sample
    }
}

/// Compare a completed byte against the pattern.
pub fn compare_byte(byte_index: u32, expected: u8, actual: u8) -> Result<(), Violation> {
    if expected == actual {
        Ok(())
    } else {
        Err(Violation::DataMismatch {
            byte_index,
            expected,
            actual,
        })
    }
}

/// Compare the `bits` (1..=7) received bits of a partial last byte with the
/// top `bits` bits of the expected byte.
///
/// `actual` is right-aligned, as assembled MSB-first by shifting.
pub fn compare_tail(byte_index: u32, expected: u8, actual: u8, bits: u32) -> Result<(), Violation> {
    let shift = 8u32.saturating_sub(bits).min(7);
    compare_byte(byte_index, expected >> shift, actual)
}

/// Check one measured half-period against the nominal one.
///
/// The measurement fails only when it is strictly shorter than
/// `expected × (100 − tolerance_pct) / 100`; exactly on the limit passes.
pub fn check_half_period(
    elapsed: SimDuration,
    expected: SimDuration,
    tolerance_pct: u32,
) -> Result<(), Violation> {
    let minimum = expected.percent(100u32.saturating_sub(tolerance_pct));
    if elapsed < minimum {
        Err(Violation::ClockTooFast {
            measured: elapsed,
            minimum,
        })
    } else {
        Ok(())
    }
}

/// Nominal half-period for a clock of `frequency_khz`: 1 ms / (2 × kHz).
///
/// `None` for a zero frequency.
#[must_use]
pub fn half_period(frequency_khz: u32) -> Option<SimDuration> {
    let divisor = u64::from(frequency_khz).checked_mul(2)?;
    SimDuration::MILLISECOND
        .as_femtos()
        .checked_div(divisor)
        .map(SimDuration::from_femtos)
}

/// Clock edges produced by a transfer of `bytes` bytes.
#[must_use]
pub fn expected_edge_count(bytes: u32) -> u32 {
    bytes.saturating_mul(EDGES_PER_BYTE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode0_rising_edge_samples() {
        assert_eq!(classify_edge(SpiMode::Mode0, Level::High), EdgeKind::Sample);
        assert_eq!(classify_edge(SpiMode::Mode0, Level::Low), EdgeKind::Drive);
    }

    #[test]
    fn test_mode1_rising_edge_drives() {
        assert_eq!(classify_edge(SpiMode::Mode1, Level::High), EdgeKind::Drive);
        assert_eq!(classify_edge(SpiMode::Mode1, Level::Low), EdgeKind::Sample);
    }

    #[test]
    fn test_compare_byte_reports_both_values() {
        assert!(compare_byte(0, 0x01, 0x01).is_ok());
        assert_eq!(
            compare_byte(3, 0x08, 0x09),
            Err(Violation::DataMismatch {
                byte_index: 3,
                expected: 0x08,
                actual: 0x09
            })
        );
    }

    #[test]
    fn test_compare_tail_uses_top_bits() {
        // 0xAA = 1010_1010; top three bits are 101
        assert!(compare_tail(2, 0xAA, 0b101, 3).is_ok());
        assert!(compare_tail(2, 0xAA, 0b100, 3).is_err());
    }

    #[test]
    fn test_half_period_exactly_on_limit_passes() {
        let nominal = SimDuration::from_nanos(500);
        assert!(check_half_period(SimDuration::from_nanos(475), nominal, 5).is_ok());
        assert!(check_half_period(SimDuration::from_nanos(470), nominal, 5).is_err());
        assert!(check_half_period(nominal, nominal, 5).is_ok());
    }

    #[test]
    fn test_half_period_from_frequency() {
        assert_eq!(half_period(1000), Some(SimDuration::from_nanos(500)));
        assert_eq!(half_period(100), Some(SimDuration::from_micros(5)));
        assert_eq!(half_period(0), None);
    }

    #[test]
    fn test_edge_count_is_sixteen_per_byte() {
        assert_eq!(expected_edge_count(0), 0);
        assert_eq!(expected_edge_count(2), 32);
        assert_eq!(expected_edge_count(u32::MAX), u32::MAX);
    }
}
