//! Fatal checker errors.

use core::fmt;

/// A sideband field, named for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Field {
    /// Clock polarity (0/1).
    Cpol,
    /// Clock phase (0/1).
    Cpha,
    /// SCLK frequency in kHz.
    FrequencyKhz,
    /// MOSI enable flag (0/1).
    MosiEnabled,
    /// MISO enable flag (0/1).
    MisoEnabled,
    /// Addressed select line.
    DeviceId,
    /// Inter-frame gap.
    InterframeSpace,
    /// Bytes in the transaction.
    ExpectedByteCount,
    /// Bits in the transaction.
    ExpectedBitCount,
    /// Bit rate in kbit/s.
    Kbps,
    /// Select-to-first-edge delay in ns.
    InitialClockDelay,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cpol => "cpol",
            Self::Cpha => "cpha",
            Self::FrequencyKhz => "frequency_khz",
            Self::MosiEnabled => "mosi_enabled",
            Self::MisoEnabled => "miso_enabled",
            Self::DeviceId => "device_id",
            Self::InterframeSpace => "interframe_space",
            Self::ExpectedByteCount => "expected_byte_count",
            Self::ExpectedBitCount => "expected_bit_count",
            Self::Kbps => "kbps",
            Self::InitialClockDelay => "initial_clock_delay",
        };
        f.write_str(name)
    }
}

/// Error that ends a checker's run.
///
/// Protocol violations are never reported this way; they go into the
/// transaction report. This type covers the cases where the checker cannot
/// continue at all.
#[derive(Debug, thiserror::Error)]
pub enum CheckerError<E> {
    /// The pin interface failed, typically because the simulation ended
    /// while the checker was waiting.
    #[error("pin interface failure: {0}")]
    Pins(#[from] E),

    /// The DUT announced a setting the checker cannot honour.
    #[error("sideband field {field} carried invalid value {value}")]
    InvalidField {
        /// Offending field.
        field: Field,
        /// Value read from the data pins.
        value: u32,
    },
}
