//! Per-transaction settings and checker tolerances
//!
//! All timing limits that decide pass/fail are named constants here, so that
//! conformance runs stay reproducible. Roles read them through
//! [`Tolerances`], whose `Default` is exactly these constants.

use sim_platform::{Level, SimDuration};

/// Clock half-periods may be this many percent shorter than nominal.
pub const HALF_PERIOD_TOLERANCE_PCT: u32 = 5;

/// Polls (one per simulated nanosecond) the peer gets to release its output
/// after deselect. Generous on purpose: the peer may still be busy with the
/// data it just received when select goes away.
pub const TRISTATE_RELEASE_BOUND_NS: u32 = 2000;

/// Idle time the driver leaves between putting the bus at rest and
/// asserting select.
pub const SELECT_SETTLE: SimDuration = SimDuration::from_micros(10);

/// Clock edges per byte: two per bit.
pub const EDGES_PER_BYTE: u32 = 16;

/// Bits per transferred word.
pub const BITS_PER_BYTE: u32 = 8;

/// SPI modes (CPOL, CPHA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpiMode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// All four modes, in mode-number order.
    pub const ALL: [Self; 4] = [Self::Mode0, Self::Mode1, Self::Mode2, Self::Mode3];

    /// Mode from its polarity and phase bits.
    #[must_use]
    pub const fn from_bits(cpol: bool, cpha: bool) -> Self {
        match (cpol, cpha) {
            (false, false) => Self::Mode0,
            (false, true) => Self::Mode1,
            (true, false) => Self::Mode2,
            (true, true) => Self::Mode3,
        }
    }

    /// Clock polarity bit.
    #[must_use]
    pub const fn cpol(self) -> bool {
        matches!(self, Self::Mode2 | Self::Mode3)
    }

    /// Clock phase bit.
    #[must_use]
    pub const fn cpha(self) -> bool {
        matches!(self, Self::Mode1 | Self::Mode3)
    }

    /// Clock level while the bus is idle.
    #[must_use]
    pub const fn idle_level(self) -> Level {
        if self.cpol() {
            Level::High
        } else {
            Level::Low
        }
    }

    /// Clock level reached by the edge on which output data changes
    /// (`CPOL XOR CPHA`).
    #[must_use]
    pub const fn data_level(self) -> Level {
        if self.cpol() ^ self.cpha() {
            Level::High
        } else {
            Level::Low
        }
    }

    /// Same phase, opposite polarity.
    #[must_use]
    pub const fn with_inverted_polarity(self) -> Self {
        Self::from_bits(!self.cpol(), self.cpha())
    }
}

/// Settings announced by the DUT before a transaction it masters.
///
/// Decoded once per transaction by the sideband reader and never modified
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransactionConfig {
    /// Clock polarity and phase.
    pub mode: SpiMode,
    /// Nominal SCLK frequency.
    pub frequency_khz: u32,
    /// Whether the DUT sends data on MOSI.
    pub mosi_enabled: bool,
    /// Whether the DUT expects data on MISO.
    pub miso_enabled: bool,
    /// Select line the DUT intends to address.
    pub device_id: u32,
    /// Gap the DUT leaves between frames (informational).
    pub interframe_space: u32,
    /// Bytes the DUT will clock in this transaction.
    pub expected_byte_count: u32,
}

impl TransactionConfig {
    /// Nominal clock half-period.
    #[must_use]
    pub fn half_period(&self) -> SimDuration {
        // frequency is validated non-zero when the sideband fields are decoded
        crate::verify::half_period(self.frequency_khz).unwrap_or(SimDuration::ZERO)
    }

    /// Clock edges a correct transaction produces.
    #[must_use]
    pub fn expected_edges(&self) -> u32 {
        crate::verify::expected_edge_count(self.expected_byte_count)
    }
}

/// Settings announced by the DUT before a transaction the checker masters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverConfig {
    /// Clock polarity and phase.
    pub mode: SpiMode,
    /// Whether the DUT answers on MISO.
    pub miso_enabled: bool,
    /// Bits to clock; need not be a multiple of eight.
    pub expected_bit_count: u32,
    /// Bit rate.
    pub kbps: u32,
    /// Delay between select assertion and the first clock edge.
    pub initial_clock_delay_ns: u32,
}

impl DriverConfig {
    /// Clock half-period for the configured bit rate.
    #[must_use]
    pub fn half_period(&self) -> SimDuration {
        crate::verify::half_period(self.kbps).unwrap_or(SimDuration::ZERO)
    }

    /// Delay between select assertion and the first clock edge.
    #[must_use]
    pub fn initial_clock_delay(&self) -> SimDuration {
        SimDuration::from_nanos(u64::from(self.initial_clock_delay_ns))
    }
}

/// Timing limits applied by both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    /// Allowed shortfall of a measured half-period, in percent.
    pub half_period_pct: u32,
    /// Nanosecond polls allowed for the peer to release MISO.
    pub tristate_release_bound_ns: u32,
    /// Settle time before the driver asserts select.
    pub select_settle: SimDuration,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            half_period_pct: HALF_PERIOD_TOLERANCE_PCT,
            tristate_release_bound_ns: TRISTATE_RELEASE_BOUND_NS,
            select_settle: SELECT_SETTLE,
        }
    }
}
