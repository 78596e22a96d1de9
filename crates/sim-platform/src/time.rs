//! Simulated-time newtypes.
//!
//! The simulator ticks in femtoseconds. Keeping instants and spans as
//! distinct newtypes prevents the classic testbench bug of adding two
//! absolute timestamps together:
//! - [`SimTime`]: an absolute instant on the simulator's monotonic clock
//! - [`SimDuration`]: a span between two instants
//!
//! All arithmetic saturates; a checker must never wrap simulated time.

use core::fmt;

const FEMTOS_PER_NANO: u64 = 1_000_000;
const FEMTOS_PER_MICRO: u64 = 1_000_000_000;
const FEMTOS_PER_MILLI: u64 = 1_000_000_000_000;

// ── SimDuration ──────────────────────────────────────────────────────────────

/// A span of simulated time, in femtoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct SimDuration(u64);

impl SimDuration {
    /// Zero-length span.
    pub const ZERO: Self = Self(0);

    /// One simulated millisecond.
    pub const MILLISECOND: Self = Self(FEMTOS_PER_MILLI);

    /// Create a span from raw simulator ticks (femtoseconds).
    #[must_use]
    pub const fn from_femtos(femtos: u64) -> Self {
        Self(femtos)
    }

    /// Create a span from nanoseconds, saturating on overflow.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos.saturating_mul(FEMTOS_PER_NANO))
    }

    /// Create a span from microseconds, saturating on overflow.
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(FEMTOS_PER_MICRO))
    }

    /// Raw simulator ticks.
    #[must_use]
    pub const fn as_femtos(self) -> u64 {
        self.0
    }

    /// Whole nanoseconds (truncating).
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0 / FEMTOS_PER_NANO
    }

    /// Saturating sum of two spans.
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating difference of two spans.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Saturating multiplication by an integer factor.
    #[must_use]
    pub const fn saturating_mul(self, factor: u64) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    /// Scale by `percent / 100`, rounding down.
    ///
    /// Computed in 128-bit so that percentages above 100 cannot overflow.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // clamped to u64::MAX first
    pub fn percent(self, percent: u32) -> Self {
        let scaled = u128::from(self.0).saturating_mul(u128::from(percent)) / 100;
        Self(scaled.min(u128::from(u64::MAX)) as u64)
    }
}

impl fmt::Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / FEMTOS_PER_NANO;
        let frac = (self.0 % FEMTOS_PER_NANO) / 10_000;
        write!(f, "{whole}.{frac:02}ns")
    }
}

// ── SimTime ──────────────────────────────────────────────────────────────────

/// An absolute instant on the simulator's monotonic clock, in femtoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct SimTime(u64);

impl SimTime {
    /// Simulation start.
    pub const ZERO: Self = Self(0);

    /// Create an instant from raw simulator ticks (femtoseconds).
    #[must_use]
    pub const fn from_femtos(femtos: u64) -> Self {
        Self(femtos)
    }

    /// Create an instant `nanos` after simulation start.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos.saturating_mul(FEMTOS_PER_NANO))
    }

    /// Raw simulator ticks.
    #[must_use]
    pub const fn as_femtos(self) -> u64 {
        self.0
    }

    /// Whole nanoseconds since simulation start (truncating).
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0 / FEMTOS_PER_NANO
    }

    /// The instant `span` after this one, saturating at the end of time.
    #[must_use]
    pub const fn saturating_add(self, span: SimDuration) -> Self {
        Self(self.0.saturating_add(span.as_femtos()))
    }

    /// Span elapsed since `earlier`; zero if `earlier` is in the future.
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> SimDuration {
        SimDuration::from_femtos(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        SimDuration::from_femtos(self.0).fmt(f)
    }
}
