//! Protocol violation taxonomy.
//!
//! Violations are data, not errors: a checker records them and keeps going
//! so that one simulation run surfaces every defect. Only
//! [`MultipleSlavesAsserted`](Violation::MultipleSlavesAsserted) is fatal, and
//! even then only for the current transaction.

use sim_platform::{Level, SimDuration};

/// One observed protocol violation, with the values that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Violation {
    /// More than one select line low at once.
    #[error("more than one slave selected, select value {select_value:#x} (active slave {active_slave})")]
    MultipleSlavesAsserted {
        /// Sampled value of the whole select group.
        select_value: u32,
        /// Slave the transfer is being checked against.
        active_slave: u32,
    },

    /// Clock was not at its idle level when select asserted.
    #[error("unexpected clock polarity {sampled:?} (expected {expected:?}) at the slave select point")]
    ClockPolarity {
        /// Level seen on SCLK.
        sampled: Level,
        /// Idle level implied by CPOL.
        expected: Level,
    },

    /// Two clock edges closer together than the tolerated half-period.
    #[error("clock half period {measured} shorter than allowed minimum {minimum}")]
    ClockTooFast {
        /// Time since the previous edge.
        measured: SimDuration,
        /// Shortest acceptable half-period.
        minimum: SimDuration,
    },

    /// Received byte differs from the fixed pattern.
    #[error("received incorrect data at byte {byte_index}: got {actual:#04x}, expected {expected:#04x}")]
    DataMismatch {
        /// Position in the transfer.
        byte_index: u32,
        /// Pattern byte (right-aligned for partial tails).
        expected: u8,
        /// Assembled byte.
        actual: u8,
    },

    /// Transaction ended after the wrong number of clock edges.
    #[error("incorrect number of clock edges: {counted}/{expected}")]
    EdgeCountMismatch {
        /// Edges seen while selected.
        counted: u32,
        /// Edges implied by the announced byte count.
        expected: u32,
    },

    /// Peer kept driving its output after deselect.
    #[error("output still driven {bound_ns}ns after slave select deassert")]
    TristateReleaseTimeout {
        /// Poll bound that was exhausted, in nanoseconds.
        bound_ns: u32,
    },

    /// Peer was driving its output before it was selected.
    #[error("output driven before slave select assert")]
    OutputDrivenBeforeSelect,

    /// Sideband strobe was not idle when the result handshake began.
    #[error("sideband strobe not low at end of transaction")]
    StrobeNotIdle,
}

/// Discriminant of a [`Violation`], usable as a set member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ViolationKind {
    /// See [`Violation::MultipleSlavesAsserted`].
    MultipleSlavesAsserted = 0,
    /// See [`Violation::ClockPolarity`].
    ClockPolarity = 1,
    /// See [`Violation::ClockTooFast`].
    ClockTooFast = 2,
    /// See [`Violation::DataMismatch`].
    DataMismatch = 3,
    /// See [`Violation::EdgeCountMismatch`].
    EdgeCountMismatch = 4,
    /// See [`Violation::TristateReleaseTimeout`].
    TristateReleaseTimeout = 5,
    /// See [`Violation::OutputDrivenBeforeSelect`].
    OutputDrivenBeforeSelect = 6,
    /// See [`Violation::StrobeNotIdle`].
    StrobeNotIdle = 7,
}

impl ViolationKind {
    /// Every kind, in discriminant order.
    pub const ALL: [Self; 8] = [
        Self::MultipleSlavesAsserted,
        Self::ClockPolarity,
        Self::ClockTooFast,
        Self::DataMismatch,
        Self::EdgeCountMismatch,
        Self::TristateReleaseTimeout,
        Self::OutputDrivenBeforeSelect,
        Self::StrobeNotIdle,
    ];

    /// Whether this kind ends content checking for the transaction.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::MultipleSlavesAsserted)
    }

    const fn bit(self) -> u16 {
        1 << self as u8
    }
}

impl Violation {
    /// Discriminant of this violation.
    #[must_use]
    pub const fn kind(&self) -> ViolationKind {
        match self {
            Self::MultipleSlavesAsserted { .. } => ViolationKind::MultipleSlavesAsserted,
            Self::ClockPolarity { .. } => ViolationKind::ClockPolarity,
            Self::ClockTooFast { .. } => ViolationKind::ClockTooFast,
            Self::DataMismatch { .. } => ViolationKind::DataMismatch,
            Self::EdgeCountMismatch { .. } => ViolationKind::EdgeCountMismatch,
            Self::TristateReleaseTimeout { .. } => ViolationKind::TristateReleaseTimeout,
            Self::OutputDrivenBeforeSelect => ViolationKind::OutputDrivenBeforeSelect,
            Self::StrobeNotIdle => ViolationKind::StrobeNotIdle,
        }
    }

    /// Whether this violation ends content checking for the transaction.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}

/// Set of violation kinds seen in one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct ViolationSet(u16);

impl ViolationSet {
    /// Empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add `kind`; returns `true` if it was not already present.
    pub fn insert(&mut self, kind: ViolationKind) -> bool {
        let fresh = !self.contains(kind);
        self.0 |= kind.bit();
        fresh
    }

    /// Whether `kind` has been recorded.
    #[must_use]
    pub const fn contains(self, kind: ViolationKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether any fatal kind has been recorded.
    #[must_use]
    pub const fn has_fatal(self) -> bool {
        self.contains(ViolationKind::MultipleSlavesAsserted)
    }

    /// Recorded kinds, in discriminant order.
    pub fn iter(self) -> impl Iterator<Item = ViolationKind> {
        ViolationKind::ALL.into_iter().filter(move |&k| self.contains(k))
    }
}
