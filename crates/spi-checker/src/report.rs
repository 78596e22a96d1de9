//! End-of-transaction diagnostics.

use sim_platform::SimTime;

use crate::violation::{Violation, ViolationKind, ViolationSet};

/// Most diagnostics kept per transaction. Later ones are counted, not stored.
pub const MAX_DIAGNOSTICS: usize = 32;

/// A violation and the simulated instant it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    /// When the violation was observed.
    pub at: SimTime,
    /// What was observed.
    pub violation: Violation,
}

/// Outcome of one checked transaction.
///
/// A transaction passes iff no violation of any kind was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransactionReport {
    /// Select line the transfer was checked against, if one was selected.
    pub slave: Option<u32>,
    /// Clock edges counted while selected.
    pub clock_edges: u32,
    /// Bytes assembled from the peer's data line.
    pub bytes_received: u32,
    kinds: ViolationSet,
    diagnostics: heapless::Vec<Diagnostic, MAX_DIAGNOSTICS>,
    dropped: u32,
}

impl TransactionReport {
    /// Empty, passing report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `violation` observed at `at` and log it.
    pub fn record(&mut self, at: SimTime, violation: Violation) {
        tracing::warn!(at = %at, kind = ?violation.kind(), "{violation}");
        self.kinds.insert(violation.kind());
        if self.diagnostics.push(Diagnostic { at, violation }).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    /// Whether no violation was recorded.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Kinds recorded so far.
    #[must_use]
    pub fn kinds(&self) -> ViolationSet {
        self.kinds
    }

    /// Whether a fatal violation ended content checking.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.kinds.has_fatal()
    }

    /// Stored diagnostics, in observation order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics that did not fit in the report.
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Stored diagnostics of `kind`.
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.violation.kind() == kind)
    }

    /// Number of stored diagnostics of `kind`.
    #[must_use]
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Log the outcome for `role`: `info!` on pass, `error!` on failure.
    pub fn log_outcome(&self, role: &'static str) {
        if self.passed() {
            tracing::info!(
                role,
                slave = ?self.slave,
                edges = self.clock_edges,
                bytes = self.bytes_received,
                "transaction passed"
            );
        } else {
            tracing::error!(
                role,
                slave = ?self.slave,
                edges = self.clock_edges,
                kinds = ?self.kinds.iter().collect::<heapless::Vec<_, 8>>(),
                dropped = self.dropped,
                "transaction failed"
            );
        }
    }
}
