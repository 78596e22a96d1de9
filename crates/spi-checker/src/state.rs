//! Mutable per-transaction counters.

use sim_platform::{SimDuration, SimTime};

use crate::config::BITS_PER_BYTE;
use crate::report::TransactionReport;
use crate::violation::{Violation, ViolationSet};

/// Counters for one transaction, created at select assertion and consumed
/// when the report is produced. Nothing here survives between transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferState {
    /// Clock edges seen while selected.
    pub clock_edge_count: u32,
    /// Bits presented on the checker's output so far.
    pub tx_bit_index: u32,
    /// Bits latched from the peer's output so far.
    pub rx_bit_index: u32,
    /// Partially assembled received byte, MSB-first.
    pub rx_accumulator: u8,
    /// Select line being checked.
    pub active_slave: Option<u32>,
    /// Time of the previous clock edge (or of selection).
    pub last_clock_edge_time: SimTime,
    /// Kinds of violation recorded so far.
    pub error_flags: ViolationSet,
}

impl TransferState {
    /// Fresh state for a transfer that was selected at `at`.
    #[must_use]
    pub fn selected(active_slave: Option<u32>, at: SimTime) -> Self {
        Self {
            active_slave,
            last_clock_edge_time: at,
            ..Self::default()
        }
    }

    /// Shift `bit` into the accumulator.
    ///
    /// Returns the completed byte and its index when this bit finished one.
    pub fn shift_in(&mut self, bit: bool) -> Option<(u32, u8)> {
        self.rx_accumulator = (self.rx_accumulator << 1) | u8::from(bit);
        self.rx_bit_index = self.rx_bit_index.saturating_add(1);
        if self.rx_bit_index % BITS_PER_BYTE == 0 {
            let byte = core::mem::take(&mut self.rx_accumulator);
            Some(((self.rx_bit_index / BITS_PER_BYTE).saturating_sub(1), byte))
        } else {
            None
        }
    }

    /// Bits received past the last whole byte.
    #[must_use]
    pub fn rx_tail_bits(&self) -> u32 {
        self.rx_bit_index % BITS_PER_BYTE
    }

    /// Index of the transmit bit to present next, then advance.
    pub fn next_tx_bit(&mut self) -> u32 {
        let index = self.tx_bit_index;
        self.tx_bit_index = self.tx_bit_index.saturating_add(1);
        index
    }

    /// Record `violation` in the flag set and in `report`.
    pub fn flag(&mut self, report: &mut TransactionReport, at: SimTime, violation: Violation) {
        self.error_flags.insert(violation.kind());
        report.record(at, violation);
    }

    /// Like [`flag`](Self::flag), but only the first violation of each kind
    /// is kept.
    pub fn flag_once(&mut self, report: &mut TransactionReport, at: SimTime, violation: Violation) {
        if !self.error_flags.contains(violation.kind()) {
            self.flag(report, at, violation);
        }
    }

    /// Whether received data and edge counts are still worth checking.
    #[must_use]
    pub fn content_checks_enabled(&self) -> bool {
        !self.error_flags.has_fatal()
    }

    /// Count one clock edge at `at`, returning the time since the previous
    /// one and how many edges preceded this one.
    pub fn count_edge(&mut self, at: SimTime) -> (SimDuration, u32) {
        let elapsed = at.saturating_duration_since(self.last_clock_edge_time);
        let preceding = self.clock_edge_count;
        self.last_clock_edge_time = at;
        self.clock_edge_count = self.clock_edge_count.saturating_add(1);
        (elapsed, preceding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_in_completes_bytes_msb_first() {
        let mut state = TransferState::default();
        let mut done = None;
        for bit in [false, false, false, false, false, false, false, true] {
            done = state.shift_in(bit);
        }
        assert_eq!(done, Some((0, 0x01)));
        assert_eq!(state.rx_accumulator, 0);

        for bit in [false, false, false, false, false, false, true, false] {
            done = state.shift_in(bit);
        }
        assert_eq!(done, Some((1, 0x02)));
    }

    #[test]
    fn test_tail_bits_count_partial_byte() {
        let mut state = TransferState::default();
        for _ in 0..11 {
            state.shift_in(true);
        }
        assert_eq!(state.rx_tail_bits(), 3);
        assert_eq!(state.rx_accumulator, 0b111);
    }

    #[test]
    fn test_count_edge_measures_from_selection() {
        let mut state = TransferState::selected(Some(0), SimTime::from_nanos(100));
        let (elapsed, preceding) = state.count_edge(SimTime::from_nanos(600));
        assert_eq!(elapsed.as_nanos(), 500);
        assert_eq!(preceding, 0);
        let (_, preceding) = state.count_edge(SimTime::from_nanos(1100));
        assert_eq!(preceding, 1);
        assert_eq!(state.clock_edge_count, 2);
    }

    #[test]
    fn test_fatal_flag_disables_content_checks() {
        let mut state = TransferState::default();
        let mut report = TransactionReport::new();
        state.flag(&mut report, SimTime::ZERO, Violation::StrobeNotIdle);
        assert!(state.content_checks_enabled());
        let fatal = Violation::MultipleSlavesAsserted {
            select_value: 0,
            active_slave: 0,
        };
        state.flag_once(&mut report, SimTime::ZERO, fatal);
        state.flag_once(&mut report, SimTime::ZERO, fatal);
        assert!(!state.content_checks_enabled());
        assert_eq!(report.diagnostics().len(), 2);
    }
}
