//! Slave emulation: check a DUT that masters the bus.
//!
//! Each transaction starts with the DUT announcing a [`TransactionConfig`]
//! over the sideband, then clocking `expected_byte_count` bytes while one
//! select line is held low. The responder answers on MISO with the fixed
//! pattern and checks what arrives on MOSI, the clock timing and the select
//! discipline.
//!
//! # State machine
//!
//! ```text
//! Idle ──sideband read, select idle──→ AwaitSelect
//! AwaitSelect ──any select bit low──→ InTransfer
//! InTransfer ──active bit high──→ Report ──→ Idle
//! ```

use core::convert::Infallible;

use sim_platform::{Level, PinGroup, SimPins, SimTime};

use crate::config::{Tolerances, TransactionConfig};
use crate::error::CheckerError;
use crate::report::TransactionReport;
use crate::sideband::SidebandReader;
use crate::state::TransferState;
use crate::vectors::{ExpectedVector, RESPONDER_VECTORS};
use crate::verify::{self, EdgeKind};
use crate::violation::Violation;

/// Pin wiring of a responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponderPins {
    /// Serial clock, driven by the DUT.
    pub sck: PinGroup,
    /// Master-out line, driven by the DUT.
    pub mosi: PinGroup,
    /// Slave-out line, driven by the responder.
    pub miso: PinGroup,
    /// Select bus, active low, one bit per slave.
    pub ss: PinGroup,
    /// Sideband strobe.
    pub strobe: PinGroup,
    /// Sideband data.
    pub data: PinGroup,
}

/// Where the responder is in its per-transaction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponderState {
    /// Reading the sideband announcement.
    Idle,
    /// Select bus idle; waiting for a slave to be selected.
    AwaitSelect,
    /// A slave is selected; clock edges are being checked.
    InTransfer,
    /// Selection ended; final checks and report.
    Report,
}

/// Checker that plays the slave role.
#[derive(Debug, Clone)]
pub struct BusResponder {
    pins: ResponderPins,
    sideband: SidebandReader,
    tolerances: Tolerances,
    vectors: ExpectedVector,
    state: ResponderState,
}

impl BusResponder {
    /// Responder on `pins` with default tolerances.
    #[must_use]
    pub fn new(pins: ResponderPins) -> Self {
        Self {
            sideband: SidebandReader::new(pins.strobe, pins.data),
            pins,
            tolerances: Tolerances::default(),
            vectors: RESPONDER_VECTORS,
            state: ResponderState::Idle,
        }
    }

    /// Replace the timing tolerances.
    #[must_use]
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ResponderState {
        self.state
    }

    /// Check transactions until the pin interface fails, handing each report
    /// to `sink`.
    pub async fn run<P, F>(&mut self, bus: &mut P, mut sink: F) -> Result<Infallible, CheckerError<P::Error>>
    where
        P: SimPins,
        F: FnMut(&TransactionReport),
    {
        loop {
            let report = self.run_transaction(bus).await?;
            sink(&report);
        }
    }

    /// Read one announcement and check the transaction that follows it.
    pub async fn run_transaction<P: SimPins>(
        &mut self,
        bus: &mut P,
    ) -> Result<TransactionReport, CheckerError<P::Error>> {
        self.enter(ResponderState::Idle);
        let config = self.sideband.read_responder_config(bus).await?;

        let ss = self.pins.ss;
        let deselected = ss.all_high();
        while bus.sample(ss)? != deselected {
            bus.wait_for_change(&[ss]).await?;
        }

        self.enter(ResponderState::AwaitSelect);
        let (select, active) = loop {
            bus.wait_for_change(&[ss]).await?;
            let select = bus.sample(ss)?;
            if let Some(active) = lowest_selected(select, ss) {
                break (select, active);
            }
        };

        let report = self.transfer(bus, &config, select, active).await?;
        report.log_outcome("responder");
        self.enter(ResponderState::Idle);
        Ok(report)
    }

    async fn transfer<P: SimPins>(
        &mut self,
        bus: &mut P,
        config: &TransactionConfig,
        select: u32,
        active: u32,
    ) -> Result<TransactionReport, CheckerError<P::Error>> {
        let pins = self.pins;
        let mode = config.mode;
        let half = config.half_period();
        let active_mask = 1u32.checked_shl(active).unwrap_or(0);

        let selected_at = bus.now();
        let mut report = TransactionReport::new();
        report.slave = Some(active);
        let mut state = TransferState::selected(Some(active), selected_at);
        self.enter(ResponderState::InTransfer);

        check_other_slaves(&mut state, &mut report, selected_at, pins.ss, select, active);

        let mut clock = bus.sample_level(pins.sck)?;
        if clock != mode.idle_level() {
            state.flag(
                &mut report,
                selected_at,
                Violation::ClockPolarity {
                    sampled: clock,
                    expected: mode.idle_level(),
                },
            );
        }

        // no data edge precedes the first sample edge when CPHA = 0;
        // a disabled MISO is never driven, not even this first bit
        if !mode.cpha() && config.miso_enabled {
            self.present_next_bit(bus, &mut state)?;
        }

        loop {
            bus.wait_for_change(&[pins.ss, pins.sck]).await?;
            let select = bus.sample(pins.ss)?;
            let level = bus.sample_level(pins.sck)?;
            let now = bus.now();

            if select & active_mask != 0 {
                break;
            }
            check_other_slaves(&mut state, &mut report, now, pins.ss, select, active);
            if level == clock {
                continue;
            }
            clock = level;

            let (elapsed, preceding) = state.count_edge(now);
            if preceding > 1 {
                if let Err(v) = verify::check_half_period(elapsed, half, self.tolerances.half_period_pct) {
                    state.flag(&mut report, now, v);
                }
            }

            match verify::classify_edge(mode, level) {
                EdgeKind::Drive => {
                    if config.miso_enabled {
                        self.present_next_bit(bus, &mut state)?;
                    }
                }
                EdgeKind::Sample => {
                    if config.mosi_enabled {
                        let bit = bus.sample(pins.mosi)? & 1 == 1;
                        tracing::trace!(at = %now, bit, "mosi sampled");
                        if let Some((index, byte)) = state.shift_in(bit) {
                            report.bytes_received = report.bytes_received.saturating_add(1);
                            if state.content_checks_enabled() {
                                let expected = self.vectors.rx_byte(index);
                                if let Err(v) = verify::compare_byte(index, expected, byte) {
                                    state.flag(&mut report, now, v);
                                }
                            }
                        }
                    }
                }
            }
        }

        self.enter(ResponderState::Report);
        let deselected_at = bus.now();
        report.clock_edges = state.clock_edge_count;
        let expected = config.expected_edges();
        if state.content_checks_enabled() && state.clock_edge_count != expected {
            state.flag(
                &mut report,
                deselected_at,
                Violation::EdgeCountMismatch {
                    counted: state.clock_edge_count,
                    expected,
                },
            );
        }
        Ok(report)
    }

    fn present_next_bit<P: SimPins>(&self, bus: &mut P, state: &mut TransferState) -> Result<(), P::Error> {
        let index = state.next_tx_bit();
        let level = Level::from(self.vectors.tx_bit(index));
        tracing::trace!(at = %bus.now(), index, ?level, "miso driven");
        bus.drive_level(self.pins.miso, level)
    }

    fn enter(&mut self, next: ResponderState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "responder state");
            self.state = next;
        }
    }
}

/// Lowest select bit that is low, if any.
fn lowest_selected(select: u32, ss: PinGroup) -> Option<u32> {
    let low = !select & ss.all_high();
    (low != 0).then(|| low.trailing_zeros())
}

fn check_other_slaves(
    state: &mut TransferState,
    report: &mut TransactionReport,
    at: SimTime,
    ss: PinGroup,
    select: u32,
    active: u32,
) {
    let low = !select & ss.all_high();
    if low & !1u32.checked_shl(active).unwrap_or(0) != 0 {
        state.flag_once(
            report,
            at,
            Violation::MultipleSlavesAsserted {
                select_value: select,
                active_slave: active,
            },
        );
    }
}
