//! Master emulation: check a DUT that acts as a slave.
//!
//! The DUT announces a [`DriverConfig`] over the sideband; the driver then
//! clocks `expected_bit_count` bits at the announced rate, checks what comes
//! back on MISO, checks that the DUT releases MISO after deselect, and
//! reports the verdict back to the DUT through a one-bit handshake.
//!
//! # State machine
//!
//! ```text
//! Idle → PreSelectDelay → SelectedTransfer → DeselectSettle
//!      → TristateCheck → ReportHandshake → Idle
//! ```

use core::convert::Infallible;

use sim_platform::{Level, PinGroup, SimDuration, SimPins};

use crate::config::{DriverConfig, Tolerances, BITS_PER_BYTE};
use crate::error::CheckerError;
use crate::report::TransactionReport;
use crate::sideband::SidebandReader;
use crate::state::TransferState;
use crate::vectors::{ExpectedVector, DRIVER_VECTORS};
use crate::verify;
use crate::violation::Violation;

/// Pin wiring of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverPins {
    /// Serial clock, driven by the driver.
    pub sck: PinGroup,
    /// Master-out line, driven by the driver.
    pub mosi: PinGroup,
    /// Slave-out line, driven by the DUT.
    pub miso: PinGroup,
    /// Select bus, active low; the driver uses bit 0.
    pub ss: PinGroup,
    /// Sideband strobe.
    pub strobe: PinGroup,
    /// Sideband data.
    pub data: PinGroup,
    /// Handshake response line back to the DUT.
    pub resp: PinGroup,
}

/// Where the driver is in its per-transaction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// Reading the sideband announcement.
    Idle,
    /// Bus at rest, waiting before select.
    PreSelectDelay,
    /// Select asserted, bits being clocked.
    SelectedTransfer,
    /// Last bit done; select and clock returning to idle.
    DeselectSettle,
    /// Waiting for the DUT to release MISO.
    TristateCheck,
    /// Telling the DUT whether the transaction passed.
    ReportHandshake,
}

/// Checker that plays the master role.
#[derive(Debug, Clone)]
pub struct BusDriver {
    pins: DriverPins,
    sideband: SidebandReader,
    tolerances: Tolerances,
    vectors: ExpectedVector,
    state: DriverState,
}

impl BusDriver {
    /// Driver on `pins` with default tolerances.
    #[must_use]
    pub fn new(pins: DriverPins) -> Self {
        Self {
            sideband: SidebandReader::new(pins.strobe, pins.data),
            pins,
            tolerances: Tolerances::default(),
            vectors: DRIVER_VECTORS,
            state: DriverState::Idle,
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
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Put select deasserted and the clock low before the first
    /// announcement arrives.
    pub fn init<P: SimPins>(&mut self, bus: &mut P) -> Result<(), P::Error> {
        bus.drive(self.pins.ss, self.pins.ss.all_high())?;
        bus.drive_level(self.pins.sck, Level::Low)?;
        self.enter(DriverState::Idle);
        Ok(())
    }

    /// Initialise, then check transactions until the pin interface fails,
    /// handing each report to `sink`.
    pub async fn run<P, F>(&mut self, bus: &mut P, mut sink: F) -> Result<Infallible, CheckerError<P::Error>>
    where
        P: SimPins,
        F: FnMut(&TransactionReport),
    {
        self.init(bus)?;
        loop {
            let report = self.run_transaction(bus).await?;
            sink(&report);
        }
    }

    /// Read one announcement, run the transaction and report the verdict.
    pub async fn run_transaction<P: SimPins>(
        &mut self,
        bus: &mut P,
    ) -> Result<TransactionReport, CheckerError<P::Error>> {
        self.enter(DriverState::Idle);
        let config = self.sideband.read_driver_config(bus).await?;
        let pins = self.pins;
        let idle = config.mode.idle_level();
        let deselected = pins.ss.all_high();
        let mut report = TransactionReport::new();

        bus.drive_level(pins.sck, idle)?;
        bus.drive(pins.ss, deselected)?;
        self.enter(DriverState::PreSelectDelay);
        self.sleep(bus, self.tolerances.select_settle).await?;

        let mut state = TransferState::default();
        if bus.is_driving(pins.miso)? {
            state.flag(&mut report, bus.now(), Violation::OutputDrivenBeforeSelect);
        }

        bus.drive(pins.resp, 0)?;
        bus.drive_level(pins.sck, idle)?;
        bus.drive(pins.ss, deselected & !1)?;
        let selected_at = bus.now();
        state.active_slave = Some(0);
        state.last_clock_edge_time = selected_at;
        report.slave = Some(0);
        self.enter(DriverState::SelectedTransfer);
        self.sleep(bus, config.initial_clock_delay()).await?;

        let mut clock = self.transfer(bus, &config, &mut state, &mut report).await?;

        self.enter(DriverState::DeselectSettle);
        self.clock_to(bus, &mut state, &mut clock, idle)?;
        bus.drive(pins.ss, deselected)?;
        report.clock_edges = state.clock_edge_count;

        self.enter(DriverState::TristateCheck);
        self.check_release(bus, &mut state, &mut report).await?;

        self.enter(DriverState::ReportHandshake);
        if bus.sample_level(pins.strobe)? != Level::Low {
            state.flag(&mut report, bus.now(), Violation::StrobeNotIdle);
        }
        report.log_outcome("driver");
        bus.drive(pins.resp, 1)?;
        bus.wait_for_change(&[pins.strobe]).await?;
        bus.drive(pins.resp, u32::from(!report.passed()))?;
        bus.wait_for_change(&[pins.strobe]).await?;

        self.enter(DriverState::Idle);
        Ok(report)
    }

    async fn transfer<P: SimPins>(
        &mut self,
        bus: &mut P,
        config: &DriverConfig,
        state: &mut TransferState,
        report: &mut TransactionReport,
    ) -> Result<Level, P::Error> {
        let pins = self.pins;
        let half = config.half_period();
        let data_level = config.mode.data_level();
        let mut clock = config.mode.idle_level();

        for _ in 0..config.expected_bit_count {
            self.clock_to(bus, state, &mut clock, data_level)?;
            let index = state.next_tx_bit();
            let bit = self.vectors.tx_bit(index);
            tracing::trace!(at = %bus.now(), index, bit, "mosi driven");
            bus.drive_level(pins.mosi, Level::from(bit))?;
            self.sleep(bus, half).await?;

            self.clock_to(bus, state, &mut clock, data_level.inverted())?;
            let sampled = bus.sample(pins.miso)? & 1 == 1;
            let at = bus.now();
            self.sleep(bus, half).await?;

            if let Some((index, byte)) = state.shift_in(sampled) {
                report.bytes_received = report.bytes_received.saturating_add(1);
                if config.miso_enabled {
                    if let Err(v) = verify::compare_byte(index, self.vectors.rx_byte(index), byte) {
                        state.flag(report, at, v);
                    }
                }
            }
        }

        let tail = state.rx_tail_bits();
        if tail != 0 && config.miso_enabled {
            let index = state.rx_bit_index / BITS_PER_BYTE;
            let expected = self.vectors.rx_byte(index);
            if let Err(v) = verify::compare_tail(index, expected, state.rx_accumulator, tail) {
                state.flag(report, bus.now(), v);
            }
        }
        self.sleep(bus, half).await?;
        Ok(clock)
    }

    /// Sample MISO once per nanosecond, `bound` times, until the DUT stops
    /// driving it.
    async fn check_release<P: SimPins>(
        &mut self,
        bus: &mut P,
        state: &mut TransferState,
        report: &mut TransactionReport,
    ) -> Result<(), P::Error> {
        let bound = self.tolerances.tristate_release_bound_ns;
        for poll in 0..bound {
            if !bus.is_driving(self.pins.miso)? {
                tracing::trace!(poll, "miso released");
                return Ok(());
            }
            self.sleep(bus, SimDuration::from_nanos(1)).await?;
        }
        // the last sample was taken one nanosecond before the bound
        state.flag(report, bus.now(), Violation::TristateReleaseTimeout { bound_ns: bound });
        Ok(())
    }

    /// Drive the clock to `level`, counting an edge if it moved.
    fn clock_to<P: SimPins>(
        &self,
        bus: &mut P,
        state: &mut TransferState,
        clock: &mut Level,
        level: Level,
    ) -> Result<(), P::Error> {
        bus.drive_level(self.pins.sck, level)?;
        if *clock != level {
            *clock = level;
            state.count_edge(bus.now());
        }
        Ok(())
    }

    async fn sleep<P: SimPins>(&self, bus: &mut P, span: SimDuration) -> Result<(), P::Error> {
        let until = bus.now().saturating_add(span);
        bus.wait_until(until).await
    }

    fn enter(&mut self, next: DriverState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "driver state");
            self.state = next;
        }
    }
}
