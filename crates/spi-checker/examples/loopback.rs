//! Loopback demo: one responder and one driver transaction on scripted buses.
//!
//! ```text
//! RUST_LOG=debug cargo run -p spi-checker --example loopback
//! ```

#![allow(missing_docs, clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use sim_platform::mocks::{Peer, PeerAction, PeerPort, ScriptedBus};
use sim_platform::{PinError, PinGroup, SimDuration, SimTime};
use spi_checker::vectors::{DRIVER_VECTORS, RESPONDER_VECTORS};
use spi_checker::{BusDriver, BusResponder, DriverPins, ResponderPins, SpiMode};
use tracing::info;

const HALF_NS: u64 = 500;

fn ns(nanos: u64) -> SimTime {
    SimTime::from_nanos(nanos)
}

/// Announce `fields` from `start`; returns the end of the announcement.
fn announce<P: Peer>(
    bus: &mut ScriptedBus<P>,
    strobe: PinGroup,
    data: PinGroup,
    start: u64,
    fields: &[u32],
) -> Result<u64, PinError> {
    let mut t = start;
    for &value in fields {
        bus.schedule(ns(t), data, value)?;
        bus.schedule(ns(t + 10), strobe, 1)?;
        bus.schedule(ns(t + 20), strobe, 0)?;
        t += 40;
    }
    Ok(t)
}

/// A well-behaved DUT master clocking `bytes` in mode 0.
fn script_master(bus: &mut ScriptedBus, pins: &ResponderPins, start: u64, bytes: &[u8]) -> Result<(), PinError> {
    let bit = |index: u64| -> u32 {
        let byte = bytes.get((index / 8) as usize).copied().unwrap_or(0);
        u32::from(byte >> (7 - index % 8) & 1)
    };
    let selected = start + 200;
    bus.schedule(ns(selected), pins.ss, 0)?;
    bus.schedule(ns(selected), pins.mosi, bit(0))?;
    let edges = bytes.len() as u64 * 16;
    for k in 0..edges {
        let t = selected + (k + 1) * HALF_NS;
        let rising = k % 2 == 0;
        bus.schedule(ns(t), pins.sck, u32::from(rising))?;
        if !rising {
            bus.schedule(ns(t), pins.mosi, bit((k + 1) / 2))?;
        }
    }
    bus.schedule(ns(selected + (edges + 1) * HALF_NS), pins.ss, 1)
}

/// A well-behaved DUT slave in mode 0 that also answers the handshake.
struct DemoSlave {
    pins: DriverPins,
    next_bit: u32,
    selected: bool,
    awaiting_verdict: bool,
}

impl DemoSlave {
    fn present(&mut self, port: &mut PeerPort<'_>) -> Result<(), PinError> {
        let byte = DRIVER_VECTORS.rx_byte(self.next_bit / 8);
        let bit = (byte >> (7 - self.next_bit % 8)) & 1;
        self.next_bit += 1;
        port.set(self.pins.miso, u32::from(bit))
    }

    fn react(&mut self, port: &mut PeerPort<'_>, group: PinGroup, previous: u32, value: u32) -> Result<(), PinError> {
        let pins = self.pins;
        if group == pins.ss && previous != value {
            self.selected = value == 0;
            if self.selected {
                self.next_bit = 0;
                self.present(port)?;
            } else {
                port.schedule(SimDuration::from_nanos(50), pins.miso, PeerAction::Release)?;
            }
        } else if group == pins.sck && self.selected && previous == 1 && value == 0 {
            self.present(port)?;
        } else if group == pins.resp {
            if self.awaiting_verdict {
                info!(verdict = value, "DUT received verdict");
                self.awaiting_verdict = false;
            } else if value == 1 {
                port.schedule(SimDuration::from_nanos(50), pins.strobe, PeerAction::Set(1))?;
                port.schedule(SimDuration::from_nanos(100), pins.strobe, PeerAction::Set(0))?;
                self.awaiting_verdict = true;
            }
        }
        Ok(())
    }
}

impl Peer for DemoSlave {
    fn on_drive(&mut self, port: &mut PeerPort<'_>, group: PinGroup, previous: u32, value: u32) {
        if let Err(err) = self.react(port, group, previous, value) {
            tracing::error!(%err, "demo slave failed to react");
        }
    }
}

async fn responder_demo() -> Result<(), Box<dyn std::error::Error>> {
    let mut bus = ScriptedBus::new();
    let pins = ResponderPins {
        sck: bus.add_group(1, 0)?,
        mosi: bus.add_group(1, 0)?,
        miso: bus.add_group(1, 0)?,
        ss: bus.add_group(1, 1)?,
        strobe: bus.add_group(1, 0)?,
        data: bus.add_group(32, 0)?,
    };
    let end = announce(&mut bus, pins.strobe, pins.data, 0, &[0, 0, 1000, 1, 1, 0, 0, 4])?;
    script_master(&mut bus, &pins, end, &RESPONDER_VECTORS.rx()[..4])?;

    let report = BusResponder::new(pins).run_transaction(&mut bus).await?;
    info!(
        passed = report.passed(),
        edges = report.clock_edges,
        bytes = report.bytes_received,
        "responder demo finished"
    );
    Ok(())
}

async fn driver_demo() -> Result<(), Box<dyn std::error::Error>> {
    let mut bus = ScriptedBus::new();
    let pins = DriverPins {
        sck: bus.add_group(1, 0)?,
        mosi: bus.add_group(1, 0)?,
        miso: bus.add_group(1, 0)?,
        ss: bus.add_group(1, 1)?,
        strobe: bus.add_group(1, 0)?,
        data: bus.add_group(32, 0)?,
        resp: bus.add_group(1, 0)?,
    };
    let mode = SpiMode::Mode0;
    announce(
        &mut bus,
        pins.strobe,
        pins.data,
        0,
        &[u32::from(mode.cpol()), u32::from(mode.cpha()), 1, 32, 1000, 200],
    )?;
    let mut bus = bus.with_peer(DemoSlave {
        pins,
        next_bit: 0,
        selected: false,
        awaiting_verdict: false,
    });

    let mut driver = BusDriver::new(pins);
    driver.init(&mut bus)?;
    let report = driver.run_transaction(&mut bus).await?;
    info!(
        passed = report.passed(),
        edges = report.clock_edges,
        bytes = report.bytes_received,
        "driver demo finished"
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let rt = tokio::runtime::Builder::new_current_thread().build()?;
    rt.block_on(async {
        responder_demo().await?;
        driver_demo().await
    })
}
