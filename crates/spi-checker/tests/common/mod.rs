//! Stimulus builders shared by the checker integration tests.
//!
//! Everything here scripts the DUT side of the bus on a [`ScriptedBus`]:
//! sideband announcements, a DUT clocking the bus as master, and a reactive
//! DUT slave for the driver tests.

#![allow(dead_code)]

use sim_platform::mocks::{Peer, PeerAction, PeerPort, ScriptedBus};
use sim_platform::{Level, PinGroup, SimDuration, SimTime};
use spi_checker::{DriverPins, ResponderPins, SpiMode};

/// Gap between two sideband fields.
pub const FIELD_SPACING_NS: u64 = 40;

/// Gap between the end of the announcement and select assertion.
pub const SELECT_LEAD_NS: u64 = 200;

pub fn at(nanos: u64) -> SimTime {
    SimTime::from_nanos(nanos)
}

/// Script the DUT announcing `fields` from `start_ns`.
///
/// Each field puts the value on the data pins, then pulses the strobe.
/// Returns the instant (ns) after the last field.
pub fn script_sideband<P: Peer>(
    bus: &mut ScriptedBus<P>,
    strobe: PinGroup,
    data: PinGroup,
    start_ns: u64,
    fields: &[u32],
) -> u64 {
    let mut t = start_ns;
    for &value in fields {
        bus.schedule(at(t), data, value).unwrap();
        bus.schedule(at(t + 10), strobe, 1).unwrap();
        bus.schedule(at(t + 20), strobe, 0).unwrap();
        t += FIELD_SPACING_NS;
    }
    t
}

/// Responder announcement, in wire order.
pub fn responder_fields(mode: SpiMode, khz: u32, mosi: bool, miso: bool, bytes: u32) -> [u32; 8] {
    [
        u32::from(mode.cpol()),
        u32::from(mode.cpha()),
        khz,
        u32::from(mosi),
        u32::from(miso),
        0,
        0,
        bytes,
    ]
}

/// Driver announcement, in wire order.
pub fn driver_fields(mode: SpiMode, miso: bool, bits: u32, kbps: u32, delay_ns: u32) -> [u32; 6] {
    [
        u32::from(mode.cpol()),
        u32::from(mode.cpha()),
        u32::from(miso),
        bits,
        kbps,
        delay_ns,
    ]
}

/// Bit `index` of `bytes`, MSB-first, zero past the end.
pub fn bit_of(bytes: &[u8], index: usize) -> u32 {
    let byte = bytes.get(index / 8).copied().unwrap_or(0);
    u32::from((byte >> (7 - index % 8)) & 1)
}

/// Pack MSB-first bits into bytes; a trailing partial byte is dropped.
pub fn pack_bits(bits: &[u32]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1) as u8))
        .collect()
}

// ── Responder bench ─────────────────────────────────────────────────────────

/// Bus wired for a responder, with no reactive peer.
pub struct ResponderBench {
    pub bus: ScriptedBus,
    pub pins: ResponderPins,
}

impl ResponderBench {
    pub fn new(select_width: u8) -> Self {
        let mut bus = ScriptedBus::new();
        let sck = bus.add_group(1, 0).unwrap();
        let mosi = bus.add_group(1, 0).unwrap();
        let miso = bus.add_group(1, 0).unwrap();
        let idle_select = PinGroup::new(0, select_width).all_high();
        let ss = bus.add_group(select_width, idle_select).unwrap();
        let strobe = bus.add_group(1, 0).unwrap();
        let data = bus.add_group(32, 0).unwrap();
        Self {
            bus,
            pins: ResponderPins {
                sck,
                mosi,
                miso,
                ss,
                strobe,
                data,
            },
        }
    }

    /// Script an announcement from `start_ns`; returns its end.
    pub fn announce(&mut self, start_ns: u64, fields: &[u32]) -> u64 {
        script_sideband(&mut self.bus, self.pins.strobe, self.pins.data, start_ns, fields)
    }

    /// Bits the responder had on MISO at each of `times`.
    pub fn miso_bits(&self, times: &[SimTime]) -> Vec<u32> {
        times
            .iter()
            .map(|&t| self.bus.driven_level_at(self.pins.miso, t).unwrap_or(0))
            .collect()
    }
}

/// A DUT clocking the bus as master.
#[derive(Debug, Clone)]
pub struct MasterTrace {
    pub mode: SpiMode,
    pub half_ns: u64,
    pub mosi: Vec<u8>,
    pub edges: u32,
    pub select: Option<u32>,
}

/// When the scripted transfer selected, sampled and deselected.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub selected_ns: u64,
    pub sample_times: Vec<SimTime>,
    pub deselected_ns: u64,
}

impl MasterTrace {
    /// Full transfer of `mosi` in `mode` with half-period `half_ns`.
    pub fn new(mode: SpiMode, half_ns: u64, mosi: &[u8]) -> Self {
        Self {
            mode,
            half_ns,
            mosi: mosi.to_vec(),
            edges: u32::try_from(mosi.len() * 16).unwrap(),
            select: None,
        }
    }

    /// Clock exactly `edges` edges instead of sixteen per byte.
    pub fn edges(mut self, edges: u32) -> Self {
        self.edges = edges;
        self
    }

    /// Value put on the select group at selection (default: bit 0 low).
    pub fn select(mut self, value: u32) -> Self {
        self.select = Some(value);
        self
    }

    /// Schedule the transfer after an announcement that ended at `start_ns`.
    pub fn script(&self, bench: &mut ResponderBench, start_ns: u64) -> Timeline {
        let pins = bench.pins;
        let bus = &mut bench.bus;
        let idle = self.mode.idle_level();
        bus.schedule(at(start_ns), pins.sck, u32::from(idle)).unwrap();

        let selected_ns = start_ns + SELECT_LEAD_NS;
        let select = self.select.unwrap_or(pins.ss.all_high() & !1);
        bus.schedule(at(selected_ns), pins.ss, select).unwrap();
        if !self.mode.cpha() {
            bus.schedule(at(selected_ns), pins.mosi, bit_of(&self.mosi, 0)).unwrap();
        }

        let mut level = idle;
        let mut sample_times = Vec::new();
        for k in 0..u64::from(self.edges) {
            let t = selected_ns + (k + 1) * self.half_ns;
            level = !level;
            bus.schedule(at(t), pins.sck, u32::from(level)).unwrap();
            if level == self.mode.data_level() {
                let index = if self.mode.cpha() { k / 2 } else { (k + 1) / 2 };
                bus.schedule(at(t), pins.mosi, bit_of(&self.mosi, index as usize)).unwrap();
            } else {
                sample_times.push(at(t));
            }
        }

        let deselected_ns = selected_ns + (u64::from(self.edges) + 1) * self.half_ns;
        bus.schedule(at(deselected_ns), pins.ss, pins.ss.all_high()).unwrap();
        Timeline {
            selected_ns,
            sample_times,
            deselected_ns,
        }
    }
}

// ── Driver bench ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handshake {
    Idle,
    AwaitVerdict,
}

/// Reactive DUT slave: answers on MISO, releases it after deselect and
/// plays the DUT side of the verdict handshake.
#[derive(Debug)]
pub struct SlavePeer {
    pins: DriverPins,
    mode: SpiMode,
    tx: Vec<u8>,
    release_after: SimDuration,
    strobe_after_deselect: bool,
    selected: bool,
    next_bit: usize,
    handshake: Handshake,
    /// MOSI bits latched on sample edges.
    pub mosi_bits: Vec<u32>,
    /// Verdict the checker reported (0 pass, 1 fail).
    pub verdict: Option<u32>,
}

impl SlavePeer {
    pub fn new(pins: DriverPins, mode: SpiMode, tx: &[u8]) -> Self {
        Self {
            pins,
            mode,
            tx: tx.to_vec(),
            release_after: SimDuration::from_nanos(100),
            strobe_after_deselect: false,
            selected: false,
            next_bit: 0,
            handshake: Handshake::Idle,
            mosi_bits: Vec::new(),
            verdict: None,
        }
    }

    /// Keep MISO driven for `nanos` after deselect.
    pub fn release_after(mut self, nanos: u64) -> Self {
        self.release_after = SimDuration::from_nanos(nanos);
        self
    }

    /// Raise the sideband strobe right after deselect.
    pub fn strobe_after_deselect(mut self) -> Self {
        self.strobe_after_deselect = true;
        self
    }

    fn present(&mut self, port: &mut PeerPort<'_>) {
        let bit = bit_of(&self.tx, self.next_bit);
        self.next_bit += 1;
        port.set(self.pins.miso, bit).unwrap();
    }
}

impl Peer for SlavePeer {
    fn on_drive(&mut self, port: &mut PeerPort<'_>, group: PinGroup, previous: u32, value: u32) {
        let pins = self.pins;
        if group == pins.ss {
            let was_selected = previous & 1 == 0;
            let is_selected = value & 1 == 0;
            if is_selected && !was_selected {
                self.selected = true;
                self.next_bit = 0;
                if !self.mode.cpha() {
                    self.present(port);
                }
            } else if was_selected && !is_selected && self.selected {
                self.selected = false;
                port.schedule(self.release_after, pins.miso, PeerAction::Release).unwrap();
                if self.strobe_after_deselect {
                    port.schedule(SimDuration::from_nanos(10), pins.strobe, PeerAction::Set(1))
                        .unwrap();
                }
            }
        } else if group == pins.sck && self.selected && previous != value {
            if Level::from(value & 1 == 1) == self.mode.data_level() {
                self.present(port);
            } else {
                self.mosi_bits.push(port.level(pins.mosi) & 1);
            }
        } else if group == pins.resp {
            match self.handshake {
                Handshake::Idle if value == 1 => {
                    let strobe = port.level(pins.strobe);
                    port.schedule(SimDuration::from_nanos(50), pins.strobe, PeerAction::Set(strobe ^ 1))
                        .unwrap();
                    port.schedule(SimDuration::from_nanos(100), pins.strobe, PeerAction::Set(strobe))
                        .unwrap();
                    self.handshake = Handshake::AwaitVerdict;
                }
                Handshake::AwaitVerdict => {
                    self.verdict = Some(value);
                    self.handshake = Handshake::Idle;
                }
                Handshake::Idle => {}
            }
        }
    }
}

/// Bus wired for a driver, with a DUT slave on the far side.
pub struct DriverBench {
    pub bus: ScriptedBus<SlavePeer>,
    pub pins: DriverPins,
}

impl DriverBench {
    /// Bench whose slave answers with `tx` in `mode`; `configure` adjusts
    /// the slave before it is attached.
    pub fn new(mode: SpiMode, tx: &[u8], configure: impl FnOnce(SlavePeer) -> SlavePeer) -> Self {
        let mut bus = ScriptedBus::new();
        let sck = bus.add_group(1, 0).unwrap();
        let mosi = bus.add_group(1, 0).unwrap();
        let miso = bus.add_group(1, 0).unwrap();
        let ss = bus.add_group(1, 1).unwrap();
        let strobe = bus.add_group(1, 0).unwrap();
        let data = bus.add_group(32, 0).unwrap();
        let resp = bus.add_group(1, 0).unwrap();
        let pins = DriverPins {
            sck,
            mosi,
            miso,
            ss,
            strobe,
            data,
            resp,
        };
        let peer = configure(SlavePeer::new(pins, mode, tx));
        Self {
            bus: bus.with_peer(peer),
            pins,
        }
    }

    /// Script an announcement from `start_ns`; returns its end.
    pub fn announce(&mut self, start_ns: u64, fields: &[u32]) -> u64 {
        script_sideband(&mut self.bus, self.pins.strobe, self.pins.data, start_ns, fields)
    }
}
