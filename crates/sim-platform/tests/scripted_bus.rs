//! Scripted bus behaviour seen through the `SimPins` trait.

#![allow(missing_docs, clippy::unwrap_used)]

use sim_platform::mocks::{Peer, PeerAction, PeerPort, ScriptedBus};
use sim_platform::{Level, PinError, PinGroup, SimDuration, SimPins, SimTime};

/// Echoes every value driven on `input` onto `output` after 5 ns.
struct Echo {
    input: PinGroup,
    output: PinGroup,
    seen: Vec<(u32, u32)>,
}

impl Peer for Echo {
    fn on_drive(&mut self, port: &mut PeerPort<'_>, group: PinGroup, previous: u32, value: u32) {
        if group == self.input {
            self.seen.push((previous, value));
            port.schedule(SimDuration::from_nanos(5), self.output, PeerAction::Set(value))
                .unwrap();
        }
    }
}

/// Drives reach the peer with the previous level, and the peer's answer
/// arrives on schedule.
#[tokio::test]
async fn peer_answers_after_delay() {
    let mut bus = ScriptedBus::new();
    let input = bus.add_group(1, 0).unwrap();
    let output = bus.add_group(1, 0).unwrap();
    let mut bus = bus.with_peer(Echo {
        input,
        output,
        seen: Vec::new(),
    });

    bus.wait_until(SimTime::from_nanos(100)).await.unwrap();
    bus.drive_level(input, Level::High).unwrap();
    bus.wait_for_change(&[output]).await.unwrap();

    assert_eq!(bus.now(), SimTime::from_nanos(105));
    assert_eq!(bus.sample_level(output).unwrap(), Level::High);
    assert!(bus.is_driving(output).unwrap());
    assert_eq!(bus.peer().seen, vec![(0, 1)]);
}

/// The drive log answers "what was on the line at time t".
#[tokio::test]
async fn drive_history_is_queryable() {
    let mut bus = ScriptedBus::new();
    let line = bus.add_group(1, 0).unwrap();

    bus.wait_until(SimTime::from_nanos(10)).await.unwrap();
    bus.drive(line, 1).unwrap();
    bus.wait_until(SimTime::from_nanos(20)).await.unwrap();
    bus.drive(line, 0).unwrap();

    assert_eq!(bus.driven_level_at(line, SimTime::from_nanos(5)), None);
    assert_eq!(bus.driven_level_at(line, SimTime::from_nanos(15)), Some(1));
    assert_eq!(bus.driven_level_at(line, SimTime::from_nanos(20)), Some(0));
    assert_eq!(bus.drives().len(), 2);
}

/// A scheduled release keeps the level but stops the peer driving.
#[tokio::test]
async fn release_leaves_level_floating() {
    let mut bus = ScriptedBus::new();
    let miso = bus.add_group(1, 0).unwrap();
    bus.schedule(SimTime::from_nanos(10), miso, 1).unwrap();
    bus.schedule_release(SimTime::from_nanos(30), miso).unwrap();

    bus.wait_until(SimTime::from_nanos(20)).await.unwrap();
    assert!(bus.is_driving(miso).unwrap());

    bus.wait_until(SimTime::from_nanos(30)).await.unwrap();
    assert!(!bus.is_driving(miso).unwrap());
    assert_eq!(bus.sample(miso).unwrap(), 1);
    assert_eq!(bus.pending(), 0);
}

/// Multi-bit groups carry whole values.
#[tokio::test]
async fn select_bus_carries_all_lines() {
    let mut bus = ScriptedBus::new();
    let ss = bus.add_group(4, 0b1111).unwrap();
    bus.schedule(SimTime::from_nanos(50), ss, 0b1011).unwrap();

    bus.wait_for_change(&[ss]).await.unwrap();

    assert_eq!(bus.sample(ss).unwrap(), 0b1011);
    assert_eq!(ss.all_high(), 0b1111);
}

/// Waiting with nothing left to happen ends the simulation.
#[tokio::test]
async fn empty_script_ends_simulation() {
    let mut bus = ScriptedBus::new();
    let line = bus.add_group(1, 0).unwrap();
    bus.wait_until(SimTime::from_nanos(7)).await.unwrap();

    let result = bus.wait_for_change(&[line]).await;

    assert_eq!(
        result,
        Err(PinError::SimulationEnded {
            at: SimTime::from_nanos(7)
        })
    );
}

/// Handles from another bus are rejected.
#[tokio::test]
async fn foreign_group_is_rejected() {
    let mut bus = ScriptedBus::new();
    bus.add_group(1, 0).unwrap();
    let foreign = PinGroup::new(0, 8);

    assert_eq!(bus.sample(foreign), Err(PinError::UnknownGroup(foreign)));
}
