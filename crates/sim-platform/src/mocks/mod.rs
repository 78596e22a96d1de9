//! Scripted simulation backend for testing
//!
//! [`ScriptedBus`] is a deterministic, single-threaded stand-in for the
//! external simulator. The far side of the bus is described in two ways:
//!
//! - a *script*: pin changes scheduled at absolute simulated times (a DUT
//!   acting as bus master, or the DUT writing sideband fields), and
//! - an optional [`Peer`]: a reactive model that is told about every value
//!   the checker drives and may answer immediately or schedule later
//!   changes (a DUT acting as bus slave, or the DUT side of a handshake).
//!
//! Time only advances inside `wait_for_change` / `wait_until`, and every
//! future returned by the bus completes on its first poll. When a
//! `wait_for_change` finds nothing left in the script the bus reports
//! [`PinError::SimulationEnded`], which is how a checker's endless
//! transaction loop is brought to a stop in tests.

#![cfg(any(test, feature = "mocks"))]

use std::collections::BTreeMap;

use crate::{PinError, PinGroup, SimDuration, SimPins, SimTime};

/// Groups one bus can hold; a [`PinGroup`] id is a `u8`.
pub const MAX_GROUPS: usize = 256;

/// What the far side of the bus does to a pin group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAction {
    /// Drive a value (the peer starts actively driving the group).
    Set(u32),
    /// Stop driving; the group floats at its last level.
    Release,
}

/// One value driven by the checker under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveRecord {
    /// When the value was driven.
    pub at: SimTime,
    /// Target group.
    pub group: PinGroup,
    /// Driven value.
    pub value: u32,
}

struct Line {
    group: PinGroup,
    level: u32,
    peer_driving: bool,
}

struct BusCore {
    now: SimTime,
    lines: Vec<Line>,
    script: BTreeMap<SimTime, Vec<(PinGroup, PeerAction)>>,
    drives: Vec<DriveRecord>,
}

impl BusCore {
    fn line(&self, group: PinGroup) -> Result<&Line, PinError> {
        self.lines
            .get(usize::from(group.id()))
            .filter(|line| line.group == group)
            .ok_or(PinError::UnknownGroup(group))
    }

    fn line_mut(&mut self, group: PinGroup) -> Result<&mut Line, PinError> {
        self.lines
            .get_mut(usize::from(group.id()))
            .filter(|line| line.group == group)
            .ok_or(PinError::UnknownGroup(group))
    }

    fn check_value(group: PinGroup, value: u32) -> Result<(), PinError> {
        if group.fits(value) {
            Ok(())
        } else {
            Err(PinError::ValueTooWide {
                id: group.id(),
                width: group.width(),
                value,
            })
        }
    }

    fn apply(&mut self, group: PinGroup, action: PeerAction) -> Result<(), PinError> {
        let line = self.line_mut(group)?;
        match action {
            PeerAction::Set(value) => {
                line.level = value;
                line.peer_driving = true;
            }
            PeerAction::Release => line.peer_driving = false,
        }
        Ok(())
    }

    fn schedule(&mut self, at: SimTime, group: PinGroup, action: PeerAction) -> Result<(), PinError> {
        self.line(group)?;
        if let PeerAction::Set(value) = action {
            Self::check_value(group, value)?;
        }
        self.script.entry(at).or_default().push((group, action));
        Ok(())
    }

    /// Apply every scripted action due at or before `until`, in time order.
    fn apply_due(&mut self, until: SimTime) -> Result<(), PinError> {
        while let Some(entry) = self.script.first_entry() {
            if *entry.key() > until {
                break;
            }
            let (at, actions) = entry.remove_entry();
            self.now = self.now.max(at);
            for (group, action) in actions {
                self.apply(group, action)?;
            }
        }
        Ok(())
    }

    fn levels(&self, groups: &[PinGroup]) -> Result<Vec<u32>, PinError> {
        groups
            .iter()
            .map(|&group| self.line(group).map(|line| line.level))
            .collect()
    }
}

/// Reactive model of the device on the far side of the bus.
pub trait Peer {
    /// Called after the checker drives `value` onto `group`.
    ///
    /// `previous` is the group's level before the drive, so edges can be
    /// told apart from repeated drives of the same level.
    fn on_drive(&mut self, port: &mut PeerPort<'_>, group: PinGroup, previous: u32, value: u32);
}

/// Peer that never reacts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPeer;

impl Peer for NoPeer {
    fn on_drive(&mut self, _port: &mut PeerPort<'_>, _group: PinGroup, _previous: u32, _value: u32) {}
}

/// The bus as seen from inside [`Peer::on_drive`].
pub struct PeerPort<'a> {
    core: &'a mut BusCore,
}

impl PeerPort<'_> {
    /// Current simulated time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.core.now
    }

    /// Current level of `group` (unknown groups read as 0).
    #[must_use]
    pub fn level(&self, group: PinGroup) -> u32 {
        self.core.line(group).map_or(0, |line| line.level)
    }

    /// Drive `value` onto `group` immediately.
    pub fn set(&mut self, group: PinGroup, value: u32) -> Result<(), PinError> {
        BusCore::check_value(group, value)?;
        self.core.apply(group, PeerAction::Set(value))
    }

    /// Stop driving `group` immediately.
    pub fn release(&mut self, group: PinGroup) -> Result<(), PinError> {
        self.core.apply(group, PeerAction::Release)
    }

    /// Schedule an action `delay` from now.
    pub fn schedule(&mut self, delay: SimDuration, group: PinGroup, action: PeerAction) -> Result<(), PinError> {
        let at = self.core.now.saturating_add(delay);
        self.core.schedule(at, group, action)
    }
}

/// Deterministic scripted pin backend.
pub struct ScriptedBus<P = NoPeer> {
    core: BusCore,
    peer: P,
}

impl ScriptedBus<NoPeer> {
    /// Empty bus at simulated time zero with no reactive peer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: BusCore {
                now: SimTime::ZERO,
                lines: Vec::new(),
                script: BTreeMap::new(),
                drives: Vec::new(),
            },
            peer: NoPeer,
        }
    }
}

impl Default for ScriptedBus<NoPeer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Peer> ScriptedBus<P> {
    /// Replace the reactive peer, keeping groups and script.
    pub fn with_peer<Q: Peer>(self, peer: Q) -> ScriptedBus<Q> {
        ScriptedBus {
            core: self.core,
            peer,
        }
    }

    /// The reactive peer, for inspecting what it observed.
    pub fn peer(&self) -> &P {
        &self.peer
    }

    /// Add a group of `width` lines starting at `initial` (not peer-driven).
    ///
    /// A bus holds at most [`MAX_GROUPS`] groups.
    pub fn add_group(&mut self, width: u8, initial: u32) -> Result<PinGroup, PinError> {
        let id = u8::try_from(self.core.lines.len())
            .map_err(|_| PinError::TooManyGroups { limit: MAX_GROUPS })?;
        let group = PinGroup::new(id, width);
        BusCore::check_value(group, initial)?;
        self.core.lines.push(Line {
            group,
            level: initial,
            peer_driving: false,
        });
        Ok(group)
    }

    /// Schedule the peer driving `value` onto `group` at `at`.
    pub fn schedule(&mut self, at: SimTime, group: PinGroup, value: u32) -> Result<(), PinError> {
        self.core.schedule(at, group, PeerAction::Set(value))
    }

    /// Schedule the peer releasing `group` at `at`.
    pub fn schedule_release(&mut self, at: SimTime, group: PinGroup) -> Result<(), PinError> {
        self.core.schedule(at, group, PeerAction::Release)
    }

    /// Mark `group` as peer-driven (or floating) right now.
    pub fn set_peer_driving(&mut self, group: PinGroup, driving: bool) -> Result<(), PinError> {
        self.core.line_mut(group)?.peer_driving = driving;
        Ok(())
    }

    /// Every value the checker has driven so far, in order.
    #[must_use]
    pub fn drives(&self) -> &[DriveRecord] {
        &self.core.drives
    }

    /// Level of `group` as left by the checker's drives at instant `at`.
    ///
    /// Returns `None` if the checker had not driven the group by then.
    #[must_use]
    pub fn driven_level_at(&self, group: PinGroup, at: SimTime) -> Option<u32> {
        self.core
            .drives
            .iter()
            .filter(|record| record.group == group && record.at <= at)
            .last()
            .map(|record| record.value)
    }

    /// Number of scripted instants not yet reached.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.core.script.len()
    }
}

impl<P: Peer> SimPins for ScriptedBus<P> {
    type Error = PinError;

    fn sample(&mut self, group: PinGroup) -> Result<u32, Self::Error> {
        self.core.line(group).map(|line| line.level)
    }

    fn drive(&mut self, group: PinGroup, value: u32) -> Result<(), Self::Error> {
        BusCore::check_value(group, value)?;
        let now = self.core.now;
        let line = self.core.line_mut(group)?;
        let previous = line.level;
        line.level = value;
        self.core.drives.push(DriveRecord {
            at: now,
            group,
            value,
        });
        tracing::trace!(group = group.id(), value, at = %now, "checker drive");
        let mut port = PeerPort {
            core: &mut self.core,
        };
        self.peer.on_drive(&mut port, group, previous, value);
        Ok(())
    }

    fn is_driving(&mut self, group: PinGroup) -> Result<bool, Self::Error> {
        self.core.line(group).map(|line| line.peer_driving)
    }

    fn now(&self) -> SimTime {
        self.core.now
    }

    async fn wait_for_change(&mut self, groups: &[PinGroup]) -> Result<(), Self::Error> {
        loop {
            let Some(next) = self.core.script.keys().next().copied() else {
                return Err(PinError::SimulationEnded { at: self.core.now });
            };
            let before = self.core.levels(groups)?;
            self.core.apply_due(next)?;
            if self.core.levels(groups)? != before {
                return Ok(());
            }
        }
    }

    async fn wait_until(&mut self, time: SimTime) -> Result<(), Self::Error> {
        if time < self.core.now {
            return Err(PinError::TimeInPast {
                requested: time,
                now: self.core.now,
            });
        }
        self.core.apply_due(time)?;
        self.core.now = time;
        Ok(())
    }
}
