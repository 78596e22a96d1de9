//! Simulated pin abstraction layer
//!
//! Provides the handle types and the cooperative wait/drive interface that
//! every bus checker is written against.

use core::future::Future;

use crate::time::SimTime;

/// Addressable handle to one or more physical signal lines.
///
/// Handles are issued by the pin backend and are cheap to copy. Checkers
/// only ever hold them; the lines themselves are owned by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinGroup {
    id: u8,
    width: u8,
}

impl PinGroup {
    /// Widest group the interface can express in a single `u32` sample.
    pub const MAX_WIDTH: u8 = 32;

    /// Create a handle for backend group `id` spanning `width` lines.
    ///
    /// `width` is clamped to `1..=32`.
    #[must_use]
    pub const fn new(id: u8, width: u8) -> Self {
        let width = if width == 0 {
            1
        } else if width > Self::MAX_WIDTH {
            Self::MAX_WIDTH
        } else {
            width
        };
        Self { id, width }
    }

    /// Backend identifier.
    #[must_use]
    pub const fn id(self) -> u8 {
        self.id
    }

    /// Number of lines in the group.
    #[must_use]
    pub const fn width(self) -> u8 {
        self.width
    }

    /// Value with every line of the group high.
    ///
    /// For an active-low select bus this is the "nothing selected" value.
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // width is clamped to 1..=32
    pub const fn all_high(self) -> u32 {
        u32::MAX >> (32 - self.width as u32)
    }

    /// Whether `value` can be driven onto this group.
    #[must_use]
    pub const fn fits(self, value: u32) -> bool {
        value & !self.all_high() == 0
    }
}

/// Logic level of a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Level {
    /// Logic 0
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// Level of bit `bit` within a sampled group value.
    #[must_use]
    pub const fn of_bit(value: u32, bit: u32) -> Self {
        if bit < 32 && (value >> bit) & 1 == 1 {
            Self::High
        } else {
            Self::Low
        }
    }

    /// Opposite level.
    #[must_use]
    pub const fn inverted(self) -> Self {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<Level> for bool {
    fn from(value: Level) -> Self {
        matches!(value, Level::High)
    }
}

impl From<Level> for u32 {
    fn from(value: Level) -> Self {
        u32::from(bool::from(value))
    }
}

impl core::ops::Not for Level {
    type Output = Self;

    fn not(self) -> Self {
        self.inverted()
    }
}

/// Cooperative interface to a simulated set of pins.
///
/// Checkers suspend only inside [`wait_for_change`](Self::wait_for_change)
/// and [`wait_until`](Self::wait_until). Everything else completes in zero
/// simulated time, so all sampling and driving between two waits happens at
/// the same instant. Implementations must never miss a transition: a change
/// that happens while the caller is not waiting is still reported by the
/// next `wait_for_change` if the level differs from the one sampled before.
pub trait SimPins {
    /// Backend error type
    type Error: std::error::Error + 'static;

    /// Current value of every line in `group`, bit 0 = first line.
    fn sample(&mut self, group: PinGroup) -> Result<u32, Self::Error>;

    /// Drive `value` onto `group` from this checker's side of the bus.
    fn drive(&mut self, group: PinGroup, value: u32) -> Result<(), Self::Error>;

    /// Whether the *peer* is actively driving `group` (false = floating).
    fn is_driving(&mut self, group: PinGroup) -> Result<bool, Self::Error>;

    /// Current simulated time.
    fn now(&self) -> SimTime;

    /// Suspend until any line in any of `groups` changes level.
    ///
    /// Spurious wake-ups are allowed; callers re-sample and compare.
    fn wait_for_change(
        &mut self,
        groups: &[PinGroup],
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Suspend until simulated time reaches `time`.
    fn wait_until(&mut self, time: SimTime) -> impl Future<Output = Result<(), Self::Error>>;

    /// Sample a single-line group as a [`Level`].
    fn sample_level(&mut self, group: PinGroup) -> Result<Level, Self::Error> {
        self.sample(group).map(|v| Level::of_bit(v, 0))
    }

    /// Drive a [`Level`] onto a single-line group.
    fn drive_level(&mut self, group: PinGroup, level: Level) -> Result<(), Self::Error> {
        self.drive(group, u32::from(level))
    }
}
