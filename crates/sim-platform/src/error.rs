//! Pin interface errors.

use crate::pins::PinGroup;
use crate::time::SimTime;

/// Failure reported by a [`SimPins`](crate::SimPins) backend.
///
/// Every variant is fatal for the checker that receives it: the simulated
/// bus is either misconfigured or has stopped producing events.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PinError {
    /// The handle does not name a pin group known to the backend.
    #[error("unknown pin group #{}", .0.id())]
    UnknownGroup(PinGroup),

    /// The backend already holds as many groups as a [`PinGroup`] id can name.
    #[error("cannot add pin group: all {limit} group ids are in use")]
    TooManyGroups {
        /// Number of groups the backend can hold.
        limit: usize,
    },

    /// A value was driven that does not fit the group's bit width.
    #[error("value {value:#x} does not fit {width}-bit pin group #{id}")]
    ValueTooWide {
        /// Group identifier.
        id: u8,
        /// Group width in bits.
        width: u8,
        /// Offending value.
        value: u32,
    },

    /// The simulation has no further events; a wait can never complete.
    #[error("simulation ended at {at} while waiting for a pin change")]
    SimulationEnded {
        /// Simulated time at which the wait was abandoned.
        at: SimTime,
    },

    /// `wait_until` was asked to move the clock backwards.
    #[error("cannot wait until {requested}: simulated time is already {now}")]
    TimeInPast {
        /// Requested wake-up instant.
        requested: SimTime,
        /// Current simulated time.
        now: SimTime,
    },
}
