//! Simulated pin interface for bus conformance checkers
//!
//! This crate is the boundary between a protocol checker and the external
//! hardware simulator that owns the pins. Checkers are written against the
//! [`SimPins`] trait only, so the same checker code runs inside a real
//! simulator binding or against the deterministic [`mocks::ScriptedBus`].
//!
//! # Architecture Layers
//!
//! ```text
//! Protocol checkers (spi-checker crate)
//!         ↓
//! Simulated pin interface (this crate - SimPins trait)
//!         ↓
//! Simulator binding (external) | ScriptedBus (mocks feature)
//! ```
//!
//! # Features
//!
//! - `mocks`: Scripted, deterministic backend for tests and demos
//! - `serde`: Serialize/deserialize time, level and pin-group types
//!
//! # Example
//!
//! ```no_run
//! use sim_platform::{PinGroup, SimPins};
//!
//! async fn wait_for_select<P: SimPins>(pins: &mut P, ss: PinGroup) -> Result<(), P::Error> {
//!     while pins.sample(ss)? == ss.all_high() {
//!         pins.wait_for_change(&[ss]).await?;
//!     }
//!     Ok(())
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing over println! in lib code
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod mocks;
pub mod pins;
pub mod time;

pub use error::PinError;
pub use pins::{Level, PinGroup, SimPins};
pub use time::{SimDuration, SimTime};
