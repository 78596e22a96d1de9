//! SPI bus conformance checkers
//!
//! Two checkers that sit on a simulated SPI bus opposite a device under test
//! (DUT) and decide, per transaction, whether the DUT followed the protocol:
//!
//! - [`BusResponder`] plays the slave while the DUT masters the bus.
//! - [`BusDriver`] plays the master while the DUT acts as a slave.
//!
//! Before every transaction the DUT announces its settings (mode, clock
//! rate, enabled lines, length) over a strobe-and-data sideband channel,
//! decoded by [`SidebandReader`]. Bytes are exchanged against fixed
//! patterns in [`vectors`]; deviations are collected as [`Violation`]s in a
//! [`TransactionReport`]. Only a pin interface failure ends a checker's run.
//!
//! # Architecture
//!
//! ```text
//! BusResponder / BusDriver        (roles, async state machines)
//!         ↓
//! verify + TransferState          (pure checks, per-transaction counters)
//!         ↓
//! SidebandReader                  (settings announcement)
//!         ↓
//! sim_platform::SimPins           (simulated pins and time)
//! ```
//!
//! # Features
//!
//! - `serde`: Serialize reports, violations and configurations
//!
//! # Example
//!
//! ```no_run
//! use sim_platform::SimPins;
//! use spi_checker::{BusResponder, CheckerError, ResponderPins};
//!
//! async fn check_one<P: SimPins>(
//!     bus: &mut P,
//!     pins: ResponderPins,
//! ) -> Result<bool, CheckerError<P::Error>> {
//!     let mut responder = BusResponder::new(pins);
//!     let report = responder.run_transaction(bus).await?;
//!     Ok(report.passed())
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

pub mod config;
pub mod driver;
pub mod error;
pub mod report;
pub mod responder;
pub mod sideband;
pub mod state;
pub mod vectors;
pub mod verify;
pub mod violation;

pub use config::{DriverConfig, SpiMode, Tolerances, TransactionConfig};
pub use driver::{BusDriver, DriverPins, DriverState};
pub use error::{CheckerError, Field};
pub use report::{Diagnostic, TransactionReport};
pub use responder::{BusResponder, ResponderPins, ResponderState};
pub use sideband::SidebandReader;
pub use violation::{Violation, ViolationKind, ViolationSet};
