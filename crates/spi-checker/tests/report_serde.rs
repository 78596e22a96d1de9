//! Report export for the external comparison harness.

#![cfg(feature = "serde")]
#![allow(missing_docs, clippy::unwrap_used)]

use sim_platform::{Level, SimDuration, SimTime};
use spi_checker::{TransactionReport, Violation, ViolationKind};

/// A failed report survives a JSON round trip with its diagnostics intact.
#[test]
fn report_round_trips_through_json() {
    let mut report = TransactionReport::new();
    report.slave = Some(1);
    report.clock_edges = 31;
    report.record(
        SimTime::from_nanos(1200),
        Violation::ClockPolarity {
            sampled: Level::High,
            expected: Level::Low,
        },
    );
    report.record(
        SimTime::from_nanos(4700),
        Violation::ClockTooFast {
            measured: SimDuration::from_nanos(400),
            minimum: SimDuration::from_nanos(475),
        },
    );

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("ClockTooFast"), "{json}");

    let back: TransactionReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
    assert_eq!(back.count(ViolationKind::ClockPolarity), 1);
    assert!(!back.passed());
}
