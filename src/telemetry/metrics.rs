//! Metric instrument factories for reliserve.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"reliserve"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for reliserve instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("reliserve")
}

/// Counter: number of jobs posted.
/// Labels: `urgency` ("NORMAL" | "EMERGENCY").
pub fn jobs_created() -> Counter<u64> {
    meter()
        .u64_counter("reliserve.jobs.created")
        .with_description("Number of jobs posted")
        .build()
}

/// Counter: job lifecycle transitions.
/// Labels: `from`, `to`.
pub fn job_transitions() -> Counter<u64> {
    meter()
        .u64_counter("reliserve.jobs.transitions")
        .with_description("Number of job lifecycle transitions")
        .build()
}

/// Counter: claim attempts that lost the race (or hit a non-OPEN job).
pub fn claim_conflicts() -> Counter<u64> {
    meter()
        .u64_counter("reliserve.jobs.claim_conflicts")
        .with_description("Accept attempts rejected by the status guard")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("reliserve.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
