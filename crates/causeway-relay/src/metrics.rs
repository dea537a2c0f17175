//! Observability metrics for the relay.
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `causeway_submissions_total` | Counter | - | Operations accepted for dispatch |
//! | `causeway_completions_total` | Counter | `outcome` | Terminal outcomes recorded |
//! | `causeway_expirations_total` | Counter | - | Records reaped past their time-to-live |
//! | `causeway_dispatch_attempts_total` | Counter | - | Delivery attempts to the worker |
//! | `causeway_dispatch_failures_total` | Counter | - | Failed delivery attempts |
//!
//! Metrics go through the `metrics` crate facade; the server installs a
//! Prometheus recorder. All recording helpers are safe to call with no
//! recorder installed (they become no-ops), which keeps unit tests quiet.

use metrics::{counter, describe_counter};

use crate::op::OperationStatus;

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Operations accepted for dispatch.
    pub const SUBMISSIONS_TOTAL: &str = "causeway_submissions_total";
    /// Counter: Terminal outcomes recorded, labelled by outcome.
    pub const COMPLETIONS_TOTAL: &str = "causeway_completions_total";
    /// Counter: Records reaped past their time-to-live.
    pub const EXPIRATIONS_TOTAL: &str = "causeway_expirations_total";
    /// Counter: Delivery attempts to the worker.
    pub const DISPATCH_ATTEMPTS_TOTAL: &str = "causeway_dispatch_attempts_total";
    /// Counter: Failed delivery attempts.
    pub const DISPATCH_FAILURES_TOTAL: &str = "causeway_dispatch_failures_total";
}

/// Label keys used across metrics.
pub mod labels {
    /// Terminal outcome (completed, error).
    pub const OUTCOME: &str = "outcome";
}

/// Registers metric descriptions with the installed recorder.
pub fn register_metrics() {
    describe_counter!(
        names::SUBMISSIONS_TOTAL,
        "Operations accepted for dispatch"
    );
    describe_counter!(
        names::COMPLETIONS_TOTAL,
        "Terminal outcomes recorded, labelled by outcome"
    );
    describe_counter!(
        names::EXPIRATIONS_TOTAL,
        "Records reaped past their time-to-live"
    );
    describe_counter!(
        names::DISPATCH_ATTEMPTS_TOTAL,
        "Delivery attempts to the worker"
    );
    describe_counter!(
        names::DISPATCH_FAILURES_TOTAL,
        "Failed delivery attempts"
    );
}

/// Records one accepted submission.
pub fn record_submission() {
    counter!(names::SUBMISSIONS_TOTAL).increment(1);
}

/// Records one terminal outcome.
pub fn record_completion(status: OperationStatus) {
    counter!(
        names::COMPLETIONS_TOTAL,
        labels::OUTCOME => status.to_string(),
    )
    .increment(1);
}

/// Records `count` reaped records.
pub fn record_expirations(count: usize) {
    counter!(names::EXPIRATIONS_TOTAL).increment(count as u64);
}

/// Records one delivery attempt.
pub fn record_dispatch_attempt() {
    counter!(names::DISPATCH_ATTEMPTS_TOTAL).increment(1);
}

/// Records one failed delivery attempt.
pub fn record_dispatch_failure() {
    counter!(names::DISPATCH_FAILURES_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_a_recorder_does_not_panic() {
        record_submission();
        record_completion(OperationStatus::Completed);
        record_completion(OperationStatus::Error);
        record_expirations(3);
        record_dispatch_attempt();
        record_dispatch_failure();
        register_metrics();
    }
}
