//! Metrics for record access and provisioning
//!
//! Uses the `metrics` facade; nothing is exported unless the embedding
//! application installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all SupplyBook metrics
pub const METRICS_PREFIX: &str = "supplybook";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_records_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of records inserted, by entity"
    );

    describe_counter!(
        format!("{}_writes_rejected_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of rejected writes, by entity and reason"
    );

    describe_histogram!(
        format!("{}_db_operation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Duration of database operations in seconds"
    );

    describe_counter!(
        format!("{}_provisioning_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of schema provisioning runs"
    );
}

/// Record a successful insert
pub fn record_created(entity: &'static str) {
    counter!(format!("{}_records_created_total", METRICS_PREFIX), "entity" => entity).increment(1);
}

/// Record a rejected write
pub fn record_rejected(entity: &'static str, reason: &'static str) {
    counter!(
        format!("{}_writes_rejected_total", METRICS_PREFIX),
        "entity" => entity,
        "reason" => reason
    )
    .increment(1);
}

/// Record a provisioning run
pub fn record_provisioning() {
    counter!(format!("{}_provisioning_runs_total", METRICS_PREFIX)).increment(1);
}

/// Timer that records a database operation's duration when dropped
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        histogram!(
            format!("{}_db_operation_duration_seconds", METRICS_PREFIX),
            "operation" => self.operation
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}
