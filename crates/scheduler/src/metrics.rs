use chrono::{DateTime, Utc};
use serde::Serialize;

/// Running totals since the scheduler was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerCounters {
    /// Ticks that got past the enabled check.
    pub ticks: u64,
    pub fetch_failures: u64,
    /// Alerts accepted by at least one channel.
    pub alerts_delivered: u64,
    pub delivery_failures: u64,
    /// Due alerts skipped because their key was already present.
    pub duplicates_skipped: u64,
    pub store_failures: u64,
    pub keys_evicted: u64,
    pub last_tick_duration_ms: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl SchedulerCounters {
    pub(crate) fn record_error(&mut self, at: DateTime<Utc>, error: &impl std::fmt::Display) {
        self.last_error = Some(error.to_string());
        self.last_error_at = Some(at);
    }

    pub(crate) fn record_tick(&mut self, report: &TickReport) {
        self.alerts_delivered += report.delivered as u64;
        self.delivery_failures += report.failed as u64;
        self.duplicates_skipped += report.duplicates as u64;
        self.keys_evicted += report.evicted as u64;
        self.last_tick_duration_ms = report.duration_ms;
        if !report.persisted && report.persist_attempted {
            self.store_failures += 1;
        }
    }
}

/// What one completed tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub at: Option<DateTime<Utc>>,
    /// Events in the fetched snapshot.
    pub events: usize,
    /// Due (event, milestone) pairs before dedup filtering.
    pub due: usize,
    pub duplicates: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Keys dropped again under the retract policy.
    pub retracted: usize,
    pub persist_attempted: bool,
    pub persisted: bool,
    pub evicted: usize,
    pub duration_ms: u64,
}
