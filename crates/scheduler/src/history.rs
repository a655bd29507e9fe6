//! Bounded log of alerts the scheduler tried to deliver.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use matchbell_core::Milestone;
use matchbell_notify::NotificationRecord;

/// One delivery attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub event_id: Option<String>,
    pub fixture: Option<String>,
    pub milestone: Option<Milestone>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    /// Channels that accepted the alert.
    pub channels: Vec<String>,
}

impl HistoryEntry {
    pub fn from_record(record: &NotificationRecord, at: DateTime<Utc>, channels: Vec<String>) -> Self {
        Self {
            title: record.title.clone(),
            body: record.body.clone(),
            tag: record.tag.clone(),
            event_id: record.data.event_id.clone(),
            fixture: record.data.fixture.clone(),
            milestone: record.data.milestone,
            timestamp: at,
            success: !channels.is_empty(),
            channels,
        }
    }
}

/// Ring buffer, newest first, holding at most `limit` entries.
#[derive(Debug, Clone)]
pub struct NotificationHistory {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl NotificationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(256)),
            limit,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.limit == 0 {
            return;
        }
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    /// Entries newest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
