//! One pass of fetch → evaluate → filter → dispatch → persist → evict.

use std::sync::atomic::Ordering;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use matchbell_core::{due_milestones, DeliveryFailurePolicy, Event, Milestone};
use matchbell_feed::FeedError;
use matchbell_notify::{Delivered, DeliveryError, NotificationRecord};
use matchbell_store::{DedupKey, DedupStore};

use super::Inner;
use crate::error::SchedulerError;
use crate::history::HistoryEntry;
use crate::metrics::TickReport;
use crate::state::SchedulerState;

impl Inner {
    pub(crate) async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport, SchedulerError> {
        let _serial = self.tick_lock.lock().await;

        if self.stopped.load(Ordering::SeqCst) {
            return Err(SchedulerError::Stopped);
        }
        let settings = *self.settings.read().await;
        if !settings.enabled {
            self.set_state(SchedulerState::Disabled).await;
            return Err(SchedulerError::Disabled);
        }

        let started = Instant::now();
        self.counters.write().await.ticks += 1;

        self.set_state(SchedulerState::Polling).await;
        let events = match self.fetch().await {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    error = %e,
                    feed = self.feed.source_name(),
                    at = %now,
                    "Feed fetch failed, skipping tick"
                );
                {
                    let mut counters = self.counters.write().await;
                    counters.fetch_failures += 1;
                    counters.record_error(now, &e);
                }
                self.settle_state().await;
                return Err(e.into());
            }
        };

        let mut report = TickReport {
            at: Some(now),
            events: events.len(),
            ..TickReport::default()
        };

        self.set_state(SchedulerState::Evaluating).await;
        let mut pending: Vec<(&Event, Milestone, DedupKey)> = Vec::new();
        {
            let dedup = self.dedup.lock().await;
            for event in &events {
                for milestone in due_milestones(event, now, &settings) {
                    report.due += 1;
                    let key = DedupKey::new(event, milestone);
                    if dedup.contains(&key) {
                        report.duplicates += 1;
                        debug!(event_id = %event.id, milestone = %milestone, "Alert already sent");
                    } else {
                        pending.push((event, milestone, key));
                    }
                }
            }
        }

        if !pending.is_empty() {
            self.set_state(SchedulerState::Dispatching).await;
        }
        for (event, milestone, key) in pending {
            self.dispatch_one(event, milestone, key, now, &mut report).await;
        }

        self.set_state(SchedulerState::Persisting).await;
        {
            let mut dedup = self.dedup.lock().await;
            if dedup.is_dirty() {
                report.persist_attempted = true;
                report.persisted = self.persist(&mut dedup, now).await;
            }
            report.evicted = dedup.evict_older_than(now, self.config.dedup_retention());
            // Write evictions now so a restart sees the same set as memory.
            if report.evicted > 0 {
                report.persist_attempted = true;
                report.persisted = self.persist(&mut dedup, now).await;
            }
        }

        *self.snapshot.write().await = events;
        *self.last_check.write().await = Some(now);
        report.duration_ms = started.elapsed().as_millis() as u64;
        self.counters.write().await.record_tick(&report);
        self.settle_state().await;

        if report.delivered > 0 || report.failed > 0 {
            info!(
                events = report.events,
                delivered = report.delivered,
                failed = report.failed,
                duplicates = report.duplicates,
                evicted = report.evicted,
                duration_ms = report.duration_ms,
                "Tick complete"
            );
        } else {
            debug!(
                events = report.events,
                duplicates = report.duplicates,
                evicted = report.evicted,
                duration_ms = report.duration_ms,
                "Tick complete, nothing due"
            );
        }

        Ok(report)
    }

    async fn persist(&self, dedup: &mut DedupStore, now: DateTime<Utc>) -> bool {
        match dedup.flush() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, keys = dedup.len(), at = %now, "Failed to persist dedup keys");
                self.counters.write().await.record_error(now, &e);
                false
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<Event>, FeedError> {
        match tokio::time::timeout(self.fetch_timeout, self.feed.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(FeedError::Timeout(self.fetch_timeout)),
        }
    }

    /// Claim the key, then build and deliver the alert.
    async fn dispatch_one(
        &self,
        event: &Event,
        milestone: Milestone,
        key: DedupKey,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        self.dedup.lock().await.insert(key.clone());

        let result = match self.builder.build(event, milestone, now) {
            Ok(record) => self.deliver_record(&record, now).await.map_err(SchedulerError::from),
            Err(e) => Err(SchedulerError::from(e)),
        };

        match result {
            Ok(delivered) => {
                report.delivered += 1;
                info!(
                    event_id = %event.id,
                    milestone = %milestone,
                    fixture = %event.fixture(),
                    channels = ?delivered.channels,
                    "Alert sent"
                );
            }
            Err(e) => {
                report.failed += 1;
                warn!(
                    event_id = %event.id,
                    milestone = %milestone,
                    at = %now,
                    error = %e,
                    policy = %self.config.delivery_failure_policy,
                    "Alert delivery failed"
                );
                self.counters.write().await.record_error(now, &e);

                if self.config.delivery_failure_policy == DeliveryFailurePolicy::Retract {
                    self.dedup.lock().await.remove(&key);
                    report.retracted += 1;
                }
            }
        }
    }

    /// Send a rendered record and log the attempt to history.
    pub(crate) async fn deliver_record(
        &self,
        record: &NotificationRecord,
        now: DateTime<Utc>,
    ) -> Result<Delivered, DeliveryError> {
        let result = self.dispatcher.deliver(record).await;
        let channels = match &result {
            Ok(delivered) => delivered.channels.clone(),
            Err(_) => Vec::new(),
        };
        self.history
            .write()
            .await
            .push(HistoryEntry::from_record(record, now, channels));
        result
    }
}
