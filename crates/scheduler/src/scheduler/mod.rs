//! [`Scheduler`]: owns settings, dedup set and timer for match alerts.

mod runner;
mod tick;


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use matchbell_core::config::SchedulerConfig;
use matchbell_core::{
    next_notification, trigger_at, Event, Milestone, NotificationSettings, SettingsPatch, UpcomingNotification,
};
use matchbell_feed::EventFeed;
use matchbell_notify::{Delivered, Dispatcher, NotificationBuilder, NotificationRecord};
use matchbell_store::{DedupStore, KvStore, SettingsStore};

use crate::error::SchedulerError;
use crate::history::{HistoryEntry, NotificationHistory};
use crate::metrics::{SchedulerCounters, TickReport};
use crate::state::SchedulerState;

/// Upper bound on one feed fetch, on top of whatever the feed enforces itself.
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    /// Events in the last successful snapshot.
    pub event_count: usize,
    pub dedup_count: usize,
    pub settings: NotificationSettings,
    pub last_check: Option<DateTime<Utc>>,
    pub state: SchedulerState,
    pub running: bool,
    pub channels: Vec<String>,
    pub counters: SchedulerCounters,
}

/// State shared between the public handle and the timer task.
pub(crate) struct Inner {
    pub(crate) config: SchedulerConfig,
    pub(crate) fetch_timeout: Duration,
    pub(crate) feed: Arc<dyn EventFeed>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) builder: NotificationBuilder,
    pub(crate) settings_store: SettingsStore,
    pub(crate) settings: RwLock<NotificationSettings>,
    pub(crate) dedup: Mutex<DedupStore>,
    /// Held for the whole tick body.
    pub(crate) tick_lock: Mutex<()>,
    pub(crate) state: RwLock<SchedulerState>,
    pub(crate) counters: RwLock<SchedulerCounters>,
    pub(crate) history: RwLock<NotificationHistory>,
    pub(crate) snapshot: RwLock<Vec<Event>>,
    pub(crate) last_check: RwLock<Option<DateTime<Utc>>>,
    pub(crate) shutdown: Notify,
    pub(crate) stopped: AtomicBool,
}

impl Inner {
    /// Move to `next` unless the scheduler has been stopped.
    pub(crate) async fn set_state(&self, next: SchedulerState) {
        let mut state = self.state.write().await;
        if *state != SchedulerState::Stopped {
            *state = next;
        }
    }

    /// Resting state for the current settings.
    pub(crate) async fn settle_state(&self) {
        let enabled = self.settings.read().await.enabled;
        self.set_state(if enabled {
            SchedulerState::Idle
        } else {
            SchedulerState::Disabled
        })
        .await;
    }
}

/// Assembles a [`Scheduler`] and loads its persisted state.
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    fetch_timeout: Duration,
    feed: Arc<dyn EventFeed>,
    dispatcher: Dispatcher,
    builder: NotificationBuilder,
    backend: Arc<dyn KvStore>,
}

impl SchedulerBuilder {
    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Hard limit on a single fetch; exceeding it counts as a feed timeout.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn notifications(mut self, builder: NotificationBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Load persisted dedup keys and settings, then build.
    ///
    /// Store errors are logged and the scheduler starts from defaults.
    pub fn build(self) -> Scheduler {
        let mut dedup = DedupStore::new(self.backend.clone());
        match dedup.load() {
            Ok(count) => info!(keys = count, "Loaded dedup keys"),
            Err(e) => warn!(error = %e, "Failed to load dedup keys, starting empty"),
        }

        let settings_store = SettingsStore::new(self.backend);
        let settings = match settings_store.load() {
            Ok(Some(settings)) => settings,
            Ok(None) => NotificationSettings::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load notification settings, using defaults");
                NotificationSettings::default()
            }
        };

        let state = if settings.enabled {
            SchedulerState::Idle
        } else {
            SchedulerState::Disabled
        };
        let history_limit = self.config.history_limit;

        Scheduler {
            inner: Arc::new(Inner {
                config: self.config,
                fetch_timeout: self.fetch_timeout,
                feed: self.feed,
                dispatcher: self.dispatcher,
                builder: self.builder,
                settings_store,
                settings: RwLock::new(settings),
                dedup: Mutex::new(dedup),
                tick_lock: Mutex::new(()),
                state: RwLock::new(state),
                counters: RwLock::new(SchedulerCounters::default()),
                history: RwLock::new(NotificationHistory::new(history_limit)),
                snapshot: RwLock::new(Vec::new()),
                last_check: RwLock::new(None),
                shutdown: Notify::new(),
                stopped: AtomicBool::new(false),
            }),
            handle: Mutex::new(None),
        }
    }
}

/// Periodically polls the feed and sends each due alert exactly once.
///
/// Manual commands (`force_check_now`, `update_settings`, ...) may be called
/// concurrently with the timer; tick bodies never overlap.
pub struct Scheduler {
    inner: Arc<Inner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn builder(feed: Arc<dyn EventFeed>, dispatcher: Dispatcher, backend: Arc<dyn KvStore>) -> SchedulerBuilder {
        SchedulerBuilder {
            config: SchedulerConfig::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            feed,
            dispatcher,
            builder: NotificationBuilder::default(),
            backend,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    /// Spawn the timer task: one tick after the initial delay, then one per interval.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return Err(SchedulerError::Stopped);
        }
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(
            feed = self.inner.feed.source_name(),
            interval_secs = self.inner.config.check_interval_secs,
            initial_delay_secs = self.inner.config.initial_delay_secs,
            channels = ?self.inner.dispatcher.channel_names(),
            "Scheduler starting"
        );
        *handle = Some(tokio::spawn(runner::run_loop(self.inner.clone())));
        Ok(())
    }

    /// Stop the timer and flush pending dedup keys. Safe to call repeatedly.
    pub async fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.notify_one();

        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduler loop terminated abnormally");
            }
        }

        // Wait out a manual tick that may still be running.
        let _serial = self.inner.tick_lock.lock().await;
        *self.inner.state.write().await = SchedulerState::Stopped;

        let mut dedup = self.inner.dedup.lock().await;
        if dedup.is_dirty() {
            if let Err(e) = dedup.flush() {
                warn!(error = %e, "Failed to flush dedup keys on shutdown");
            }
        }
        info!("Scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some() && !self.inner.stopped.load(Ordering::SeqCst)
    }

    // ── Ticks ─────────────────────────────────────────────────────

    /// Run one tick against the wall clock.
    pub async fn tick(&self) -> Result<TickReport, SchedulerError> {
        self.inner.tick(Utc::now()).await
    }

    /// Run one tick as if the time were `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickReport, SchedulerError> {
        self.inner.tick(now).await
    }

    /// Tick immediately, outside the timer cadence.
    pub async fn force_check_now(&self) -> Result<TickReport, SchedulerError> {
        info!("Manual check requested");
        self.tick().await
    }

    // ── Settings ──────────────────────────────────────────────────

    pub async fn settings(&self) -> NotificationSettings {
        *self.inner.settings.read().await
    }

    /// Apply a settings change and persist it.
    ///
    /// Disabling parks the scheduler; re-enabling runs a tick right away.
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<NotificationSettings, SchedulerError> {
        let (previous, current) = {
            let mut settings = self.inner.settings.write().await;
            let previous = settings.apply(&patch);
            (previous, *settings)
        };

        if let Err(e) = self.inner.settings_store.save(&current) {
            warn!(error = %e, "Failed to persist notification settings");
        }
        info!(
            enabled = current.enabled,
            pre_start_far = current.notify_pre_start_far,
            pre_start_near = current.notify_pre_start_near,
            started = current.notify_start,
            ended = current.notify_end,
            "Notification settings updated"
        );

        if self.inner.stopped.load(Ordering::SeqCst) {
            return Ok(current);
        }

        match (previous.enabled, current.enabled) {
            (true, false) => self.inner.set_state(SchedulerState::Disabled).await,
            (false, true) => {
                self.inner.set_state(SchedulerState::Idle).await;
                if let Err(e) = self.inner.tick(Utc::now()).await {
                    warn!(error = %e, "Tick after re-enabling notifications failed");
                }
            }
            _ => {}
        }

        Ok(current)
    }

    // ── Commands ──────────────────────────────────────────────────

    /// Deliver the fixed "notifications ready" alert. Never touches the dedup set.
    pub async fn send_test_notification(&self) -> Result<Delivered, SchedulerError> {
        if !self.inner.settings.read().await.enabled {
            return Err(SchedulerError::Disabled);
        }
        let record = self.inner.builder.test_notification();
        Ok(self.inner.deliver_record(&record, Utc::now()).await?)
    }

    /// Render what `milestone` would look like for a sample fixture, without sending.
    pub fn preview_notification(&self, milestone: Milestone) -> Result<NotificationRecord, SchedulerError> {
        let sample = Event::new("India", "Pakistan", Utc::now() + chrono::Duration::minutes(15), None);
        let at = trigger_at(&sample, milestone);
        Ok(self.inner.builder.build(&sample, milestone, at)?)
    }

    // ── Queries ───────────────────────────────────────────────────

    pub async fn state(&self) -> SchedulerState {
        *self.inner.state.read().await
    }

    pub async fn stats(&self) -> SchedulerStats {
        let event_count = self.inner.snapshot.read().await.len();
        let dedup_count = self.inner.dedup.lock().await.len();
        let settings = *self.inner.settings.read().await;
        let last_check = *self.inner.last_check.read().await;
        let state = *self.inner.state.read().await;
        let counters = self.inner.counters.read().await.clone();

        SchedulerStats {
            event_count,
            dedup_count,
            settings,
            last_check,
            state,
            running: self.is_running().await,
            channels: self
                .inner
                .dispatcher
                .channel_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            counters,
        }
    }

    /// Delivery attempts, newest first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.inner.history.read().await.entries()
    }

    /// Earliest upcoming alert in the last snapshot, `None` when disabled.
    pub async fn next_notification(&self, now: DateTime<Utc>) -> Option<UpcomingNotification> {
        let settings = *self.inner.settings.read().await;
        if !settings.enabled {
            return None;
        }
        next_notification(&self.inner.snapshot.read().await, now, &settings)
    }
}
