use thiserror::Error;

use matchbell_feed::FeedError;
use matchbell_notify::{DeliveryError, NotifyError};
use matchbell_store::StoreError;

/// Errors surfaced by [`Scheduler`](crate::Scheduler) commands.
///
/// None of these stop the timer loop; they are reported to the caller of a
/// manual command and logged for timer-driven ticks.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("notifications are disabled")]
    Disabled,

    #[error("scheduler has been stopped")]
    Stopped,

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
