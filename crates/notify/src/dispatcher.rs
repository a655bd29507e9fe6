//! Routes notifications to configured channels.
//!
//! The dispatcher delivers one record to every configured channel.
//! Individual channel failures don't block other channels, and nothing is
//! retried here: retry policy belongs to the caller.

use crate::traits::{DispatchResult, NotificationRecord, Notifier, NotifyError};

/// Outcome of a delivery in which at least one channel accepted the record.
#[derive(Debug, Clone)]
pub struct Delivered {
    /// Channels that accepted the record.
    pub channels: Vec<String>,
    /// Per-channel results, including partial failures.
    pub results: Vec<DispatchResult>,
}

/// Delivery failed on every channel (or there was nothing to deliver to).
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("no notification channels configured")]
    NoChannels,

    #[error("all {attempted} channel(s) failed: {errors}")]
    AllChannelsFailed { attempted: usize, errors: String },
}

/// Fans a notification out to a fixed set of channels.
pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    /// Create a dispatcher over the given channels.
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Append a channel.
    pub fn add_channel(&mut self, channel: Box<dyn Notifier>) {
        self.channels.push(channel);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.channel_name()).collect()
    }

    /// Send to every channel and report per-channel results.
    pub async fn dispatch(&self, notification: &NotificationRecord) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(tag = %notification.tag, "No notification channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let start = std::time::Instant::now();
            let result = channel.send(notification).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        tag = %notification.tag,
                        channel = channel.channel_name(),
                        duration_ms,
                        "Notification delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        tag = %notification.tag,
                        channel = channel.channel_name(),
                        error = %e,
                        duration_ms,
                        "Notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: channel.channel_name().to_string(),
                tag: notification.tag.clone(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }

    /// Deliver a record; succeeds when at least one channel accepted it.
    pub async fn deliver(&self, notification: &NotificationRecord) -> Result<Delivered, DeliveryError> {
        if self.channels.is_empty() {
            return Err(DeliveryError::NoChannels);
        }

        let results = self.dispatch(notification).await;
        let channels: Vec<String> = results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.channel.clone())
            .collect();

        if channels.is_empty() {
            let errors = results
                .iter()
                .map(|r| format!("{}: {}", r.channel, r.error.as_deref().unwrap_or("unknown")))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DeliveryError::AllChannelsFailed {
                attempted: results.len(),
                errors,
            });
        }

        Ok(Delivered { channels, results })
    }

    /// Send a test notification to a channel by index.
    pub async fn test_notify(&self, channel_index: usize) -> Result<(), NotifyError> {
        let channel = self
            .channels
            .get(channel_index)
            .ok_or_else(|| NotifyError::Config(format!("Channel index {channel_index} out of range")))?;

        channel.test().await
    }
}
