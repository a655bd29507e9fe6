use crate::traits::{NotificationRecord, Notifier, NotifyError};

/// Channel that writes alerts to the tracing log. Always succeeds.
///
/// Used when no external channel is configured, so a local run still shows
/// what would have been sent.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &NotificationRecord) -> Result<(), NotifyError> {
        tracing::info!(
            tag = %notification.tag,
            title = %notification.title,
            deep_link = %notification.deep_link,
            require_interaction = notification.require_interaction,
            "{}",
            notification.body
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
