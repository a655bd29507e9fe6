//! Notifier trait definition and shared record types.

use serde::{Deserialize, Serialize};

use matchbell_core::Milestone;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel rejected notification: {0}")]
    Rejected(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// A user-actionable button on the alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    /// Identifier echoed back when the user picks the action (`view`, `dismiss`).
    pub action: String,
    pub title: String,
}

impl NotificationAction {
    pub fn view() -> Self {
        Self {
            action: "view".to_string(),
            title: "View Match".to_string(),
        }
    }

    pub fn dismiss() -> Self {
        Self {
            action: "dismiss".to_string(),
            title: "Dismiss".to_string(),
        }
    }
}

/// Opaque payload round-tripped by the delivery channel on interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub event_id: Option<String>,
    pub milestone: Option<Milestone>,
    pub fixture: Option<String>,
    pub team1: Option<String>,
    pub team2: Option<String>,
    pub url: String,
}

/// A fully rendered alert ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Where the client navigates when the alert is opened.
    pub deep_link: String,
    /// Alerts sharing a tag collapse into one on screen.
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &NotificationRecord) -> Result<(), NotifyError>;

    /// Test connectivity with a sample notification.
    async fn test(&self) -> Result<(), NotifyError> {
        let test_notification = NotificationRecord {
            title: "[TEST] Match alerts".to_string(),
            body: "This is a test notification from matchbell.".to_string(),
            icon: String::new(),
            badge: String::new(),
            deep_link: "/".to_string(),
            tag: "channel-test".to_string(),
            require_interaction: false,
            actions: Vec::new(),
            data: NotificationData {
                event_id: None,
                milestone: None,
                fixture: None,
                team1: None,
                team2: None,
                url: "/".to_string(),
            },
        };
        self.send(&test_notification).await
    }

    /// Human-readable name for this channel (e.g., "webhook", "telegram").
    fn channel_name(&self) -> &str;
}

/// Result of dispatching a notification to a single channel.
#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub channel: String,
    pub tag: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
