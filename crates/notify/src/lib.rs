//! Notification delivery for match alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - Webhook, Telegram and log notifier implementations
//! - Minijinja template rendering for alert titles and bodies
//! - `NotificationBuilder` turning (event, milestone) into a `NotificationRecord`
//! - `Dispatcher` that fans a record out to every configured channel

pub mod builder;
pub mod dispatcher;
pub mod log;
pub mod telegram;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use builder::{MessageTemplate, NotificationBuilder};
pub use dispatcher::{Delivered, DeliveryError, Dispatcher};
pub use log::LogNotifier;
pub use telegram::TelegramNotifier;
pub use templating::TemplateRenderer;
pub use traits::{
    DispatchResult, NotificationAction, NotificationData, NotificationRecord, Notifier, NotifyError,
};
pub use webhook::WebhookNotifier;
