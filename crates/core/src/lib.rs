pub mod config;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod milestone;
pub mod settings;

pub use config::{Config, DeliveryFailurePolicy};
pub use error::*;
pub use evaluator::{due_milestones, expires_at, format_time_until, next_notification, trigger_at, UpcomingNotification};
pub use event::*;
pub use milestone::{Anchor, Milestone, MilestoneRule, MILESTONE_RULES};
pub use settings::{NotificationSettings, SettingsPatch};
