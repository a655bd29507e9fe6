//! Turns a due (event, milestone) pair into a [`NotificationRecord`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use matchbell_core::config::DeliveryConfig;
use matchbell_core::{Event, Milestone};

use crate::templating::{TemplateContext, TemplateRenderer};
use crate::traits::{NotificationAction, NotificationData, NotificationRecord, NotifyError};

/// Title and body templates for one milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    pub title: String,
    pub body: String,
}

impl MessageTemplate {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Built-in wording for a milestone.
    pub fn default_for(milestone: Milestone) -> Self {
        match milestone {
            Milestone::PreStartFar => Self::new(
                "🏏 Match Starting Soon!",
                "{{ team1 }} vs {{ team2 }} starts in 15 minutes",
            ),
            Milestone::PreStartNear => Self::new(
                "⚡ Match Starting Very Soon!",
                "{{ team1 }} vs {{ team2 }} starts in 5 minutes",
            ),
            Milestone::Started => Self::new(
                "🔴 LIVE NOW!",
                "{{ team1 }} vs {{ team2 }} has started! Watch now!",
            ),
            Milestone::Ended => {
                Self::new("🏁 Match Finished", "{{ team1 }} vs {{ team2 }} has ended")
            }
        }
    }
}

/// Renders alert records with the configured icons, links and templates.
#[derive(Debug)]
pub struct NotificationBuilder {
    icon_url: String,
    badge_url: String,
    deep_link_base: String,
    templates: HashMap<Milestone, MessageTemplate>,
    renderer: TemplateRenderer,
}

impl NotificationBuilder {
    pub fn new(icon_url: impl Into<String>, badge_url: impl Into<String>, deep_link_base: impl Into<String>) -> Self {
        let templates = Milestone::ALL
            .into_iter()
            .map(|m| (m, MessageTemplate::default_for(m)))
            .collect();
        Self {
            icon_url: icon_url.into(),
            badge_url: badge_url.into(),
            deep_link_base: deep_link_base.into(),
            templates,
            renderer: TemplateRenderer::new(),
        }
    }

    /// Construct from the `delivery` config section.
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self::new(&config.icon_url, &config.badge_url, &config.deep_link_base)
    }

    /// Replace the wording of one milestone; the template syntax is checked up front.
    pub fn with_template(mut self, milestone: Milestone, template: MessageTemplate) -> Result<Self, NotifyError> {
        self.renderer.validate(&template.title)?;
        self.renderer.validate(&template.body)?;
        self.templates.insert(milestone, template);
        Ok(self)
    }

    /// Collapse tag shared by every alert of this (event, milestone).
    pub fn tag_for(event: &Event, milestone: Milestone) -> String {
        format!("match-{}-{}", milestone, event.id)
    }

    /// Link opened from the alert; live alerts jump to the live view.
    pub fn deep_link_for(&self, milestone: Milestone) -> String {
        match milestone {
            Milestone::Started => format!("{}#live", self.deep_link_base),
            _ => self.deep_link_base.clone(),
        }
    }

    /// Render the alert for `milestone` of `event` at `now`.
    pub fn build(&self, event: &Event, milestone: Milestone, now: DateTime<Utc>) -> Result<NotificationRecord, NotifyError> {
        let fallback;
        let template = match self.templates.get(&milestone) {
            Some(t) => t,
            None => {
                fallback = MessageTemplate::default_for(milestone);
                &fallback
            }
        };

        let ctx = TemplateContext {
            team1: event.team1.clone(),
            team2: event.team2.clone(),
            fixture: event.fixture(),
            milestone: milestone.to_string(),
            start: event.start.to_rfc3339(),
            end: event.end().to_rfc3339(),
            minutes_to_start: (event.start - now).num_minutes(),
            now: now.to_rfc3339(),
        };

        let deep_link = self.deep_link_for(milestone);
        Ok(NotificationRecord {
            title: self.renderer.render(&template.title, &ctx)?,
            body: self.renderer.render(&template.body, &ctx)?,
            icon: event.team1_logo.clone().unwrap_or_else(|| self.icon_url.clone()),
            badge: self.badge_url.clone(),
            deep_link: deep_link.clone(),
            tag: Self::tag_for(event, milestone),
            require_interaction: milestone == Milestone::Started,
            actions: vec![NotificationAction::view(), NotificationAction::dismiss()],
            data: NotificationData {
                event_id: Some(event.id.to_string()),
                milestone: Some(milestone),
                fixture: Some(event.fixture()),
                team1: Some(event.team1.clone()),
                team2: Some(event.team2.clone()),
                url: deep_link,
            },
        })
    }

    /// The fixed "notifications are working" alert.
    pub fn test_notification(&self) -> NotificationRecord {
        NotificationRecord {
            title: "🔔 Notifications Ready!".to_string(),
            body: "You will receive alerts for upcoming matches".to_string(),
            icon: self.icon_url.clone(),
            badge: self.badge_url.clone(),
            deep_link: self.deep_link_base.clone(),
            tag: "test-notification".to_string(),
            require_interaction: false,
            actions: vec![NotificationAction::dismiss()],
            data: NotificationData {
                event_id: None,
                milestone: None,
                fixture: None,
                team1: None,
                team2: None,
                url: self.deep_link_base.clone(),
            },
        }
    }
}

impl Default for NotificationBuilder {
    fn default() -> Self {
        Self::new("/icon-192.png", "/icon-192.png", "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn event() -> Event {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
        Event::new("India", "Pakistan", start, None)
    }

    #[test]
    fn builds_pre_start_alert() {
        let builder = NotificationBuilder::default();
        let e = event();
        let record = builder
            .build(&e, Milestone::PreStartFar, e.start - Duration::minutes(15))
            .unwrap();

        assert_eq!(record.title, "🏏 Match Starting Soon!");
        assert_eq!(record.body, "India vs Pakistan starts in 15 minutes");
        assert_eq!(record.tag, format!("match-pre-start-far-{}", e.id));
        assert_eq!(record.icon, "/icon-192.png");
        assert!(!record.require_interaction);
        assert_eq!(record.data.event_id.as_deref(), Some(e.id.as_str()));
        assert_eq!(record.data.milestone, Some(Milestone::PreStartFar));
        let actions: Vec<&str> = record.actions.iter().map(|a| a.action.as_str()).collect();
        assert_eq!(actions, vec!["view", "dismiss"]);
    }

    #[test]
    fn live_alert_requires_interaction_and_links_live_view() {
        let builder = NotificationBuilder::new("/i.png", "/b.png", "https://cric.example/");
        let e = event().with_logo("https://cdn.example/ind.png");
        let record = builder.build(&e, Milestone::Started, e.start).unwrap();

        assert_eq!(record.title, "🔴 LIVE NOW!");
        assert!(record.require_interaction);
        assert_eq!(record.deep_link, "https://cric.example/#live");
        assert_eq!(record.data.url, record.deep_link);
        assert_eq!(record.icon, "https://cdn.example/ind.png");
        assert_eq!(record.badge, "/b.png");
    }

    #[test]
    fn tags_differ_per_milestone() {
        let e = event();
        let tags: std::collections::HashSet<String> = Milestone::ALL
            .into_iter()
            .map(|m| NotificationBuilder::tag_for(&e, m))
            .collect();
        assert_eq!(tags.len(), 4);
    }

    #[test]
    fn custom_template_overrides_default() {
        let builder = NotificationBuilder::default()
            .with_template(
                Milestone::Ended,
                MessageTemplate::new("Result time", "{{ fixture | upper }} is over"),
            )
            .unwrap();
        let e = event();
        let record = builder.build(&e, Milestone::Ended, e.end()).unwrap();
        assert_eq!(record.title, "Result time");
        assert_eq!(record.body, "INDIA VS PAKISTAN is over");
    }

    #[test]
    fn invalid_custom_template_rejected() {
        let result = NotificationBuilder::default()
            .with_template(Milestone::Ended, MessageTemplate::new("{{ oops", "body"));
        assert!(matches!(result, Err(NotifyError::Template(_))));
    }

    #[test]
    fn test_notification_shape() {
        let record = NotificationBuilder::default().test_notification();
        assert_eq!(record.tag, "test-notification");
        assert!(record.data.event_id.is_none());
    }
}
