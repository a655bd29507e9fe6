//! Milestone due-checks.
//!
//! Every function here is pure: the result depends only on the event, the
//! reference instant and the settings passed in. A milestone with trigger
//! `t0` and grace `g` is due for `now` in `[t0, t0 + g)` and never again
//! afterwards, so a long outage drops stale alerts instead of replaying them.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::event::{saturating_add, Event, EventId};
use crate::milestone::{Anchor, Milestone};
use crate::settings::NotificationSettings;

/// Exact instant at which `milestone` triggers for `event`.
pub fn trigger_at(event: &Event, milestone: Milestone) -> DateTime<Utc> {
    let rule = milestone.rule();
    let anchor = match rule.anchor {
        Anchor::Start => event.start,
        Anchor::End => event.end(),
    };
    saturating_add(anchor, rule.offset())
}

/// Whether `milestone` is inside its validity window at `now`.
pub fn is_due(event: &Event, milestone: Milestone, now: DateTime<Utc>) -> bool {
    let trigger = trigger_at(event, milestone);
    trigger <= now && now < expires_at(event, milestone)
}

/// First instant at which `milestone` can no longer be due for `event`.
pub fn expires_at(event: &Event, milestone: Milestone) -> DateTime<Utc> {
    saturating_add(trigger_at(event, milestone), milestone.rule().grace())
}

/// All milestones of `event` that are due at `now` and switched on.
///
/// Kinds are evaluated independently; several can be due together.
pub fn due_milestones(
    event: &Event,
    now: DateTime<Utc>,
    settings: &NotificationSettings,
) -> BTreeSet<Milestone> {
    Milestone::ALL
        .into_iter()
        .filter(|m| settings.is_active(*m))
        .filter(|m| is_due(event, *m, now))
        .collect()
}

/// The next alert that will become due.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingNotification {
    pub event_id: EventId,
    pub fixture: String,
    pub milestone: Milestone,
    pub at: DateTime<Utc>,
    pub time_until: String,
}

/// Earliest trigger strictly after `now` among the enabled milestones.
pub fn next_notification(
    events: &[Event],
    now: DateTime<Utc>,
    settings: &NotificationSettings,
) -> Option<UpcomingNotification> {
    events
        .iter()
        .flat_map(|event| {
            Milestone::ALL
                .into_iter()
                .filter(|m| settings.is_active(*m))
                .map(move |m| (event, m, trigger_at(event, m)))
        })
        .filter(|(_, _, at)| *at > now)
        .min_by_key(|(_, _, at)| *at)
        .map(|(event, milestone, at)| UpcomingNotification {
            event_id: event.id.clone(),
            fixture: event.fixture(),
            milestone,
            at,
            time_until: format_time_until(at - now),
        })
}

/// Compact countdown: `2d 3h`, `4h 12m` or `9m`.
pub fn format_time_until(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d {}h", days, hours % 24)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}
