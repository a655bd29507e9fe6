//! Lifecycle milestones of a match and their timing rules.

use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A lifecycle point of a match that earns exactly one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Milestone {
    /// 15 minutes before start.
    PreStartFar,
    /// 5 minutes before start.
    PreStartNear,
    /// Scheduled start.
    Started,
    /// Scheduled end (start + duration).
    Ended,
}

/// Which instant of the event a milestone offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    End,
}

/// Timing rule of one milestone: trigger = anchor + offset, due for `grace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneRule {
    pub milestone: Milestone,
    pub anchor: Anchor,
    pub offset_minutes: i64,
    pub grace_minutes: i64,
}

impl MilestoneRule {
    pub fn offset(&self) -> Duration {
        Duration::minutes(self.offset_minutes)
    }

    pub fn grace(&self) -> Duration {
        Duration::minutes(self.grace_minutes)
    }
}

/// Timing table for every milestone, in [`Milestone::ALL`] order.
pub const MILESTONE_RULES: [MilestoneRule; 4] = [
    MilestoneRule {
        milestone: Milestone::PreStartFar,
        anchor: Anchor::Start,
        offset_minutes: -15,
        grace_minutes: 5,
    },
    MilestoneRule {
        milestone: Milestone::PreStartNear,
        anchor: Anchor::Start,
        offset_minutes: -5,
        grace_minutes: 4,
    },
    MilestoneRule {
        milestone: Milestone::Started,
        anchor: Anchor::Start,
        offset_minutes: 0,
        grace_minutes: 5,
    },
    MilestoneRule {
        milestone: Milestone::Ended,
        anchor: Anchor::End,
        offset_minutes: 0,
        grace_minutes: 30,
    },
];

impl Milestone {
    pub const ALL: [Milestone; 4] = [
        Milestone::PreStartFar,
        Milestone::PreStartNear,
        Milestone::Started,
        Milestone::Ended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Milestone::PreStartFar => "pre-start-far",
            Milestone::PreStartNear => "pre-start-near",
            Milestone::Started => "started",
            Milestone::Ended => "ended",
        }
    }

    pub fn rule(&self) -> &'static MilestoneRule {
        let idx = match self {
            Milestone::PreStartFar => 0,
            Milestone::PreStartNear => 1,
            Milestone::Started => 2,
            Milestone::Ended => 3,
        };
        &MILESTONE_RULES[idx]
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Milestone {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Milestone::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| CoreError::UnknownMilestone(s.to_string()))
    }
}
