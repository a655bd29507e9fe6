//! User-facing notification settings.

use serde::{Deserialize, Serialize};

use crate::milestone::Milestone;

fn default_true() -> bool {
    true
}

/// Which alerts the user wants. Every flag defaults to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true", alias = "notify15min")]
    pub notify_pre_start_far: bool,
    #[serde(default = "default_true", alias = "notify5min")]
    pub notify_pre_start_near: bool,
    #[serde(default = "default_true")]
    pub notify_start: bool,
    #[serde(default = "default_true")]
    pub notify_end: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            notify_pre_start_far: true,
            notify_pre_start_near: true,
            notify_start: true,
            notify_end: true,
        }
    }
}

impl NotificationSettings {
    /// Whether alerts of this kind are switched on (ignores `enabled`).
    pub fn is_active(&self, milestone: Milestone) -> bool {
        match milestone {
            Milestone::PreStartFar => self.notify_pre_start_far,
            Milestone::PreStartNear => self.notify_pre_start_near,
            Milestone::Started => self.notify_start,
            Milestone::Ended => self.notify_end,
        }
    }

    /// Apply a partial update, returning the settings before the change.
    pub fn apply(&mut self, patch: &SettingsPatch) -> NotificationSettings {
        let previous = *self;
        if let Some(v) = patch.enabled {
            self.enabled = v;
        }
        if let Some(v) = patch.notify_pre_start_far {
            self.notify_pre_start_far = v;
        }
        if let Some(v) = patch.notify_pre_start_near {
            self.notify_pre_start_near = v;
        }
        if let Some(v) = patch.notify_start {
            self.notify_start = v;
        }
        if let Some(v) = patch.notify_end {
            self.notify_end = v;
        }
        previous
    }
}

/// Partial settings update; `None` leaves a field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, alias = "notify15min")]
    pub notify_pre_start_far: Option<bool>,
    #[serde(default, alias = "notify5min")]
    pub notify_pre_start_near: Option<bool>,
    #[serde(default)]
    pub notify_start: Option<bool>,
    #[serde(default)]
    pub notify_end: Option<bool>,
}

impl SettingsPatch {
    pub fn enabled(value: bool) -> Self {
        Self {
            enabled: Some(value),
            ..Self::default()
        }
    }

    /// Patch that toggles a single milestone kind.
    pub fn milestone(milestone: Milestone, value: bool) -> Self {
        let mut patch = Self::default();
        match milestone {
            Milestone::PreStartFar => patch.notify_pre_start_far = Some(value),
            Milestone::PreStartNear => patch.notify_pre_start_near = Some(value),
            Milestone::Started => patch.notify_start = Some(value),
            Milestone::Ended => patch.notify_end = Some(value),
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything() {
        let s = NotificationSettings::default();
        assert!(s.enabled);
        assert!(Milestone::ALL.iter().all(|m| s.is_active(*m)));
    }

    #[test]
    fn deserializes_partial_object_with_defaults() {
        let s: NotificationSettings =
            serde_json::from_str(r#"{"enabled": false, "notifyEnd": false}"#).unwrap();
        assert!(!s.enabled);
        assert!(!s.notify_end);
        assert!(s.notify_start);
        assert!(s.notify_pre_start_far);
    }

    #[test]
    fn accepts_minute_aliases() {
        let s: NotificationSettings =
            serde_json::from_str(r#"{"notify15min": false, "notify5min": true}"#).unwrap();
        assert!(!s.is_active(Milestone::PreStartFar));
        assert!(s.is_active(Milestone::PreStartNear));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(NotificationSettings::default()).unwrap();
        assert_eq!(json["notifyPreStartFar"], true);
        assert_eq!(json["notifyStart"], true);
    }

    #[test]
    fn apply_patch_only_touches_set_fields() {
        let mut s = NotificationSettings::default();
        let before = s.apply(&SettingsPatch::milestone(Milestone::Started, false));
        assert_eq!(before, NotificationSettings::default());
        assert!(!s.notify_start);
        assert!(s.enabled);
        assert!(s.notify_end);

        s.apply(&SettingsPatch::enabled(false));
        assert!(!s.enabled);
        assert!(!s.notify_start);
    }
}
