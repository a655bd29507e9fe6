use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub feed: FeedConfig,
    pub scheduler: SchedulerConfig,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `MATCHBELL_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("MATCHBELL_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            feed: FeedConfig::from_env_profiled(p),
            scheduler: SchedulerConfig::from_env_profiled(p),
            storage: StorageConfig::from_env_profiled(p),
            delivery: DeliveryConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  feed:       url={}, timeout={}s", self.feed.url.as_deref().unwrap_or("(none)"), self.feed.timeout_secs);
        tracing::info!(
            "  scheduler:  interval={}s, initial_delay={}s, retention={}h, on_failure={}",
            self.scheduler.check_interval_secs,
            self.scheduler.initial_delay_secs,
            self.scheduler.dedup_retention_hours,
            self.scheduler.delivery_failure_policy,
        );
        tracing::info!("  storage:    data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  delivery:   webhook={}, telegram={}",
            self.delivery.webhook_url.is_some(),
            self.delivery.telegram_configured(),
        );
    }
}

// ── Feed ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl FeedConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "FEED_URL"),
            timeout_secs: profiled_env_u64(p, "FEED_TIMEOUT_SECS", 10),
        }
    }
}

// ── Scheduler ─────────────────────────────────────────────────

/// What happens to a dedup key when every channel rejected the alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryFailurePolicy {
    /// Keep the key: the alert may be lost, but a flapping channel can't cause a storm.
    #[default]
    Keep,
    /// Drop the key so the next tick retries while the milestone is still in grace.
    Retract,
}

impl std::fmt::Display for DeliveryFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryFailurePolicy::Keep => f.write_str("keep"),
            DeliveryFailurePolicy::Retract => f.write_str("retract"),
        }
    }
}

impl FromStr for DeliveryFailurePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "retract" => Ok(Self::Retract),
            other => Err(CoreError::InvalidConfig {
                key: "DELIVERY_FAILURE_POLICY".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Upper bound for `DEDUP_RETENTION_HOURS` (one year).
pub const MAX_DEDUP_RETENTION_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub check_interval_secs: u64,
    pub initial_delay_secs: u64,
    pub dedup_retention_hours: u64,
    pub delivery_failure_policy: DeliveryFailurePolicy,
    pub history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            initial_delay_secs: 5,
            dedup_retention_hours: 24,
            delivery_failure_policy: DeliveryFailurePolicy::Keep,
            history_limit: 50,
        }
    }
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        let defaults = Self::default();
        let policy = profiled_env_opt(p, "DELIVERY_FAILURE_POLICY")
            .and_then(|v| match v.parse() {
                Ok(policy) => Some(policy),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring delivery failure policy, using default");
                    None
                }
            })
            .unwrap_or_default();
        let mut retention = profiled_env_u64(p, "DEDUP_RETENTION_HOURS", defaults.dedup_retention_hours);
        if retention > MAX_DEDUP_RETENTION_HOURS {
            tracing::warn!(
                value = retention,
                max = MAX_DEDUP_RETENTION_HOURS,
                "DEDUP_RETENTION_HOURS too large, clamping"
            );
            retention = MAX_DEDUP_RETENTION_HOURS;
        }
        Self {
            check_interval_secs: profiled_env_u64(p, "CHECK_INTERVAL_SECS", defaults.check_interval_secs),
            initial_delay_secs: profiled_env_u64(p, "INITIAL_DELAY_SECS", defaults.initial_delay_secs),
            dedup_retention_hours: retention,
            delivery_failure_policy: policy,
            history_limit: profiled_env_u64(p, "HISTORY_LIMIT", defaults.history_limit as u64) as usize,
        }
    }

    /// Dedup retention as a duration, capped at [`MAX_DEDUP_RETENTION_HOURS`].
    pub fn dedup_retention(&self) -> chrono::Duration {
        let hours = self.dedup_retention_hours.min(MAX_DEDUP_RETENTION_HOURS) as i64;
        chrono::Duration::try_hours(hours).unwrap_or_else(|| chrono::Duration::hours(24))
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
        }
    }
}

// ── Delivery channels ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    pub webhook_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub icon_url: String,
    pub badge_url: String,
    pub deep_link_base: String,
}

impl DeliveryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            webhook_url: profiled_env_opt(p, "WEBHOOK_URL"),
            telegram_bot_token: profiled_env_opt(p, "TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: profiled_env_opt(p, "TELEGRAM_CHAT_ID"),
            icon_url: profiled_env_or(p, "ICON_URL", "/icon-192.png"),
            badge_url: profiled_env_or(p, "BADGE_URL", "/icon-192.png"),
            deep_link_base: profiled_env_or(p, "DEEP_LINK_BASE", "/"),
        }
    }

    pub fn telegram_configured(&self) -> bool {
        self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parsing() {
        assert_eq!("keep".parse::<DeliveryFailurePolicy>().unwrap(), DeliveryFailurePolicy::Keep);
        assert_eq!(" Retract ".parse::<DeliveryFailurePolicy>().unwrap(), DeliveryFailurePolicy::Retract);
        assert!("sometimes".parse::<DeliveryFailurePolicy>().is_err());
    }

    #[test]
    fn profiled_lookup_prefers_prefixed_key() {
        std::env::set_var("MBTEST_FEED_TIMEOUT_SECS", "3");
        let cfg = Config::for_profile("mbtest");
        assert_eq!(cfg.profile, "MBTEST");
        assert_eq!(cfg.feed.timeout_secs, 3);
        std::env::remove_var("MBTEST_FEED_TIMEOUT_SECS");
    }

    #[test]
    fn scheduler_defaults() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.check_interval_secs, 60);
        assert_eq!(cfg.dedup_retention_hours, 24);
        assert_eq!(cfg.delivery_failure_policy, DeliveryFailurePolicy::Keep);
    }

    #[test]
    fn huge_retention_is_clamped() {
        std::env::set_var("MBRET_DEDUP_RETENTION_HOURS", u64::MAX.to_string());
        let cfg = Config::for_profile("mbret");
        assert_eq!(cfg.scheduler.dedup_retention_hours, MAX_DEDUP_RETENTION_HOURS);
        std::env::remove_var("MBRET_DEDUP_RETENTION_HOURS");

        let raw = SchedulerConfig {
            dedup_retention_hours: u64::MAX,
            ..SchedulerConfig::default()
        };
        assert_eq!(raw.dedup_retention(), chrono::Duration::days(365));
        assert_eq!(SchedulerConfig::default().dedup_retention(), chrono::Duration::hours(24));
    }

    #[test]
    fn profile_label_defaults() {
        let cfg = Config::for_profile("");
        assert_eq!(cfg.profile_label(), "default");
    }
}
