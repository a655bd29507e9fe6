//! Match events as seen by the scheduler.
//!
//! The feed serves loosely-typed match records; [`Event::from_record`]
//! normalises one record into an immutable [`Event`] with a stable
//! identifier and a resolved duration.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Duration used when the feed omits it or sends something unusable.
pub const FALLBACK_DURATION_MINUTES: i64 = 360;

/// Longest accepted duration (30 days); longer values fall back.
pub const MAX_DURATION_MINUTES: i64 = 30 * 24 * 60;

/// Hex characters kept from the participant digest.
const EVENT_ID_LEN: usize = 16;

/// Naive timestamp layouts accepted in addition to RFC 3339 (read as UTC).
const NAIVE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Stable identifier of a match, derived from its participants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Derive the id from the two participant names.
    ///
    /// Names are trimmed, lowercased and whitespace-collapsed before hashing,
    /// so cosmetic differences between polls map to the same id. Order
    /// matters: `A vs B` and `B vs A` are different fixtures.
    pub fn from_participants(team1: &str, team2: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalize_name(team1).as_bytes());
        hasher.update([0x1f]);
        hasher.update(normalize_name(team2).as_bytes());
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(EVENT_ID_LEN);
        for byte in digest.iter().take(EVENT_ID_LEN / 2) {
            hex.push_str(&format!("{:02x}", byte));
        }
        Self(hex)
    }

    /// Wrap an already-derived id (e.g. one read back from storage).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// One scheduled match from a single feed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: EventId,
    pub team1: String,
    pub team2: String,
    /// Logo used as the notification icon when present.
    pub team1_logo: Option<String>,
    pub start: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl Event {
    /// Build an event; a missing, non-positive or longer than
    /// [`MAX_DURATION_MINUTES`] duration falls back to
    /// [`FALLBACK_DURATION_MINUTES`].
    pub fn new(
        team1: impl Into<String>,
        team2: impl Into<String>,
        start: DateTime<Utc>,
        duration_minutes: Option<i64>,
    ) -> Self {
        let team1 = team1.into();
        let team2 = team2.into();
        Self {
            id: EventId::from_participants(&team1, &team2),
            team1,
            team2,
            team1_logo: None,
            start,
            duration_minutes: duration_minutes
                .filter(|d| (1..=MAX_DURATION_MINUTES).contains(d))
                .unwrap_or(FALLBACK_DURATION_MINUTES),
        }
    }

    pub fn with_logo(mut self, logo: impl Into<String>) -> Self {
        self.team1_logo = Some(logo.into());
        self
    }

    /// Derived end instant: `start + duration`, saturating at the edge of
    /// the representable range.
    pub fn end(&self) -> DateTime<Utc> {
        let duration = Duration::try_minutes(self.duration_minutes)
            .filter(|d| *d > Duration::zero())
            .unwrap_or_else(|| Duration::minutes(FALLBACK_DURATION_MINUTES));
        saturating_add(self.start, duration)
    }

    /// Human-readable fixture label, e.g. `India vs Pakistan`.
    pub fn fixture(&self) -> String {
        format!("{} vs {}", self.team1, self.team2)
    }

    /// Normalise a raw feed record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] for blank participant names and
    /// [`CoreError::InvalidMatchTime`] when the start time cannot be parsed.
    pub fn from_record(record: MatchRecord) -> Result<Self, CoreError> {
        if record.team1.trim().is_empty() || record.team2.trim().is_empty() {
            return Err(CoreError::InvalidRecord(format!(
                "participant names must not be empty ('{}' vs '{}')",
                record.team1, record.team2
            )));
        }

        let start = parse_match_time(&record.match_time)?;
        let duration = parse_duration(record.match_duration.as_ref());

        let mut event = Event::new(record.team1.trim(), record.team2.trim(), start, duration);
        event.team1_logo = record.team1_logo.filter(|l| !l.trim().is_empty());
        Ok(event)
    }
}

/// A match entry exactly as served by the feed.
///
/// Field names are accepted both in camelCase and in the feed's
/// PascalCase (`Team1`, `MatchTime`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    #[serde(alias = "Team1")]
    pub team1: String,
    #[serde(alias = "Team2")]
    pub team2: String,
    #[serde(alias = "MatchTime")]
    pub match_time: String,
    /// Minutes, as a number or a numeric string.
    #[serde(default, alias = "MatchDuration")]
    pub match_duration: Option<serde_json::Value>,
    #[serde(default, alias = "Team1Logo")]
    pub team1_logo: Option<String>,
}

/// Parse a feed timestamp.
///
/// RFC 3339 strings keep their offset; naive timestamps are read as UTC.
pub fn parse_match_time(value: &str) -> Result<DateTime<Utc>, CoreError> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(CoreError::InvalidMatchTime {
        value: value.to_string(),
        reason: "expected RFC 3339 or YYYY-MM-DD HH:MM[:SS]".to_string(),
    })
}

/// Move `at` by `delta`, clamping to the representable range instead of
/// overflowing.
pub fn saturating_add(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(if delta < Duration::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Extract a duration in minutes from the feed value.
///
/// Numbers are truncated; strings contribute their leading digits
/// (`"90 mins"` is 90). Anything else, or a result outside
/// `1..=MAX_DURATION_MINUTES`, yields `None` so the caller applies the
/// fallback.
pub fn parse_duration(value: Option<&serde_json::Value>) -> Option<i64> {
    let minutes = match value? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<i64>().ok()
        }
        _ => None,
    }?;
    (1..=MAX_DURATION_MINUTES).contains(&minutes).then_some(minutes)
}
