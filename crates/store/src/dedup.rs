//! Persistent set of already-alerted (event, milestone) pairs.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use matchbell_core::{expires_at, saturating_add, CoreError, Event, EventId, Milestone};

use crate::error::StoreError;
use crate::kv::KvStore;

/// Record name holding the persisted key list.
pub const DEDUP_RECORD: &str = "dedup_keys";

/// Identity of one alert: `(event id, milestone)`.
///
/// The event's start and the end of the milestone's grace window are carried
/// along so age-based eviction still works on keys loaded after a restart,
/// when the event itself may be gone from the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub event_id: EventId,
    pub milestone: Milestone,
    /// Event start, unix seconds.
    pub start_secs: i64,
    /// First instant the milestone can no longer be due, unix seconds.
    pub expires_secs: i64,
}

impl DedupKey {
    pub fn new(event: &Event, milestone: Milestone) -> Self {
        Self {
            event_id: event.id.clone(),
            milestone,
            start_secs: event.start.timestamp(),
            expires_secs: expires_at(event, milestone).timestamp(),
        }
    }

    fn identity(&self) -> (EventId, Milestone) {
        (self.event_id.clone(), self.milestone)
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.event_id, self.milestone, self.start_secs, self.expires_secs
        )
    }
}

impl FromStr for DedupKey {
    type Err = CoreError;

    /// Accepts `id:milestone:start:expires`, and the older `id:milestone:start`
    /// form where the expiry is taken to be the start.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoreError::InvalidRecord(format!("malformed dedup key: {s}"));
        let secs = |part: &str| part.parse::<i64>().map_err(|_| malformed());
        let parts: Vec<&str> = s.split(':').collect();
        let (event_id, milestone, start_secs, expires_secs) = match parts.as_slice() {
            [id, milestone, start] => (*id, *milestone, secs(*start)?, secs(*start)?),
            [id, milestone, start, expires] => (*id, *milestone, secs(*start)?, secs(*expires)?),
            _ => return Err(malformed()),
        };
        if event_id.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            event_id: EventId::from_raw(event_id),
            milestone: milestone.parse()?,
            start_secs,
            expires_secs,
        })
    }
}

/// In-memory dedup set mirrored to a [`KvStore`].
///
/// All lookups are served from memory; the store is only touched by
/// [`load`](Self::load) and [`flush`](Self::flush). Writes are set-unions
/// with whatever is already persisted, minus keys removed here since the
/// last flush.
pub struct DedupStore {
    keys: HashMap<(EventId, Milestone), DedupKey>,
    /// Removed or evicted since the last flush; kept out of the union.
    tombstones: HashSet<(EventId, Milestone)>,
    /// Memory differs from what was last written.
    dirty: bool,
    backend: Arc<dyn KvStore>,
}

impl DedupStore {
    /// Empty set over `backend`. Call [`load`](Self::load) to pick up persisted keys.
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            keys: HashMap::new(),
            tombstones: HashSet::new(),
            dirty: false,
            backend,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether there are changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains_key(&key.identity())
    }

    /// Insert a key. Returns `false` if it was already present.
    pub fn insert(&mut self, key: DedupKey) -> bool {
        let identity = key.identity();
        self.tombstones.remove(&identity);
        if self.keys.contains_key(&identity) {
            return false;
        }
        self.keys.insert(identity, key);
        self.dirty = true;
        true
    }

    /// Remove a key. Returns `false` if it was absent.
    pub fn remove(&mut self, key: &DedupKey) -> bool {
        let identity = key.identity();
        let removed = self.keys.remove(&identity).is_some();
        if removed {
            self.tombstones.insert(identity);
            self.dirty = true;
        }
        removed
    }

    /// Drop keys whose event started more than `retention` before `now`.
    /// A key is kept while its milestone's grace window is still open, so a
    /// match running longer than `retention` cannot re-fire its late alerts.
    /// Returns how many were evicted.
    pub fn evict_older_than(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let cutoff = saturating_add(now, -retention).timestamp();
        let now_secs = now.timestamp();
        let stale: Vec<(EventId, Milestone)> = self
            .keys
            .iter()
            .filter(|(_, key)| key.start_secs < cutoff && key.expires_secs <= now_secs)
            .map(|(identity, _)| identity.clone())
            .collect();

        for identity in &stale {
            self.keys.remove(identity);
            self.tombstones.insert(identity.clone());
        }
        if !stale.is_empty() {
            self.dirty = true;
            tracing::debug!(evicted = stale.len(), remaining = self.keys.len(), "Evicted stale dedup keys");
        }
        stale.len()
    }

    /// Union persisted keys into memory.
    pub fn load(&mut self) -> Result<usize, StoreError> {
        let mut added = 0;
        for key in self.read_persisted()? {
            let identity = key.identity();
            if self.tombstones.contains(&identity) {
                continue;
            }
            if !self.keys.contains_key(&identity) {
                self.keys.insert(identity, key);
                added += 1;
            }
        }
        Ok(added)
    }

    /// Write memory ∪ persisted (minus tombstones) back to the store.
    ///
    /// On error memory is left as it was, so deduplication keeps working for
    /// the lifetime of the process.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.load()?;

        let mut entries: Vec<String> = self.keys.values().map(|k| k.to_string()).collect();
        entries.sort();
        self.backend.put(DEDUP_RECORD, &Value::from(entries))?;
        self.tombstones.clear();
        self.dirty = false;
        Ok(())
    }

    fn read_persisted(&self) -> Result<Vec<DedupKey>, StoreError> {
        let Some(value) = self.backend.get(DEDUP_RECORD)? else {
            return Ok(Vec::new());
        };
        let entries: Vec<Value> = match value {
            Value::Array(entries) => entries,
            other => {
                tracing::warn!(found = %other, "Persisted dedup record is not a list, ignoring");
                return Ok(Vec::new());
            }
        };

        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.as_str().map(str::parse::<DedupKey>) {
                Some(Ok(key)) => keys.push(key),
                Some(Err(e)) => tracing::warn!(error = %e, "Skipping persisted dedup key"),
                None => tracing::warn!(entry = %entry, "Skipping non-string dedup entry"),
            }
        }
        Ok(keys)
    }
}

impl fmt::Debug for DedupStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupStore")
            .field("keys", &self.keys.len())
            .field("tombstones", &self.tombstones.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn key(team: &str, milestone: Milestone, start: DateTime<Utc>) -> DedupKey {
        DedupKey::new(&Event::new(team, "Pakistan", start, None), milestone)
    }

    #[test]
    fn key_string_format() {
        let k = key("India", Milestone::PreStartFar, now());
        let s = k.to_string();
        assert_eq!(
            s,
            format!(
                "{}:pre-start-far:{}:{}",
                k.event_id,
                now().timestamp(),
                (now() - Duration::minutes(10)).timestamp()
            )
        );
        assert_eq!(s.parse::<DedupKey>().unwrap(), k);
    }

    #[test]
    fn key_without_expiry_still_parses() {
        let k: DedupKey = "abc:started:1000".parse().unwrap();
        assert_eq!(k.start_secs, 1000);
        assert_eq!(k.expires_secs, 1000);
    }

    #[test]
    fn malformed_keys_rejected() {
        assert!("".parse::<DedupKey>().is_err());
        assert!("abc:started".parse::<DedupKey>().is_err());
        assert!("abc:kickoff:10".parse::<DedupKey>().is_err());
        assert!("abc:started:soon".parse::<DedupKey>().is_err());
        assert!("abc:started:10:later".parse::<DedupKey>().is_err());
        assert!("abc:started:10:20:30".parse::<DedupKey>().is_err());
        assert!(":started:10".parse::<DedupKey>().is_err());
    }

    #[test]
    fn insert_is_idempotent() {
        let mut store = DedupStore::new(Arc::new(MemoryKvStore::new()));
        let k = key("India", Milestone::Started, now());
        assert!(store.insert(k.clone()));
        assert!(!store.insert(k.clone()));
        assert!(store.contains(&k));
        assert_eq!(store.len(), 1);
        assert!(store.is_dirty());
    }

    #[test]
    fn identity_ignores_start() {
        // A rescheduled match keeps its id; the alert is still considered sent.
        let mut store = DedupStore::new(Arc::new(MemoryKvStore::new()));
        store.insert(key("India", Milestone::Started, now()));
        assert!(store.contains(&key("India", Milestone::Started, now() + Duration::hours(1))));
        assert!(!store.contains(&key("India", Milestone::Ended, now())));
    }

    #[test]
    fn eviction_boundary() {
        let mut store = DedupStore::new(Arc::new(MemoryKvStore::new()));
        let stale = key("India", Milestone::Ended, now() - Duration::hours(24) - Duration::seconds(1));
        let fresh = key("England", Milestone::Ended, now() - Duration::hours(23));
        store.insert(stale.clone());
        store.insert(fresh.clone());

        assert_eq!(store.evict_older_than(now(), Duration::hours(24)), 1);
        assert!(!store.contains(&stale));
        assert!(store.contains(&fresh));
    }

    #[test]
    fn multi_day_match_keeps_ended_key_through_its_grace_window() {
        let mut store = DedupStore::new(Arc::new(MemoryKvStore::new()));
        let kickoff = now() - Duration::days(5);
        let ended = DedupKey::new(&Event::new("India", "England", kickoff, Some(7200)), Milestone::Ended);
        let started = DedupKey::new(&Event::new("India", "England", kickoff, Some(7200)), Milestone::Started);
        store.insert(ended.clone());
        store.insert(started.clone());

        assert_eq!(store.evict_older_than(now(), Duration::hours(24)), 1);
        assert!(store.contains(&ended));
        assert!(!store.contains(&started));

        assert_eq!(store.evict_older_than(now() + Duration::minutes(29), Duration::hours(24)), 0);
        assert_eq!(store.evict_older_than(now() + Duration::minutes(30), Duration::hours(24)), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn flush_unions_with_persisted() {
        let backend = Arc::new(MemoryKvStore::new());
        let other = key("England", Milestone::Started, now());
        backend.put(DEDUP_RECORD, &json!([other.to_string()])).unwrap();

        let mut store = DedupStore::new(backend.clone());
        let mine = key("India", Milestone::Started, now());
        store.insert(mine.clone());
        store.flush().unwrap();

        assert!(store.contains(&other));
        let persisted = backend.get(DEDUP_RECORD).unwrap().unwrap();
        assert_eq!(persisted.as_array().unwrap().len(), 2);
        assert!(!store.is_dirty());
    }

    #[test]
    fn removed_keys_stay_removed_after_flush() {
        let backend = Arc::new(MemoryKvStore::new());
        let mut store = DedupStore::new(backend.clone());
        let k = key("India", Milestone::Started, now());
        store.insert(k.clone());
        store.flush().unwrap();

        store.remove(&k);
        store.flush().unwrap();
        assert!(!store.contains(&k));
        assert_eq!(backend.get(DEDUP_RECORD).unwrap(), Some(json!([])));
    }

    #[test]
    fn load_skips_malformed_entries() {
        let backend = Arc::new(MemoryKvStore::new());
        let good = key("India", Milestone::Started, now());
        backend
            .put(DEDUP_RECORD, &json!([good.to_string(), "garbage", 42, "x:nope:1"]))
            .unwrap();

        let mut store = DedupStore::new(backend);
        assert_eq!(store.load().unwrap(), 1);
        assert!(store.contains(&good));
    }

    #[test]
    fn load_ignores_non_list_record() {
        let backend = Arc::new(MemoryKvStore::new());
        backend.put(DEDUP_RECORD, &json!({"oops": true})).unwrap();
        let mut store = DedupStore::new(backend);
        assert_eq!(store.load().unwrap(), 0);
    }
}
