//! Dedup state survives a process restart through the file store.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use matchbell_core::{Event, Milestone};
use matchbell_store::{DedupKey, DedupStore, FileKvStore, KvStore, DEDUP_RECORD};

#[test]
fn keys_survive_restart_and_still_evict() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
    let event = Event::new("India", "Pakistan", now - Duration::minutes(15), None);
    let key = DedupKey::new(&event, Milestone::Started);

    {
        let backend = Arc::new(FileKvStore::new(tmp.path()).unwrap());
        let mut store = DedupStore::new(backend);
        store.insert(key.clone());
        store.flush().unwrap();
    }

    let backend = Arc::new(FileKvStore::new(tmp.path()).unwrap());
    let mut store = DedupStore::new(backend.clone());
    assert_eq!(store.load().unwrap(), 1);
    assert!(store.contains(&key));

    // A day later the event is gone from the feed, but its start is in the key.
    let later = now + Duration::hours(24);
    assert_eq!(store.evict_older_than(later, Duration::hours(24)), 1);
    store.flush().unwrap();

    let persisted = backend.get(DEDUP_RECORD).unwrap().unwrap();
    assert!(persisted.as_array().unwrap().is_empty());
}

#[test]
fn two_writers_union() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 14, 0, 0).unwrap();
    let a = DedupKey::new(&Event::new("India", "Pakistan", now, None), Milestone::Started);
    let b = DedupKey::new(&Event::new("England", "Australia", now, None), Milestone::Ended);

    let mut first = DedupStore::new(Arc::new(FileKvStore::new(tmp.path()).unwrap()));
    let mut second = DedupStore::new(Arc::new(FileKvStore::new(tmp.path()).unwrap()));

    first.insert(a.clone());
    second.insert(b.clone());
    first.flush().unwrap();
    second.flush().unwrap();

    assert!(second.contains(&a));
    assert!(second.contains(&b));
}
