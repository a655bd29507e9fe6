//! Persistence for scheduler state.
//!
//! State lives in a whole-value key-value store ([`KvStore`]) holding two
//! records: `dedup_keys` (list of strings) and `settings` (object). A
//! directory of JSON files backs it in production; tests use the in-memory
//! variant.

mod dedup;
mod error;
mod kv;
mod settings;

pub use dedup::{DedupKey, DedupStore, DEDUP_RECORD};
pub use error::StoreError;
pub use kv::{FileKvStore, KvStore, MemoryKvStore};
pub use settings::{SettingsStore, SETTINGS_RECORD};
