use std::sync::Arc;

use matchbell_core::NotificationSettings;

use crate::error::StoreError;
use crate::kv::KvStore;

/// Record name holding the user's notification settings.
pub const SETTINGS_RECORD: &str = "settings";

/// Load/save [`NotificationSettings`] as a single record.
pub struct SettingsStore {
    backend: Arc<dyn KvStore>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self { backend }
    }

    /// Persisted settings, `None` when never saved.
    ///
    /// Missing fields take their defaults, so older records stay readable.
    pub fn load(&self) -> Result<Option<NotificationSettings>, StoreError> {
        match self.backend.get(SETTINGS_RECORD)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, settings: &NotificationSettings) -> Result<(), StoreError> {
        self.backend.put(SETTINGS_RECORD, &serde_json::to_value(settings)?)
    }
}
