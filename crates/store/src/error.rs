use thiserror::Error;

/// Errors produced by [`KvStore`](crate::KvStore) backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid record name: {0:?}")]
    InvalidRecord(String),
}

/// Record names become file stems, so keep them to a safe alphabet.
pub(crate) fn record_filename(record: &str) -> Result<String, StoreError> {
    let valid = !record.is_empty()
        && record
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(StoreError::InvalidRecord(record.to_string()));
    }
    Ok(format!("{record}.json"))
}
