//! EventFeed trait definition and shared error types.

use std::time::Duration;

use matchbell_core::{CoreError, Event};

/// Errors that can occur while fetching the match feed.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Feed returned HTTP {status}")]
    Status { status: u16 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed feed document: {0}")]
    Parse(String),

    #[error("Invalid match at index {index}: {source}")]
    InvalidMatch {
        index: usize,
        #[source]
        source: CoreError,
    },
}

impl FeedError {
    /// Whether this failure came from the network rather than the document.
    pub fn is_network(&self) -> bool {
        matches!(self, FeedError::Http(_) | FeedError::Timeout(_) | FeedError::Status { .. })
    }
}

/// Source of the current match schedule.
///
/// Implementations are stateless: every call returns a fresh snapshot that
/// supersedes the previous one.
#[async_trait::async_trait]
pub trait EventFeed: Send + Sync {
    /// Fetch the full list of scheduled matches.
    async fn fetch(&self) -> Result<Vec<Event>, FeedError>;

    /// Human-readable name for logs (e.g., the endpoint host).
    fn source_name(&self) -> &str;
}
