//! JSON-over-HTTP match feed.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use matchbell_core::config::FeedConfig;
use matchbell_core::Event;

use crate::document::parse_document;
use crate::traits::{EventFeed, FeedError};

/// Fetches the match list with a read-only GET to a configured endpoint.
///
/// Every request is bounded by `timeout`; an expired request surfaces as
/// [`FeedError::Timeout`] so the scheduler can skip the tick.
#[derive(Debug)]
pub struct HttpEventFeed {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpEventFeed {
    /// Create a feed for `url` with the given request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(FeedError::Config("feed URL must not be empty".to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url,
            timeout,
            client,
        })
    }

    /// Construct from the `feed` config section.
    pub fn from_config(config: &FeedConfig) -> Result<Self, FeedError> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| FeedError::Config("FEED_URL is not set".to_string()))?;
        Self::new(url, Duration::from_secs(config.timeout_secs.max(1)))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, e: reqwest::Error) -> FeedError {
        if e.is_timeout() {
            FeedError::Timeout(self.timeout)
        } else {
            FeedError::Http(e)
        }
    }
}

#[async_trait]
impl EventFeed for HttpEventFeed {
    async fn fetch(&self) -> Result<Vec<Event>, FeedError> {
        let start = Instant::now();

        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %self.url, %status, "feed returned non-2xx status");
            return Err(FeedError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        let events = parse_document(&body)?;

        tracing::debug!(
            url = %self.url,
            events = events.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "feed fetched"
        );
        Ok(events)
    }

    fn source_name(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_url_rejected() {
        let result = HttpEventFeed::new("  ", Duration::from_secs(1));
        assert!(matches!(result, Err(FeedError::Config(_))));
    }

    #[test]
    fn from_config_requires_url() {
        let cfg = FeedConfig {
            url: None,
            timeout_secs: 5,
        };
        match HttpEventFeed::from_config(&cfg) {
            Err(FeedError::Config(msg)) => assert!(msg.contains("FEED_URL")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn from_config_uses_timeout() {
        let cfg = FeedConfig {
            url: Some("http://127.0.0.1:9/matches".to_string()),
            timeout_secs: 7,
        };
        let feed = HttpEventFeed::from_config(&cfg).unwrap();
        assert_eq!(feed.timeout(), Duration::from_secs(7));
        assert_eq!(feed.source_name(), "http://127.0.0.1:9/matches");
    }
}
