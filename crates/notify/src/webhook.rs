//! Generic HTTP webhook notifier.
//!
//! Delivers alert records as JSON to a configured URL, with optional custom
//! headers and a request body template rendered over the record.

use std::collections::HashMap;
use std::sync::Arc;

use matchbell_core::config::DeliveryConfig;

use crate::templating::TemplateRenderer;
use crate::traits::{NotificationRecord, Notifier, NotifyError};

/// Delivers alerts as JSON over HTTP to a configured endpoint.
///
/// Environment variable references (`${VAR_NAME}`) in the URL and header
/// values are resolved at construction time.
#[derive(Debug)]
pub struct WebhookNotifier {
    url: String,
    method: reqwest::Method,
    headers: HashMap<String, String>,
    /// When set, rendered with the record's fields as context; otherwise the
    /// record is serialized as JSON directly.
    body_template: Option<String>,
    renderer: Arc<TemplateRenderer>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a new webhook notifier. `method` defaults to `POST` when `None`.
    pub fn new(
        url: String,
        method: Option<reqwest::Method>,
        headers: HashMap<String, String>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, NotifyError> {
        let resolved_url = resolve_env_vars(&url)?;

        let mut resolved_headers = HashMap::with_capacity(headers.len());
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), resolve_env_vars(value)?);
        }

        if let Some(ref tmpl) = body_template {
            renderer
                .validate(tmpl)
                .map_err(|e| NotifyError::Config(format!("invalid body template: {e}")))?;
        }

        Ok(Self {
            url: resolved_url,
            method: method.unwrap_or(reqwest::Method::POST),
            headers: resolved_headers,
            body_template,
            renderer,
            client: reqwest::Client::new(),
        })
    }

    /// Construct from string-level options; `method` is parsed case-insensitively.
    pub fn with_options(
        url: String,
        method: Option<String>,
        headers: Option<HashMap<String, String>>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, NotifyError> {
        let parsed_method = match method {
            Some(m) => m
                .to_uppercase()
                .parse::<reqwest::Method>()
                .map(Some)
                .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}")))?,
            None => None,
        };

        Self::new(url, parsed_method, headers.unwrap_or_default(), body_template, renderer)
    }

    /// Build from the `delivery` config section; `None` when no webhook URL is set.
    pub fn from_config(config: &DeliveryConfig, renderer: Arc<TemplateRenderer>) -> Result<Option<Self>, NotifyError> {
        match &config.webhook_url {
            Some(url) => Self::with_options(url.clone(), None, None, None, renderer).map(Some),
            None => Ok(None),
        }
    }

    fn render_body(&self, notification: &NotificationRecord) -> Result<String, NotifyError> {
        match &self.body_template {
            Some(tmpl) => self.renderer.render(tmpl, notification),
            None => serde_json::to_string(notification)
                .map_err(|e| NotifyError::Config(format!("failed to serialize notification: {e}"))),
        }
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &NotificationRecord) -> Result<(), NotifyError> {
        let body = self.render_body(notification)?;

        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(url = %self.url, %status, body = %body_text, "webhook returned non-2xx status");
            return Err(NotifyError::Rejected(format!("webhook returned {status}: {body_text}")));
        }

        tracing::debug!(
            url = %self.url,
            method = %self.method,
            status = %status,
            tag = %notification.tag,
            "webhook notification delivered"
        );

        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

/// Resolve `${VAR_NAME}` patterns in a string using `std::env::var`.
fn resolve_env_vars(input: &str) -> Result<String, NotifyError> {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var_name.push(c);
            }
            if !closed {
                return Err(NotifyError::Config(format!("unclosed env var reference in: {input}")));
            }
            let value = std::env::var(&var_name)
                .map_err(|_| NotifyError::Config(format!("env var not found: {var_name}")))?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}
