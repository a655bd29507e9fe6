//! Telegram Bot API notifier.
//!
//! Alerts go out through `sendMessage` as MarkdownV2: bold title, body, and
//! a link line when the deep link is absolute.

use matchbell_core::config::DeliveryConfig;

use crate::traits::{NotificationRecord, Notifier, NotifyError};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Escapes special characters for Telegram MarkdownV2 parse mode.
///
/// Telegram requires these characters to be escaped with a preceding backslash
/// when using MarkdownV2: `_`, `*`, `[`, `]`, `(`, `)`, `~`, `` ` ``, `>`,
/// `#`, `+`, `-`, `=`, `|`, `{`, `}`, `.`, `!`
pub fn escape_markdown_v2(text: &str) -> String {
    let special = ['_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!'];
    let mut result = String::with_capacity(text.len() * 2);
    for ch in text.chars() {
        if special.contains(&ch) {
            result.push('\\');
        }
        result.push(ch);
    }
    result
}

/// Render a record as a MarkdownV2 message.
pub fn format_message(notification: &NotificationRecord) -> String {
    let mut text = format!(
        "*{}*\n{}",
        escape_markdown_v2(&notification.title),
        escape_markdown_v2(&notification.body)
    );
    if notification.deep_link.starts_with("http") {
        // Inside the URL part only `)` and `\` need escaping.
        let url = notification.deep_link.replace('\\', "\\\\").replace(')', "\\)");
        text.push_str(&format!("\n[View Match]({url})"));
    }
    text
}

/// Sends alerts via the Telegram Bot API.
#[derive(Debug)]
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    /// Creates a new `TelegramNotifier`.
    ///
    /// If `bot_token` starts with `${`, the value between `${` and `}` is
    /// resolved as an environment variable name. Returns
    /// [`NotifyError::Config`] if the token is empty or the env var is missing.
    pub fn new(bot_token: String, chat_id: String) -> Result<Self, NotifyError> {
        let resolved_token = if bot_token.starts_with("${") {
            let var_name = bot_token
                .strip_prefix("${")
                .and_then(|s| s.strip_suffix('}'))
                .ok_or_else(|| NotifyError::Config(format!("Malformed env var reference: {bot_token}")))?;
            std::env::var(var_name)
                .map_err(|_| NotifyError::Config(format!("Environment variable '{var_name}' is not set")))?
        } else {
            bot_token
        };

        if resolved_token.is_empty() {
            return Err(NotifyError::Config("Telegram bot token must not be empty".to_string()));
        }
        if chat_id.trim().is_empty() {
            return Err(NotifyError::Config("Telegram chat id must not be empty".to_string()));
        }

        Ok(Self {
            bot_token: resolved_token,
            chat_id,
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
        })
    }

    /// Build from the `delivery` config section; `None` when Telegram is not configured.
    pub fn from_config(config: &DeliveryConfig) -> Result<Option<Self>, NotifyError> {
        match (&config.telegram_bot_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) => Self::new(token.clone(), chat_id.clone()).map(Some),
            _ => Ok(None),
        }
    }

    /// Point at a different Bot API host (self-hosted API server, tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, notification: &NotificationRecord) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": format_message(notification),
            "parse_mode": "MarkdownV2",
            "disable_notification": false,
        });

        tracing::debug!(chat_id = %self.chat_id, tag = %notification.tag, "Sending Telegram notification");

        let response = self.client.post(&url).json(&body).send().await?;

        let status = response.status();
        let resp_body: serde_json::Value = response.json().await?;

        if resp_body.get("ok") == Some(&serde_json::Value::Bool(true)) {
            return Ok(());
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp_body
                .get("parameters")
                .and_then(|p| p.get("retry_after"))
                .and_then(|v| v.as_u64())
                .unwrap_or(30);
            return Err(NotifyError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let description = resp_body
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown Telegram API error");

        Err(NotifyError::Rejected(format!("Telegram API error: {description}")))
    }

    fn channel_name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::NotificationData;

    fn record(deep_link: &str) -> NotificationRecord {
        NotificationRecord {
            title: "🔴 LIVE NOW!".to_string(),
            body: "India vs Pakistan has started! Watch now!".to_string(),
            icon: String::new(),
            badge: String::new(),
            deep_link: deep_link.to_string(),
            tag: "match-started-x".to_string(),
            require_interaction: true,
            actions: Vec::new(),
            data: NotificationData {
                event_id: None,
                milestone: None,
                fixture: None,
                team1: None,
                team2: None,
                url: deep_link.to_string(),
            },
        }
    }

    #[test]
    fn test_escape_markdown_v2_special_chars() {
        let input = "Hello_World *bold* [link](url) ~strike~ `code` >quote #tag +plus -minus =eq |pipe {brace} .dot !bang";
        let escaped = escape_markdown_v2(input);
        assert_eq!(
            escaped,
            r"Hello\_World \*bold\* \[link\]\(url\) \~strike\~ \`code\` \>quote \#tag \+plus \-minus \=eq \|pipe \{brace\} \.dot \!bang"
        );
    }

    #[test]
    fn test_escape_markdown_v2_no_special_chars() {
        assert_eq!(escape_markdown_v2("Hello World 123"), "Hello World 123");
    }

    #[test]
    fn message_has_bold_title_and_link() {
        let text = format_message(&record("https://cric.example/#live"));
        assert!(text.starts_with("*🔴 LIVE NOW\\!*\n"));
        assert!(text.contains("Watch now\\!"));
        assert!(text.ends_with("[View Match](https://cric.example/#live)"));
    }

    #[test]
    fn relative_link_omitted() {
        let text = format_message(&record("/"));
        assert!(!text.contains("View Match"));
    }

    #[test]
    fn test_env_var_resolution() {
        std::env::set_var("MB_TEST_TG_BOT_TOKEN", "123:ABC");
        let notifier = TelegramNotifier::new("${MB_TEST_TG_BOT_TOKEN}".to_string(), "12345".to_string())
            .expect("should resolve env var");
        assert_eq!(notifier.bot_token, "123:ABC");
        assert_eq!(notifier.chat_id, "12345");
        std::env::remove_var("MB_TEST_TG_BOT_TOKEN");
    }

    #[test]
    fn test_env_var_missing() {
        let err = TelegramNotifier::new("${NONEXISTENT_VAR_TELEGRAM_XYZ}".to_string(), "12345".to_string())
            .unwrap_err()
            .to_string();
        assert!(err.contains("NONEXISTENT_VAR_TELEGRAM_XYZ"));
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = TelegramNotifier::new(String::new(), "12345".to_string())
            .unwrap_err()
            .to_string();
        assert!(err.contains("must not be empty"));
    }

    #[test]
    fn from_config_requires_both_fields() {
        let mut cfg = DeliveryConfig {
            webhook_url: None,
            telegram_bot_token: Some("123:ABC".to_string()),
            telegram_chat_id: None,
            icon_url: "/icon-192.png".to_string(),
            badge_url: "/icon-192.png".to_string(),
            deep_link_base: "/".to_string(),
        };
        assert!(TelegramNotifier::from_config(&cfg).unwrap().is_none());

        cfg.telegram_chat_id = Some("-100123".to_string());
        let notifier = TelegramNotifier::from_config(&cfg).unwrap().unwrap();
        assert_eq!(notifier.channel_name(), "telegram");
        assert_eq!(notifier.api_base, DEFAULT_API_BASE);
    }
}
