//! Telegram Bot API notifier.
//!
//! Sends each alert with `sendMessage` using legacy Markdown, which is what
//! the alert renderer produces.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{NotifyError, Notifier};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

pub struct TelegramNotifier {
    client: reqwest::blocking::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    destination: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NotifyError::Setup(format!("failed to build HTTP client: {e}")))?;
        let chat_id = chat_id.into();
        Ok(Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token: bot_token.into(),
            destination: format!("telegram chat {chat_id}"),
            chat_id,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }
}

impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    fn destination(&self) -> &str {
        &self.destination
    }

    fn send(&self, message: &str) -> Result<(), NotifyError> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });

        // reqwest errors carry the URL, which contains the token.
        let resp = self
            .client
            .post(self.send_url())
            .json(&body)
            .send()
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = resp.status();
        let parsed: Option<ApiResponse> = resp.json().ok();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = parsed
                .and_then(|r| r.parameters)
                .and_then(|p| p.retry_after)
                .unwrap_or(60);
            return Err(NotifyError::RateLimited { retry_after_secs });
        }

        match parsed {
            Some(api) if status.is_success() && api.ok => {
                debug!(destination = %self.destination, "telegram message accepted");
                Ok(())
            }
            Some(api) => Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: api.description.unwrap_or_else(|| "no description".into()),
            }),
            None => Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: "unparseable response body".into(),
            }),
        }
    }
}
