//! Telegram Bot API transport.
//!
//! Long polling via `getUpdates`, sends via `sendMessage` with the payload in
//! percent-encoded query parameters.
//! Docs: <https://core.telegram.org/bots/api>


use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tbot_core::{config::TelegramConfig, error::TbotError, traits::Transport, update::Update};
use tracing::debug;

/// Response envelope common to all Bot API calls.
#[derive(Debug, Deserialize)]
struct TgResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Telegram transport using the Bot API with long polling.
pub struct TelegramTransport {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
}

impl TelegramTransport {
    /// Create a new Telegram transport from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TbotError> {
        let mut query: Vec<(&str, String)> = vec![
            ("timeout", self.config.poll_timeout_secs.to_string()),
            ("allowed_updates", r#"["message"]"#.to_string()),
        ];
        if let Some(offset) = offset {
            debug!("update offset: {offset}");
            query.push(("offset", offset.to_string()));
        }

        let resp = self
            .client
            .get(format!("{}/getUpdates", self.base_url))
            .query(&query)
            // Client-side bound strictly above the server-side long-poll wait.
            .timeout(Duration::from_secs(self.config.poll_timeout_secs + 10))
            .send()
            .await
            .map_err(|e| TbotError::Transport(format!("telegram poll failed: {e}")))?;

        let body: TgResponse<Vec<Update>> = resp
            .json()
            .await
            .map_err(|e| TbotError::Transport(format!("telegram poll parse failed: {e}")))?;

        if !body.ok {
            return Err(TbotError::Transport(format!(
                "telegram getUpdates error: {}",
                body.description.unwrap_or_default()
            )));
        }

        Ok(body.result.unwrap_or_default())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TbotError> {
        let resp = self
            .client
            .get(format!("{}/sendMessage", self.base_url))
            .query(&[("chat_id", chat_id.to_string().as_str()), ("text", text)])
            .send()
            .await
            .map_err(|e| TbotError::Transport(format!("telegram send failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(TbotError::Transport(format!(
                "telegram send failed ({status}): {error_text}"
            )));
        }

        Ok(())
    }
}
