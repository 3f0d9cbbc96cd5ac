//! English → Arabic translation via the Yandex Translate API.

use super::CommandClient;
use serde::Deserialize;
use tbot_core::error::TbotError;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    text: Vec<String>,
}

impl CommandClient {
    /// Translate `message` from English to Arabic.
    pub(crate) async fn translate(&self, message: &str) -> String {
        if self.config.yandex_key.is_empty() {
            return "Translation is not configured.".to_string();
        }
        match self.try_translate(message).await {
            Ok(result) => result,
            Err(e) => {
                warn!("translate failed: {e}");
                "Error happened, try again later.".to_string()
            }
        }
    }

    async fn try_translate(&self, message: &str) -> Result<String, TbotError> {
        let resp = self
            .client
            .post("https://translate.yandex.net/api/v1.5/tr.json/translate")
            .query(&[
                ("key", self.config.yandex_key.as_str()),
                ("text", message),
                ("lang", "en-ar"),
            ])
            .send()
            .await
            .map_err(|e| TbotError::Command(format!("yandex request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(TbotError::Command(format!(
                "yandex returned {}",
                resp.status()
            )));
        }

        let body: TranslateResponse = resp
            .json()
            .await
            .map_err(|e| TbotError::Command(format!("yandex parse failed: {e}")))?;

        body.text
            .into_iter()
            .next()
            .ok_or_else(|| TbotError::Command("yandex returned no translations".to_string()))
    }
}
