//! Posting to the group's Twitter account (API v2).

use super::CommandClient;
use serde::Deserialize;
use tbot_core::error::TbotError;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

impl CommandClient {
    /// Tweet `text` and return a link to the new tweet.
    pub(crate) async fn tweet(&self, text: &str) -> String {
        if self.config.twitter_bearer.is_empty() {
            return "Tweeting is not configured.".to_string();
        }
        match self.try_tweet(text).await {
            Ok(result) => result,
            Err(TweetError::Duplicate) => "Do not repeat the same tweet".to_string(),
            Err(TweetError::Other(e)) => {
                warn!("tweet failed: {e}");
                "Error happened, try again later.".to_string()
            }
        }
    }

    async fn try_tweet(&self, text: &str) -> Result<String, TweetError> {
        let resp = self
            .client
            .post("https://api.twitter.com/2/tweets")
            .header(
                "Authorization",
                format!("Bearer {}", self.config.twitter_bearer),
            )
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| TweetError::Other(TbotError::Command(format!("twitter request failed: {e}"))))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // The API rejects an identical tweet with a 403 mentioning "duplicate".
            if body.to_lowercase().contains("duplicate") {
                return Err(TweetError::Duplicate);
            }
            return Err(TweetError::Other(TbotError::Command(format!(
                "twitter returned {status}: {body}"
            ))));
        }

        let body: TweetResponse = resp
            .json()
            .await
            .map_err(|e| TweetError::Other(TbotError::Command(format!("twitter parse failed: {e}"))))?;

        Ok(format!(
            "Your tweet: https://twitter.com/tbot60/status/{}",
            body.data.id
        ))
    }
}

enum TweetError {
    Duplicate,
    Other(TbotError),
}
