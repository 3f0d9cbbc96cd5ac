//! Expression evaluation via the math.js web service.

use super::CommandClient;
use tbot_core::error::TbotError;
use tracing::warn;

impl CommandClient {
    /// Evaluate `expr` and return a display string.
    pub(crate) async fn calculate(&self, expr: &str) -> String {
        match self.try_calculate(expr).await {
            Ok(result) => result,
            Err(e) => {
                warn!("calculate failed: {e}");
                "Error happened. Use a valid expression".to_string()
            }
        }
    }

    async fn try_calculate(&self, expr: &str) -> Result<String, TbotError> {
        let resp = self
            .client
            .get("https://api.mathjs.org/v4/")
            .query(&[("expr", expr)])
            .send()
            .await
            .map_err(|e| TbotError::Command(format!("mathjs request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(TbotError::Command(format!(
                "mathjs returned {}",
                resp.status()
            )));
        }

        let result = resp
            .text()
            .await
            .map_err(|e| TbotError::Command(format!("mathjs read failed: {e}")))?;

        Ok(format!("Result: {result}"))
    }
}
