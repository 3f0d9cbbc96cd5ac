//! Text extraction from images via the OCR.space API.

use super::CommandClient;
use serde::Deserialize;
use tbot_core::error::TbotError;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(rename = "ParsedResults")]
    parsed_results: Option<Vec<ParsedResult>>,
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText")]
    parsed_text: String,
}

impl CommandClient {
    /// Extract the text of the image behind `url`.
    pub(crate) async fn ocr_url(&self, url: &str) -> String {
        if self.config.ocr_key.is_empty() {
            return "OCR is not configured.".to_string();
        }
        match self.try_ocr(url).await {
            Ok(result) => result,
            Err(e) => {
                warn!("ocr failed: {e}");
                "Error. Please provide a valid URL".to_string()
            }
        }
    }

    async fn try_ocr(&self, url: &str) -> Result<String, TbotError> {
        let resp = self
            .client
            .post("https://api.ocr.space/parse/image")
            .form(&[
                ("url", url),
                ("apikey", self.config.ocr_key.as_str()),
                ("language", "eng"),
                ("isOverlayRequired", "false"),
            ])
            .send()
            .await
            .map_err(|e| TbotError::Command(format!("ocr request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(TbotError::Command(format!(
                "ocr returned {}",
                resp.status()
            )));
        }

        let body: OcrResponse = resp
            .json()
            .await
            .map_err(|e| TbotError::Command(format!("ocr parse failed: {e}")))?;

        body.parsed_results
            .and_then(|results| results.into_iter().next())
            .map(|result| result.parsed_text)
            .ok_or_else(|| TbotError::Command("ocr returned no parsed results".to_string()))
    }
}
