//! Current weather via the AccuWeather hourly forecast API.

use super::CommandClient;
use serde::Deserialize;
use tbot_core::error::TbotError;
use tracing::warn;

/// AccuWeather location key for Zagazig, Egypt.
const LOCATION_KEY: i64 = 127335;
const LOCATION: &str = "Zagazig, Egypt";

#[derive(Debug, Deserialize)]
struct HourlyForecast {
    #[serde(rename = "Temperature")]
    temperature: ForecastValue,
    #[serde(rename = "IconPhrase")]
    icon_phrase: String,
}

#[derive(Debug, Deserialize)]
struct ForecastValue {
    #[serde(rename = "Value")]
    value: f64,
}

impl CommandClient {
    /// Current weather in the bot's home town.
    pub(crate) async fn weather(&self) -> String {
        if self.config.accuweather_key.is_empty() {
            return "Weather is not configured.".to_string();
        }
        match self.try_weather().await {
            Ok(result) => result,
            Err(e) => {
                warn!("weather failed: {e}");
                "Error happened, try again later.".to_string()
            }
        }
    }

    async fn try_weather(&self) -> Result<String, TbotError> {
        let url = format!(
            "http://dataservice.accuweather.com/forecasts/v1/hourly/1hour/{LOCATION_KEY}"
        );
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("apikey", self.config.accuweather_key.as_str()),
                ("metric", "true"),
            ])
            .send()
            .await
            .map_err(|e| TbotError::Command(format!("accuweather request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(TbotError::Command(format!(
                "accuweather returned {}",
                resp.status()
            )));
        }

        let forecasts: Vec<HourlyForecast> = resp
            .json()
            .await
            .map_err(|e| TbotError::Command(format!("accuweather parse failed: {e}")))?;

        let forecast = forecasts
            .into_iter()
            .next()
            .ok_or_else(|| TbotError::Command("accuweather returned no forecast".to_string()))?;

        Ok(format!(
            "Weather is {} in {LOCATION}.\nAnd it currently feels like {} °C",
            forecast.icon_phrase, forecast.temperature.value
        ))
    }
}
