//! TOML configuration, with env-var overrides for secrets.

use chrono::{FixedOffset, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::TbotError;

/// Top-level tbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Pause between main-loop iterations. Must stay well under the
    /// broadcast window width so no window is skipped over.
    #[serde(default = "default_loop_delay")]
    pub loop_delay_ms: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            loop_delay_ms: default_loop_delay(),
        }
    }
}

/// Telegram transport config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token. Falls back to the `TELEGRAM_BOT_TOKEN` env var.
    #[serde(default)]
    pub bot_token: String,
    /// Long-poll wait passed to `getUpdates`.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Persistence config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path; `:memory:` for an in-memory store.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

/// Broadcast engine config: time windows, audience pacing, timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Fixed UTC offset of the bot's local time, in hours (Cairo = +2).
    #[serde(default = "default_utc_offset")]
    pub utc_offset_hours: i32,
    /// Weekdays with a schedule to announce, lowercase English names.
    #[serde(default = "default_study_days")]
    pub study_days: Vec<String>,
    /// Daily trigger for the schedule reminder, "HH:MM:SS" local time.
    #[serde(default = "default_schedule_time")]
    pub schedule_time: String,
    /// Daily trigger for the announcement sweep, "HH:MM:SS" local time.
    #[serde(default = "default_announce_time")]
    pub announce_time: String,
    /// Half-width of the tolerance window around each trigger.
    #[serde(default = "default_window_tolerance")]
    pub window_tolerance_secs: u32,
    /// Delay between consecutive sends during fan-out.
    #[serde(default = "default_send_spacing")]
    pub send_spacing_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset(),
            study_days: default_study_days(),
            schedule_time: default_schedule_time(),
            announce_time: default_announce_time(),
            window_tolerance_secs: default_window_tolerance(),
            send_spacing_ms: default_send_spacing(),
        }
    }
}

impl BroadcastConfig {
    /// The bot's fixed local timezone.
    pub fn timezone(&self) -> Result<FixedOffset, TbotError> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600)
            .ok_or_else(|| TbotError::Config(format!("invalid utc offset: {}", self.utc_offset_hours)))
    }

    /// Parse the configured study days into chrono weekdays.
    pub fn study_days(&self) -> Result<Vec<Weekday>, TbotError> {
        self.study_days
            .iter()
            .map(|day| {
                day.parse::<Weekday>()
                    .map_err(|_| TbotError::Config(format!("invalid study day: {day}")))
            })
            .collect()
    }

    pub fn schedule_trigger(&self) -> Result<NaiveTime, TbotError> {
        parse_trigger(&self.schedule_time)
    }

    pub fn announce_trigger(&self) -> Result<NaiveTime, TbotError> {
        parse_trigger(&self.announce_time)
    }
}

/// API credentials for the command handlers. All optional: a handler with a
/// missing key answers with its user-facing error string instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// AccuWeather API key (`ACCUWEATHER_API_KEY`).
    #[serde(default)]
    pub accuweather_key: String,
    /// Yandex Translate API key (`YANDEX_TRANSLATE_TOKEN`).
    #[serde(default)]
    pub yandex_key: String,
    /// OCR.space API key (`OCR_API_KEY`).
    #[serde(default)]
    pub ocr_key: String,
    /// Twitter API bearer token (`TWITTER_BEARER_TOKEN`).
    #[serde(default)]
    pub twitter_bearer: String,
}

fn parse_trigger(value: &str) -> Result<NaiveTime, TbotError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .map_err(|e| TbotError::Config(format!("invalid trigger time {value:?}: {e}")))
}

fn default_name() -> String {
    "tbot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_loop_delay() -> u64 {
    500
}

fn default_poll_timeout() -> u64 {
    20
}

fn default_db_path() -> String {
    "tbot.db".to_string()
}

fn default_utc_offset() -> i32 {
    2
}

fn default_study_days() -> Vec<String> {
    ["saturday", "sunday", "monday", "tuesday", "wednesday"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_schedule_time() -> String {
    "08:00:00".to_string()
}

fn default_announce_time() -> String {
    "07:00:00".to_string()
}

fn default_window_tolerance() -> u32 {
    15
}

fn default_send_spacing() -> u64 {
    500
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. Secrets left empty in
/// the file are filled from the environment.
pub fn load(path: &str) -> Result<Config, TbotError> {
    let path = Path::new(path);
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TbotError::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| TbotError::Config(format!("failed to parse config: {e}")))?
    } else {
        info!("Config file not found at {}, using defaults", path.display());
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    let overrides: [(&str, &mut String); 5] = [
        ("TELEGRAM_BOT_TOKEN", &mut config.telegram.bot_token),
        ("ACCUWEATHER_API_KEY", &mut config.commands.accuweather_key),
        ("YANDEX_TRANSLATE_TOKEN", &mut config.commands.yandex_key),
        ("OCR_API_KEY", &mut config.commands.ocr_key),
        ("TWITTER_BEARER_TOKEN", &mut config.commands.twitter_bearer),
    ];
    for (var, slot) in overrides {
        if slot.is_empty() {
            if let Ok(value) = std::env::var(var) {
                *slot = value;
            }
        }
    }
}
