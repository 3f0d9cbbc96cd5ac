//! Telegram Bot API update deserialization types.
//!
//! Docs: <https://core.telegram.org/bots/api#update>

use serde::Deserialize;

/// One inbound event from the transport, identified by a monotonically
/// increasing sequence number. `message` is absent for update kinds the bot
/// does not handle (edited messages, channel posts, ...).
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
}

/// The message payload of an update.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub from: Option<Sender>,
    pub chat: Chat,
    /// Unix timestamp set by the transport.
    pub date: i64,
    /// Absent for non-text messages (stickers, photos, ...).
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}
