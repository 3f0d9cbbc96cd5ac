//! Insert-once message records.

use super::Store;
use tbot_core::{domain::Message, error::TbotError};

impl Store {
    /// Fetch a message by id.
    pub async fn get_message(&self, id: i64) -> Result<Option<Message>, TbotError> {
        let row: Option<(i64, i64, i64, i64, i64, String)> = sqlx::query_as(
            "SELECT id, update_id, user_id, chat_id, date, text FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TbotError::Store(format!("get message failed: {e}")))?;

        Ok(row.map(|(id, update_id, user_id, chat_id, date, text)| Message {
            id,
            update_id,
            user_id,
            chat_id,
            date,
            text,
        }))
    }

    /// Store a message. A row with the same id already present is left
    /// untouched; messages are immutable once stored.
    pub async fn add_message(&self, msg: &Message) -> Result<(), TbotError> {
        sqlx::query(
            "INSERT OR IGNORE INTO messages (id, update_id, user_id, chat_id, date, text) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(msg.id)
        .bind(msg.update_id)
        .bind(msg.user_id)
        .bind(msg.chat_id)
        .bind(msg.date)
        .bind(&msg.text)
        .execute(&self.pool)
        .await
        .map_err(|e| TbotError::Store(format!("add message failed: {e}")))?;

        Ok(())
    }
}
