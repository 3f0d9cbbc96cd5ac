//! Announcement lifecycle: '' → once → twice, or cancelled → twice.

use super::Store;
use chrono::NaiveDateTime;
use tbot_core::{
    domain::{Announcement, AnnouncementState},
    error::TbotError,
};

/// Storage format of `scheduled_at`.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Store {
    /// All announcements, oldest first.
    pub async fn get_announcements(&self) -> Result<Vec<Announcement>, TbotError> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            "SELECT id, description, scheduled_at, done FROM announcements ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TbotError::Store(format!("get announcements failed: {e}")))?;

        rows.into_iter()
            .map(|(id, description, scheduled_at, done)| {
                let scheduled_at = NaiveDateTime::parse_from_str(&scheduled_at, DATETIME_FORMAT)
                    .map_err(|e| {
                        TbotError::Store(format!(
                            "announcement {id} has malformed scheduled_at {scheduled_at:?}: {e}"
                        ))
                    })?;
                Ok(Announcement {
                    id,
                    description,
                    scheduled_at,
                    state: AnnouncementState::from_db(&done),
                })
            })
            .collect()
    }

    /// Create an announcement in the not-yet-broadcast state.
    pub async fn add_announcement(
        &self,
        description: &str,
        scheduled_at: NaiveDateTime,
    ) -> Result<i64, TbotError> {
        let result = sqlx::query(
            "INSERT INTO announcements (description, scheduled_at, done) VALUES (?, ?, '')",
        )
        .bind(description)
        .bind(scheduled_at.format(DATETIME_FORMAT).to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| TbotError::Store(format!("add announcement failed: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Advance an announcement's delivery state.
    pub async fn update_announcement(
        &self,
        id: i64,
        state: AnnouncementState,
    ) -> Result<(), TbotError> {
        sqlx::query("UPDATE announcements SET done = ? WHERE id = ?")
            .bind(state.as_db())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TbotError::Store(format!("update announcement failed: {e}")))?;

        Ok(())
    }

    /// Mark an announcement cancelled. Only possible before it was ever
    /// broadcast; returns whether a row changed.
    pub async fn cancel_announcement(&self, id: i64) -> Result<bool, TbotError> {
        let result = sqlx::query("UPDATE announcements SET done = 'cancelled' WHERE id = ? AND done = ''")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TbotError::Store(format!("cancel announcement failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
