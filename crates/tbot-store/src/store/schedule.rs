//! Weekly schedule reference data.

use super::Store;
use tbot_core::{domain::ScheduleEntry, error::TbotError};

impl Store {
    /// Schedule entries for a weekday (lowercase English name), ordered by
    /// time of day.
    pub async fn get_schedule_of(&self, weekday: &str) -> Result<Vec<ScheduleEntry>, TbotError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT weekday, time, description FROM schedule WHERE weekday = ? ORDER BY time",
        )
        .bind(weekday)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TbotError::Store(format!("get schedule failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(weekday, time, description)| ScheduleEntry {
                weekday,
                time,
                description,
            })
            .collect())
    }

    /// Insert a schedule entry (operator tooling; the bot only reads).
    pub async fn add_schedule_entry(&self, entry: &ScheduleEntry) -> Result<(), TbotError> {
        sqlx::query("INSERT INTO schedule (weekday, time, description) VALUES (?, ?, ?)")
            .bind(&entry.weekday)
            .bind(&entry.time)
            .bind(&entry.description)
            .execute(&self.pool)
            .await
            .map_err(|e| TbotError::Store(format!("add schedule entry failed: {e}")))?;

        Ok(())
    }
}
