//! User records and the per-user conversation-state slot.

use super::Store;
use tbot_core::{
    domain::{CommandState, User},
    error::TbotError,
};

type UserRow = (
    i64,
    bool,
    bool,
    String,
    Option<String>,
    Option<String>,
    String,
    bool,
    i64,
    i64,
    Option<String>,
    Option<i64>,
);

const USER_COLUMNS: &str = "id, is_bot, is_admin, first_name, last_name, username, \
     language_code, active, created_at, updated_at, last_command, chat_id";

fn row_to_user(row: UserRow) -> User {
    let (
        id,
        is_bot,
        is_admin,
        first_name,
        last_name,
        username,
        language_code,
        active,
        created_at,
        updated_at,
        last_command,
        chat_id,
    ) = row;
    User {
        id,
        is_bot,
        is_admin,
        first_name,
        last_name,
        username,
        language_code,
        active,
        created_at,
        updated_at,
        state: CommandState::from_db(last_command),
        chat_id,
    }
}

impl Store {
    /// Fetch a user by id.
    pub async fn get_user(&self, id: i64) -> Result<Option<User>, TbotError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| TbotError::Store(format!("get user failed: {e}")))?;

        Ok(row.map(row_to_user))
    }

    /// Insert a first-seen user.
    pub async fn add_user(&self, user: &User) -> Result<(), TbotError> {
        sqlx::query(
            "INSERT INTO users (id, is_bot, is_admin, first_name, last_name, username, \
             language_code, active, created_at, updated_at, last_command, chat_id) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(user.is_bot)
        .bind(user.is_admin)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.username)
        .bind(&user.language_code)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.state.as_db())
        .bind(user.chat_id)
        .execute(&self.pool)
        .await
        .map_err(|e| TbotError::Store(format!("add user failed: {e}")))?;

        Ok(())
    }

    /// Bind the chat id of a user that predates chat binding.
    pub async fn set_user_chat_id(
        &self,
        id: i64,
        updated_at: i64,
        chat_id: i64,
    ) -> Result<(), TbotError> {
        sqlx::query("UPDATE users SET chat_id = ?, updated_at = ? WHERE id = ?")
            .bind(chat_id)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TbotError::Store(format!("set chat_id failed: {e}")))?;

        Ok(())
    }

    /// Persist the user's conversation state (the last_command slot).
    pub async fn set_user_state(
        &self,
        id: i64,
        updated_at: i64,
        state: &CommandState,
    ) -> Result<(), TbotError> {
        sqlx::query("UPDATE users SET last_command = ?, updated_at = ? WHERE id = ?")
            .bind(state.as_db())
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TbotError::Store(format!("set user state failed: {e}")))?;

        Ok(())
    }

    /// Toggle the active flag. Only the /start and /stop handlers call this.
    pub async fn set_user_status(
        &self,
        id: i64,
        updated_at: i64,
        active: bool,
    ) -> Result<(), TbotError> {
        sqlx::query("UPDATE users SET active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| TbotError::Store(format!("set user status failed: {e}")))?;

        Ok(())
    }

    /// All known users; broadcast filters for active ones with a bound chat.
    pub async fn get_users(&self) -> Result<Vec<User>, TbotError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| TbotError::Store(format!("get users failed: {e}")))?;

        Ok(rows.into_iter().map(row_to_user).collect())
    }
}
