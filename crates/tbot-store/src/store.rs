//! SQLite-backed persistence.
//!
//! Split into focused submodules:
//! - `messages` — insert-once message records
//! - `users` — user records and the conversation-state slot
//! - `schedule` — weekly schedule reference data
//! - `announcements` — announcement lifecycle

mod announcements;
mod messages;
mod schedule;
mod users;


use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tbot_core::{config::StoreConfig, error::TbotError};
use tracing::info;

/// Persistent store backed by SQLite. Cheap to clone; all clones share the
/// same connection pool.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database and run migrations.
    pub async fn new(config: &StoreConfig) -> Result<Self, TbotError> {
        let in_memory = config.db_path == ":memory:";

        if !in_memory {
            if let Some(parent) = std::path::Path::new(&config.db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        TbotError::Store(format!("failed to create data dir: {e}"))
                    })?;
                }
            }
        }

        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}", config.db_path)
        };

        let mut opts = SqliteConnectOptions::from_str(&url)
            .map_err(|e| TbotError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true);
        if !in_memory {
            opts = opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);
        }

        // An in-memory database exists per connection, so the pool must not
        // hand out a second one.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect_with(opts)
            .await
            .map_err(|e| TbotError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;

        info!("Store initialized at {}", config.db_path);

        Ok(Self { pool })
    }

    /// Get a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), TbotError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| TbotError::Store(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[(
            "001_init",
            include_str!("../migrations/001_init.sql"),
        )];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        TbotError::Store(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| TbotError::Store(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| TbotError::Store(format!("failed to record migration {name}: {e}")))?;
        }

        Ok(())
    }
}
