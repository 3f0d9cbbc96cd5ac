//! Durable records and their state machines.

use chrono::NaiveDateTime;

/// A stored inbound message.
///
/// Immutable once stored: created on first sight of an update, never mutated,
/// never deleted. `id` is unique in the store; a duplicate insert is silently
/// ignored, not overwritten.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    /// Sequence number of the update that carried this message.
    pub update_id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    /// Unix timestamp as delivered by the transport.
    pub date: i64,
    pub text: String,
}

/// A known user of the bot.
///
/// Created on the first message from a previously-unseen user id. `chat_id`
/// is bound lazily on the first update where it is present and is stable
/// afterwards. `active` toggles only through the /start and /stop commands.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub is_bot: bool,
    pub is_admin: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: String,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    /// The single-slot conversation state.
    pub state: CommandState,
    pub chat_id: Option<i64>,
}

/// Per-user conversation state: at most one pending command at a time.
///
/// Persisted as a nullable TEXT column; `AwaitingArgument` only ever holds a
/// command that takes input, so "pending no-arg command" is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    AwaitingArgument(String),
}

impl CommandState {
    /// Database encoding: `Idle` is NULL, a pending command is its name.
    pub fn as_db(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::AwaitingArgument(cmd) => Some(cmd),
        }
    }

    pub fn from_db(value: Option<String>) -> Self {
        match value {
            Some(cmd) if !cmd.is_empty() => Self::AwaitingArgument(cmd),
            _ => Self::Idle,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

/// One line of the weekly schedule. Read-only reference data.
#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub weekday: String,
    /// Display time, e.g. "10:00".
    pub time: String,
    pub description: String,
}

/// Delivery state of an announcement.
///
/// One-way machine: `Unset → Once → Twice`, with a parallel
/// `Cancelled → Twice` path. `Twice` is terminal; the announcement is inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementState {
    Unset,
    Once,
    Twice,
    Cancelled,
}

impl AnnouncementState {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Unset => "",
            Self::Once => "once",
            Self::Twice => "twice",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn from_db(value: &str) -> Self {
        match value {
            "once" => Self::Once,
            "twice" => Self::Twice,
            "cancelled" => Self::Cancelled,
            _ => Self::Unset,
        }
    }

    /// Terminal announcements never broadcast again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Twice)
    }
}

/// A one-off announcement broadcast at most twice.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub id: i64,
    pub description: String,
    /// When the announced event takes place.
    pub scheduled_at: NaiveDateTime,
    pub state: AnnouncementState,
}
