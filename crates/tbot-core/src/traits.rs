use crate::{error::TbotError, update::Update};
use async_trait::async_trait;

/// Messaging transport trait — the bot's connection to the outside world.
///
/// The Telegram Bot API is the first implementation; tests use an in-memory
/// fake. The transport holds no conversation state of its own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Long-poll for updates with sequence numbers at or above `offset`.
    ///
    /// Blocks up to the transport's configured wait before returning an
    /// empty batch. `None` means "from the oldest retained update".
    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TbotError>;

    /// Push a text message to a chat. Fire-and-forget at the call sites:
    /// failures are logged, never retried.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TbotError>;
}

/// How a command is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Executes immediately, returns a display string. Always one-shot.
    NoArg,
    /// Sends a hint, then consumes the user's next free-text message.
    TakesInput,
    /// /start and /stop: flips the user's active flag, no reply.
    Lifecycle { activate: bool },
}

/// Registry entry for one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub name: &'static str,
    pub kind: CommandKind,
    /// Sent when the command awaits a follow-up argument.
    pub hint: Option<&'static str>,
}

impl CommandSpec {
    pub fn takes_input(&self) -> bool {
        self.kind == CommandKind::TakesInput
    }
}

/// Command registry trait — maps command names to metadata and handlers.
///
/// The gateway depends on this seam only; the concrete handlers (weather,
/// translate, ...) live in their own crate and tests substitute canned ones.
#[async_trait]
pub trait CommandHost: Send + Sync {
    /// Look up a command by its full name, e.g. "/translate".
    fn lookup(&self, name: &str) -> Option<CommandSpec>;

    /// Run a no-argument command, returning its display string.
    async fn run_no_arg(&self, name: &str) -> Result<String, TbotError>;

    /// Run an input-taking command with the user's free-text argument.
    async fn run_with_arg(&self, name: &str, arg: &str) -> Result<String, TbotError>;
}
