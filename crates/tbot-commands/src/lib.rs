//! # tbot-commands
//!
//! The command registry and the stateless request/response handlers behind
//! it. Each handler maps upstream failures to the string the user sees; the
//! gateway never has to care why a command went wrong.

mod calculate;
mod ocr;
mod translate;
mod tweet;
mod weather;

use async_trait::async_trait;
use tbot_core::{
    config::CommandsConfig,
    error::TbotError,
    traits::{CommandHost, CommandKind, CommandSpec},
};

/// All commands the bot understands.
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "/help",
        kind: CommandKind::NoArg,
        hint: None,
    },
    CommandSpec {
        name: "/weather",
        kind: CommandKind::NoArg,
        hint: None,
    },
    CommandSpec {
        name: "/translate",
        kind: CommandKind::TakesInput,
        hint: Some("Send the English text to translate into Arabic."),
    },
    CommandSpec {
        name: "/calculate",
        kind: CommandKind::TakesInput,
        hint: Some("Send a mathematical expression to calculate."),
    },
    CommandSpec {
        name: "/tweet",
        kind: CommandKind::TakesInput,
        hint: Some("Send the text to tweet on our Twitter account."),
    },
    CommandSpec {
        name: "/ocr_url",
        kind: CommandKind::TakesInput,
        hint: Some("Send an image URL to extract its text."),
    },
    CommandSpec {
        name: "/start",
        kind: CommandKind::Lifecycle { activate: true },
        hint: None,
    },
    CommandSpec {
        name: "/stop",
        kind: CommandKind::Lifecycle { activate: false },
        hint: None,
    },
];

/// Look up a command by its full name, e.g. "/translate".
pub fn lookup(name: &str) -> Option<CommandSpec> {
    COMMANDS.iter().copied().find(|spec| spec.name == name)
}

fn help_text() -> String {
    "Available commands:\n\
     /help - Show this message\n\
     /weather - Weather in `Zagazig, Egypt` now\n\
     /translate - Translate message from English to Arabic\n\
     /calculate - Calculate a mathematical expression\n\
     /tweet - Tweet on our Twitter account\n\
     /ocr_url - Extract text from image\n\
     /stop - Stop using bot\n\
     /start - Start using bot"
        .to_string()
}

/// Concrete command host: one reqwest client shared by all handlers.
pub struct CommandClient {
    client: reqwest::Client,
    config: CommandsConfig,
}

impl CommandClient {
    /// Create a new command host from config.
    pub fn new(config: CommandsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CommandHost for CommandClient {
    fn lookup(&self, name: &str) -> Option<CommandSpec> {
        lookup(name)
    }

    async fn run_no_arg(&self, name: &str) -> Result<String, TbotError> {
        match name {
            "/help" => Ok(help_text()),
            "/weather" => Ok(self.weather().await),
            other => Err(TbotError::Command(format!(
                "not a no-argument command: {other}"
            ))),
        }
    }

    async fn run_with_arg(&self, name: &str, arg: &str) -> Result<String, TbotError> {
        match name {
            "/translate" => Ok(self.translate(arg).await),
            "/calculate" => Ok(self.calculate(arg).await),
            "/tweet" => Ok(self.tweet(arg).await),
            "/ocr_url" => Ok(self.ocr_url(arg).await),
            other => Err(TbotError::Command(format!(
                "not an input-taking command: {other}"
            ))),
        }
    }
}
