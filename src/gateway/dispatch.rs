//! The per-user conversation state machine.
//!
//! An inbound text is a new command, a continuation argument for the user's
//! pending command, or garbage. The only durable state is the per-user slot
//! in the store; `batch_marker` is scoped to one update batch and only guards
//! free text arriving right behind a lifecycle command.

use super::{ingest::Inbound, now_unix, Gateway};
use tbot_core::{
    domain::CommandState,
    error::TbotError,
    traits::{CommandKind, CommandSpec},
};
use tracing::{debug, error, info};

const UNDEFINED_COMMAND: &str = "Use a defined command.";
const TEXT_ONLY: &str = "I handle text messages only!";

impl Gateway {
    /// Route one inbound message through the state machine.
    pub(super) async fn dispatch(
        &self,
        inbound: &Inbound,
        batch_marker: &mut Option<CommandSpec>,
    ) -> Result<(), TbotError> {
        let text = inbound
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let Some(text) = text else {
            debug!("non-text message from user {}", inbound.user.id);
            self.send(inbound.chat_id, TEXT_ONLY).await;
            return Ok(());
        };

        if text.starts_with('/') {
            self.dispatch_command(inbound, text, batch_marker).await
        } else {
            self.dispatch_free_text(inbound, text, batch_marker).await
        }
    }

    /// A `/`-prefixed message: start a new command.
    async fn dispatch_command(
        &self,
        inbound: &Inbound,
        text: &str,
        batch_marker: &mut Option<CommandSpec>,
    ) -> Result<(), TbotError> {
        let user = &inbound.user;

        let Some(spec) = self.commands.lookup(text) else {
            info!("undefined command {text:?} from user {}", user.id);
            self.send(inbound.chat_id, UNDEFINED_COMMAND).await;
            return Ok(());
        };

        *batch_marker = Some(spec);
        let now = now_unix();

        match spec.kind {
            CommandKind::TakesInput => {
                self.store
                    .set_user_state(
                        user.id,
                        now,
                        &CommandState::AwaitingArgument(text.to_string()),
                    )
                    .await?;
                if let Some(hint) = spec.hint {
                    self.send(inbound.chat_id, hint).await;
                }
                info!("user {} now awaits input for {text}", user.id);
            }
            CommandKind::Lifecycle { activate } => {
                self.store.set_user_status(user.id, now, activate).await?;
                self.store
                    .set_user_state(user.id, now, &CommandState::Idle)
                    .await?;
                info!(
                    "user {} is now {}",
                    user.id,
                    if activate { "active" } else { "inactive" }
                );
            }
            CommandKind::NoArg => {
                // No-argument commands are one-shot, every time.
                match self.commands.run_no_arg(text).await {
                    Ok(reply) => self.send(inbound.chat_id, &reply).await,
                    Err(e) => error!("command {text} failed: {e}"),
                }
                self.store
                    .set_user_state(user.id, now, &CommandState::Idle)
                    .await?;
            }
        }

        Ok(())
    }

    /// Free text: a continuation argument for the pending command, or noise.
    async fn dispatch_free_text(
        &self,
        inbound: &Inbound,
        text: &str,
        batch_marker: &mut Option<CommandSpec>,
    ) -> Result<(), TbotError> {
        let user = &inbound.user;

        if let CommandState::AwaitingArgument(cmd) = &user.state {
            if self
                .commands
                .lookup(cmd)
                .is_some_and(|spec| spec.takes_input())
            {
                info!("running pending command {cmd} for user {}", user.id);
                match self.commands.run_with_arg(cmd, text).await {
                    Ok(reply) => self.send(inbound.chat_id, &reply).await,
                    Err(e) => error!("command {cmd} failed: {e}"),
                }
                // The pending command stays set: the user may keep sending
                // input until the next `/` command.
                return Ok(());
            }
        }

        // A lifecycle command earlier in this batch expects no follow-up;
        // swallow the text instead of scolding the user.
        if matches!(
            batch_marker,
            Some(spec) if matches!(spec.kind, CommandKind::Lifecycle { .. })
        ) {
            debug!("skipping free text right after a lifecycle command");
            return Ok(());
        }

        info!("unroutable free text from user {}", user.id);
        self.send(inbound.chat_id, UNDEFINED_COMMAND).await;
        Ok(())
    }
}
