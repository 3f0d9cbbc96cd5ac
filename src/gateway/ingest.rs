//! Update ingestion: cursor advance, dedup, and normalization into
//! message + user records.

use super::{now_unix, Gateway};
use tbot_core::{
    domain::{CommandState, Message, User},
    error::TbotError,
    update::Update,
};
use tracing::{debug, info};

/// One normalized inbound message, ready for dispatch. `user` reflects the
/// stored record after any chat-id binding.
pub(super) struct Inbound {
    pub user: User,
    pub chat_id: i64,
    pub text: Option<String>,
}

impl Gateway {
    /// Fetch the next batch and advance the cursor past it.
    ///
    /// A non-empty batch moves the cursor to `max(update_id) + 1`; an empty
    /// batch leaves it unchanged, so nothing is fetched twice across
    /// iterations.
    pub(super) async fn poll_updates(&mut self) -> Result<Vec<Update>, TbotError> {
        let batch = self.transport.fetch_updates(self.updates_offset).await?;

        if let Some(max_id) = batch.iter().map(|u| u.update_id).max() {
            self.updates_offset = Some(max_id + 1);
        } else {
            debug!("no updates to handle");
        }

        Ok(batch)
    }

    /// Normalize one update. Returns `None` for updates that produce no
    /// dispatch: non-message updates, senderless messages, and messages
    /// already in the store (the second dedup net under the cursor).
    pub(super) async fn ingest_update(&self, update: &Update) -> Result<Option<Inbound>, TbotError> {
        // Edited messages and other non-message updates carry no payload.
        let Some(message) = &update.message else {
            return Ok(None);
        };
        let Some(from) = &message.from else {
            return Ok(None);
        };

        if self.store.get_message(message.message_id).await?.is_some() {
            debug!("message {} already stored, skipping", message.message_id);
            return Ok(None);
        }

        self.store
            .add_message(&Message {
                id: message.message_id,
                update_id: update.update_id,
                user_id: from.id,
                chat_id: message.chat.id,
                date: message.date,
                text: message.text.clone().unwrap_or_default(),
            })
            .await?;

        let now = now_unix();
        if self.store.get_user(from.id).await?.is_none() {
            self.store
                .add_user(&User {
                    id: from.id,
                    is_bot: from.is_bot,
                    is_admin: false,
                    first_name: from.first_name.clone(),
                    last_name: from.last_name.clone(),
                    username: from.username.clone(),
                    language_code: from.language_code.clone().unwrap_or_else(|| "en".to_string()),
                    active: true,
                    created_at: now,
                    updated_at: now,
                    state: CommandState::Idle,
                    chat_id: Some(message.chat.id),
                })
                .await?;
            info!("new user {} saved", from.id);
        }

        let mut user = self
            .store
            .get_user(from.id)
            .await?
            .ok_or_else(|| TbotError::Store(format!("user {} vanished after insert", from.id)))?;

        // Users persisted before chat binding get their chat id filled in
        // now; re-read so dispatch always sees the bound record.
        if user.chat_id.is_none() {
            self.store
                .set_user_chat_id(user.id, now, message.chat.id)
                .await?;
            user = self
                .store
                .get_user(user.id)
                .await?
                .ok_or_else(|| TbotError::Store(format!("user {} vanished after update", from.id)))?;
        }

        Ok(Some(Inbound {
            user,
            chat_id: message.chat.id,
            text: message.text.clone(),
        }))
    }
}
