//! Gateway — the sequential main loop connecting transport, store, and
//! commands.
//!
//! Per iteration: evaluate broadcast windows → long-poll for updates →
//! run the conversation state machine over the batch → pause. Single logical
//! task; the long poll is the only long suspension and nothing else runs
//! during it.

mod broadcast;
mod dispatch;
mod ingest;

#[cfg(test)]
mod tests;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};
use std::sync::Arc;
use std::time::Duration;
use tbot_core::{
    config::Config,
    error::TbotError,
    traits::{CommandHost, Transport},
};
use tbot_store::Store;
use tracing::{error, info};

/// The central gateway owning the update cursor and the broadcast latches.
pub struct Gateway {
    transport: Arc<dyn Transport>,
    store: Store,
    commands: Arc<dyn CommandHost>,

    timezone: FixedOffset,
    loop_delay: Duration,
    send_spacing: Duration,
    study_days: Vec<Weekday>,
    schedule_trigger: NaiveTime,
    announce_trigger: NaiveTime,
    window_tolerance_secs: u32,

    /// Lowest unseen update sequence number; `None` until the first batch.
    updates_offset: Option<i64>,
    /// Edge triggers: the date each daily broadcast last fired.
    schedule_fired_on: Option<NaiveDate>,
    announce_fired_on: Option<NaiveDate>,
}

impl Gateway {
    /// Create a new gateway, validating the broadcast config eagerly.
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        store: Store,
        commands: Arc<dyn CommandHost>,
    ) -> Result<Self, TbotError> {
        Ok(Self {
            transport,
            store,
            commands,
            timezone: config.broadcast.timezone()?,
            loop_delay: Duration::from_millis(config.bot.loop_delay_ms),
            send_spacing: Duration::from_millis(config.broadcast.send_spacing_ms),
            study_days: config.broadcast.study_days()?,
            schedule_trigger: config.broadcast.schedule_trigger()?,
            announce_trigger: config.broadcast.announce_trigger()?,
            window_tolerance_secs: config.broadcast.window_tolerance_secs,
            updates_offset: None,
            schedule_fired_on: None,
            announce_fired_on: None,
        })
    }

    /// Run the main loop until interrupted.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            "tbot gateway running | transport: {} | schedule at {} | announcements at {}",
            self.transport.name(),
            self.schedule_trigger,
            self.announce_trigger,
        );

        loop {
            let now = Utc::now().with_timezone(&self.timezone);
            self.broadcast_tick(now).await;

            match self.poll_updates().await {
                Ok(batch) => self.handle_batch(&batch).await,
                Err(e) => error!("poll failed: {e}"),
            }

            // The interrupt is observed between iterations, never mid-batch.
            tokio::select! {
                _ = tokio::time::sleep(self.loop_delay) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn broadcast_tick(&mut self, now: DateTime<FixedOffset>) {
        if let Err(e) = self.schedule_tick(now).await {
            error!("schedule broadcast failed: {e}");
        }
        if let Err(e) = self.announcement_tick(now).await {
            error!("announcement sweep failed: {e}");
        }
    }

    async fn handle_batch(&self, batch: &[tbot_core::update::Update]) {
        let mut batch_marker = None;
        for update in batch {
            match self.ingest_update(update).await {
                Ok(Some(inbound)) => {
                    if let Err(e) = self.dispatch(&inbound, &mut batch_marker).await {
                        error!("dispatch failed for update {}: {e}", update.update_id);
                    }
                }
                Ok(None) => {}
                Err(e) => error!("ingest failed for update {}: {e}", update.update_id),
            }
        }
    }

    /// Fire-and-forget send: failures are logged, never retried.
    async fn send(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.transport.send_text(chat_id, text).await {
            error!("send to chat {chat_id} failed: {e}");
        }
    }
}

fn now_unix() -> i64 {
    Utc::now().timestamp()
}
