//! Time-windowed broadcasts: the daily schedule reminder and the
//! announcement lifecycle sweep.
//!
//! Both triggers are edge-triggered: the tolerance window says *when* a
//! broadcast may fire, the per-day latch guarantees it fires at most once
//! per day no matter how often the loop lands inside the window.

use super::Gateway;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Weekday};
use tbot_core::{
    domain::{Announcement, AnnouncementState, ScheduleEntry},
    error::TbotError,
};
use tracing::{debug, info};

impl Gateway {
    /// Send today's schedule to all active users once per study-day morning.
    pub(super) async fn schedule_tick(
        &mut self,
        now: DateTime<FixedOffset>,
    ) -> Result<(), TbotError> {
        let today = now.date_naive();
        if self.schedule_fired_on == Some(today) {
            return Ok(());
        }
        if !self.study_days.contains(&now.weekday()) {
            return Ok(());
        }
        if !in_window(now.time(), self.schedule_trigger, self.window_tolerance_secs) {
            return Ok(());
        }

        let weekday = weekday_name(now.weekday());
        let entries = self.store.get_schedule_of(weekday).await?;
        info!("broadcasting today's schedule ({} entries)", entries.len());
        self.fan_out(&render_schedule(weekday, &entries)).await?;

        self.schedule_fired_on = Some(today);
        Ok(())
    }

    /// Advance every announcement's delivery state once per day.
    pub(super) async fn announcement_tick(
        &mut self,
        now: DateTime<FixedOffset>,
    ) -> Result<(), TbotError> {
        let today = now.date_naive();
        if self.announce_fired_on == Some(today) {
            return Ok(());
        }
        if !in_window(now.time(), self.announce_trigger, self.window_tolerance_secs) {
            return Ok(());
        }

        for ann in self.store.get_announcements().await? {
            self.step_announcement(&ann, today).await?;
        }

        self.announce_fired_on = Some(today);
        Ok(())
    }

    /// One lifecycle step. State moves strictly forward and persists before
    /// the next loop iteration, so each announcement broadcasts at most
    /// twice even across restarts.
    async fn step_announcement(
        &self,
        ann: &Announcement,
        today: NaiveDate,
    ) -> Result<(), TbotError> {
        match ann.state {
            AnnouncementState::Unset => {
                info!("broadcasting announcement {}: {}", ann.id, ann.description);
                self.fan_out(&ann.description).await?;
                self.store
                    .update_announcement(ann.id, AnnouncementState::Once)
                    .await?;
            }
            AnnouncementState::Cancelled => {
                info!("broadcasting cancellation of announcement {}", ann.id);
                self.fan_out(&format!("{} IS CANCELLED", ann.description))
                    .await?;
                self.store
                    .update_announcement(ann.id, AnnouncementState::Twice)
                    .await?;
            }
            AnnouncementState::Once => {
                let days_away = (ann.scheduled_at.date() - today).num_days();
                if days_away == 1 {
                    info!("broadcasting eve reminder for announcement {}", ann.id);
                    self.fan_out(&format!("{} TOMORROW", ann.description)).await?;
                    self.store
                        .update_announcement(ann.id, AnnouncementState::Twice)
                        .await?;
                }
            }
            AnnouncementState::Twice => {
                debug!("announcement {} is settled", ann.id);
            }
        }
        Ok(())
    }

    /// Sequential fan-out to every active user with a bound chat, spaced to
    /// respect outbound rate limits.
    async fn fan_out(&self, text: &str) -> Result<(), TbotError> {
        let users = self.store.get_users().await?;
        for user in users.iter().filter(|u| u.active) {
            let Some(chat_id) = user.chat_id else {
                continue;
            };
            debug!("sending broadcast to user {}", user.id);
            self.send(chat_id, text).await;
            tokio::time::sleep(self.send_spacing).await;
        }
        Ok(())
    }
}

/// Whether `now` lies inside the tolerance window around `target`, bounds
/// inclusive. Windows wrapping midnight are handled.
pub(crate) fn in_window(now: NaiveTime, target: NaiveTime, tolerance_secs: u32) -> bool {
    let tolerance = Duration::seconds(i64::from(tolerance_secs));
    let (start, start_wrap) = target.overflowing_sub_signed(tolerance);
    let (end, end_wrap) = target.overflowing_add_signed(tolerance);
    if start_wrap != 0 || end_wrap != 0 {
        now >= start || now <= end
    } else {
        start <= now && now <= end
    }
}

fn render_schedule(weekday: &str, entries: &[ScheduleEntry]) -> String {
    let mut listing = String::new();
    for (idx, entry) in entries.iter().enumerate() {
        listing.push_str(&format!(
            "{}. {} at {}\n",
            idx + 1,
            entry.description,
            entry.time
        ));
    }
    format!(
        "Good morning,\ntoday is {} and the schedule is:\n\n{listing}",
        capitalize(weekday)
    )
}

pub(crate) fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
