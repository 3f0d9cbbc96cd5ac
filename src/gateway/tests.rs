//! Gateway tests: ingestion, the conversation state machine, and the
//! broadcast engine, against an in-memory store and fake collaborators.

use super::broadcast::{in_window, weekday_name};
use super::Gateway;
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Weekday};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tbot_core::config::Config;
use tbot_core::domain::{AnnouncementState, CommandState, ScheduleEntry, User};
use tbot_core::error::TbotError;
use tbot_core::traits::{CommandHost, CommandSpec, Transport};
use tbot_core::update::{Chat, IncomingMessage, Sender, Update};
use tbot_store::Store;

/// Transport fake: queued inbound batches, recorded sends and offsets.
#[derive(Default)]
struct MockTransport {
    batches: Mutex<VecDeque<Vec<Update>>>,
    sent: Mutex<Vec<(i64, String)>>,
    offsets: Mutex<Vec<Option<i64>>>,
}

impl MockTransport {
    fn queue(&self, batch: Vec<Update>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }

    fn offsets(&self) -> Vec<Option<i64>> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TbotError> {
        self.offsets.lock().unwrap().push(offset);
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TbotError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

/// Command host fake: the real registry with canned handler outputs.
#[derive(Default)]
struct MockCommands {
    invocations: Mutex<Vec<(String, String)>>,
}

impl MockCommands {
    fn invocations(&self) -> Vec<(String, String)> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandHost for MockCommands {
    fn lookup(&self, name: &str) -> Option<CommandSpec> {
        tbot_commands::lookup(name)
    }

    async fn run_no_arg(&self, name: &str) -> Result<String, TbotError> {
        self.invocations
            .lock()
            .unwrap()
            .push((name.to_string(), String::new()));
        match name {
            "/help" => Ok("help text".to_string()),
            "/weather" => Ok("Weather is Sunny in Zagazig, Egypt.".to_string()),
            other => Err(TbotError::Command(format!("unexpected command: {other}"))),
        }
    }

    async fn run_with_arg(&self, name: &str, arg: &str) -> Result<String, TbotError> {
        self.invocations
            .lock()
            .unwrap()
            .push((name.to_string(), arg.to_string()));
        match (name, arg) {
            ("/translate", "Ahmed") => Ok("أحمد".to_string()),
            ("/translate", other) => Ok(format!("(ar) {other}")),
            ("/calculate", "5*5") => Ok("Result: 25".to_string()),
            ("/calculate", _) => Ok("Error happened. Use a valid expression".to_string()),
            (other, _) => Err(TbotError::Command(format!("unexpected command: {other}"))),
        }
    }
}

struct Harness {
    gw: Gateway,
    transport: Arc<MockTransport>,
    commands: Arc<MockCommands>,
    store: Store,
}

impl Harness {
    async fn new() -> Self {
        let mut config = Config::default();
        config.store.db_path = ":memory:".to_string();
        config.broadcast.send_spacing_ms = 0;

        let store = Store::new(&config.store).await.unwrap();
        let transport = Arc::new(MockTransport::default());
        let commands = Arc::new(MockCommands::default());
        let gw = Gateway::new(
            &config,
            transport.clone() as Arc<dyn Transport>,
            store.clone(),
            commands.clone() as Arc<dyn CommandHost>,
        )
        .unwrap();

        Self {
            gw,
            transport,
            commands,
            store,
        }
    }

    /// Queue one batch, then run a full poll + dispatch pass over it.
    async fn run_batch(&mut self, batch: Vec<Update>) {
        self.transport.queue(batch);
        let batch = self.gw.poll_updates().await.unwrap();
        self.gw.handle_batch(&batch).await;
    }

    async fn user_state(&self, user_id: i64) -> CommandState {
        self.store.get_user(user_id).await.unwrap().unwrap().state
    }
}

fn update(update_id: i64, message_id: i64, user_id: i64, text: Option<&str>) -> Update {
    Update {
        update_id,
        message: Some(IncomingMessage {
            message_id,
            from: Some(Sender {
                id: user_id,
                is_bot: false,
                first_name: "Ahmed".to_string(),
                last_name: None,
                username: Some("ahmed".to_string()),
                language_code: Some("en".to_string()),
            }),
            chat: Chat { id: user_id * 10 },
            date: 1_700_000_000,
            text: text.map(Into::into),
        }),
    }
}

fn tz() -> FixedOffset {
    FixedOffset::east_opt(2 * 3600).unwrap()
}

// A Monday, which is a default study day.
const MONDAY: (i32, u32, u32) = (2026, 8, 3);

async fn seed_user(store: &Store, id: i64, active: bool, chat_id: Option<i64>) {
    store
        .add_user(&User {
            id,
            is_bot: false,
            is_admin: false,
            first_name: "Seeded".to_string(),
            last_name: None,
            username: None,
            language_code: "en".to_string(),
            active,
            created_at: 1_700_000_000,
            updated_at: 1_700_000_000,
            state: CommandState::Idle,
            chat_id,
        })
        .await
        .unwrap();
}

// ---------------------------------------------------------------- ingestion

#[tokio::test]
async fn test_new_user_is_created_with_chat_bound() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, Some("/help"))]).await;

    let user = h.store.get_user(7).await.unwrap().unwrap();
    assert!(user.active);
    assert_eq!(user.chat_id, Some(70));
    assert_eq!(user.state, CommandState::Idle);

    let msg = h.store.get_message(100).await.unwrap().unwrap();
    assert_eq!(msg.update_id, 1);
    assert_eq!(msg.text, "/help");
}

#[tokio::test]
async fn test_legacy_user_gets_chat_bound_on_next_message() {
    let mut h = Harness::new().await;
    seed_user(&h.store, 7, true, None).await;

    h.run_batch(vec![update(1, 100, 7, Some("/help"))]).await;

    let user = h.store.get_user(7).await.unwrap().unwrap();
    assert_eq!(user.chat_id, Some(70));
}

#[tokio::test]
async fn test_dedup_suppresses_side_effects() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, Some("/help"))]).await;
    assert_eq!(h.transport.sent().len(), 1);

    // The same message re-delivered under a fresh update id: no new row,
    // no second reply.
    h.run_batch(vec![update(2, 100, 7, Some("/help"))]).await;
    assert_eq!(h.transport.sent().len(), 1);
    assert_eq!(h.commands.invocations().len(), 1);
}

#[tokio::test]
async fn test_cursor_advances_past_nonempty_batch() {
    let mut h = Harness::new().await;
    // Deliberately unordered: the cursor follows the max id.
    h.run_batch(vec![
        update(10, 100, 7, Some("hello")),
        update(12, 102, 7, Some("hello2")),
        update(11, 101, 7, Some("hello3")),
    ])
    .await;

    // Empty poll: offset now 13, and it stays 13 across empty batches.
    let batch = h.gw.poll_updates().await.unwrap();
    assert!(batch.is_empty());
    let batch = h.gw.poll_updates().await.unwrap();
    assert!(batch.is_empty());

    assert_eq!(h.transport.offsets(), vec![None, Some(13), Some(13)]);
}

#[tokio::test]
async fn test_updates_without_message_are_skipped() {
    let mut h = Harness::new().await;
    h.transport.queue(vec![Update {
        update_id: 5,
        message: None,
    }]);
    let batch = h.gw.poll_updates().await.unwrap();
    h.gw.handle_batch(&batch).await;

    assert!(h.transport.sent().is_empty());
    // The cursor still advances past the skipped update.
    let batch = h.gw.poll_updates().await.unwrap();
    assert!(batch.is_empty());
    assert_eq!(h.transport.offsets(), vec![None, Some(6)]);
}

// ------------------------------------------------------------ state machine

#[tokio::test]
async fn test_non_text_message_gets_fixed_reply() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, None)]).await;
    assert_eq!(h.transport.sent_texts(), vec!["I handle text messages only!"]);
}

#[tokio::test]
async fn test_unknown_command_gets_fixed_reply() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, Some("/frobnicate"))]).await;
    assert_eq!(h.transport.sent_texts(), vec!["Use a defined command."]);
    assert_eq!(h.user_state(7).await, CommandState::Idle);
}

#[tokio::test]
async fn test_no_arg_command_is_one_shot_every_time() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, Some("/weather"))]).await;
    assert_eq!(h.user_state(7).await, CommandState::Idle);

    h.run_batch(vec![update(2, 101, 7, Some("/weather"))]).await;
    assert_eq!(h.user_state(7).await, CommandState::Idle);

    // Two independent executions.
    assert_eq!(h.transport.sent().len(), 2);
    assert_eq!(h.commands.invocations().len(), 2);
}

#[tokio::test]
async fn test_input_command_sends_hint_and_pends() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, Some("/translate"))]).await;

    assert_eq!(
        h.user_state(7).await,
        CommandState::AwaitingArgument("/translate".to_string())
    );
    let sent = h.transport.sent_texts();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("translate"), "hint should name the command");
    // The hint alone is not an execution.
    assert!(h.commands.invocations().is_empty());
}

#[tokio::test]
async fn test_free_text_routes_to_pending_command() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, Some("/translate"))]).await;
    h.run_batch(vec![update(2, 101, 7, Some("Ahmed"))]).await;

    assert_eq!(
        h.commands.invocations(),
        vec![("/translate".to_string(), "Ahmed".to_string())]
    );
    assert_eq!(h.transport.sent_texts().last().unwrap(), "أحمد");
    // The pending command survives argument consumption.
    assert_eq!(
        h.user_state(7).await,
        CommandState::AwaitingArgument("/translate".to_string())
    );
}

#[tokio::test]
async fn test_pending_command_is_repeatable_until_replaced() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, Some("/translate"))]).await;
    h.run_batch(vec![update(2, 101, 7, Some("Ahmed"))]).await;
    h.run_batch(vec![update(3, 102, 7, Some("Omar"))]).await;

    assert_eq!(h.commands.invocations().len(), 2);

    // A new no-arg command clears the slot; free text afterwards is noise.
    h.run_batch(vec![update(4, 103, 7, Some("/weather"))]).await;
    h.run_batch(vec![update(5, 104, 7, Some("Samir"))]).await;
    assert_eq!(h.user_state(7).await, CommandState::Idle);
    assert_eq!(h.transport.sent_texts().last().unwrap(), "Use a defined command.");
}

#[tokio::test]
async fn test_lifecycle_commands_toggle_active_silently() {
    let mut h = Harness::new().await;
    h.run_batch(vec![update(1, 100, 7, Some("/stop"))]).await;

    let user = h.store.get_user(7).await.unwrap().unwrap();
    assert!(!user.active);
    assert_eq!(user.state, CommandState::Idle);
    assert!(h.transport.sent().is_empty(), "lifecycle commands send no reply");

    h.run_batch(vec![update(2, 101, 7, Some("/start"))]).await;
    assert!(h.store.get_user(7).await.unwrap().unwrap().active);
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_free_text_behind_lifecycle_command_is_swallowed() {
    let mut h = Harness::new().await;
    // Same batch: /stop followed by stray text. The text draws no reply.
    h.run_batch(vec![
        update(1, 100, 7, Some("/stop")),
        update(2, 101, 7, Some("bye then")),
    ])
    .await;
    assert!(h.transport.sent().is_empty());

    // The guard is batch-scoped: the same text in the next batch is noise.
    h.run_batch(vec![update(3, 102, 7, Some("hello again"))]).await;
    assert_eq!(h.transport.sent_texts(), vec!["Use a defined command."]);
}

#[tokio::test]
async fn test_end_to_end_translate_and_calculate() {
    let mut h = Harness::new().await;

    // First user translates.
    h.run_batch(vec![update(1, 100, 7, Some("/translate"))]).await;
    h.run_batch(vec![update(2, 101, 7, Some("Ahmed"))]).await;
    assert_eq!(h.transport.sent().last().unwrap(), &(70, "أحمد".to_string()));
    assert_eq!(
        h.user_state(7).await,
        CommandState::AwaitingArgument("/translate".to_string())
    );

    // Second user calculates; conversations do not interfere.
    h.run_batch(vec![update(3, 102, 8, Some("/calculate"))]).await;
    h.run_batch(vec![update(4, 103, 8, Some("5*5"))]).await;
    assert_eq!(
        h.transport.sent().last().unwrap(),
        &(80, "Result: 25".to_string())
    );
    assert_eq!(
        h.user_state(7).await,
        CommandState::AwaitingArgument("/translate".to_string())
    );
}

// ---------------------------------------------------------------- broadcast

#[test]
fn test_window_boundaries_are_inclusive() {
    let target = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
    let time = |h, m, s| NaiveTime::from_hms_opt(h, m, s).unwrap();

    assert!(in_window(time(7, 59, 45), target, 15));
    assert!(in_window(time(8, 0, 15), target, 15));
    assert!(in_window(time(8, 0, 0), target, 15));
    assert!(!in_window(time(7, 59, 44), target, 15));
    assert!(!in_window(time(8, 0, 16), target, 15));
}

#[test]
fn test_window_wrapping_midnight() {
    let target = NaiveTime::from_hms_opt(0, 0, 5).unwrap();
    let time = |h: u32, m, s| NaiveTime::from_hms_opt(h, m, s).unwrap();

    assert!(in_window(time(23, 59, 55), target, 15));
    assert!(in_window(time(0, 0, 10), target, 15));
    assert!(!in_window(time(12, 0, 0), target, 15));
}

#[test]
fn test_weekday_names() {
    assert_eq!(weekday_name(Weekday::Mon), "monday");
    assert_eq!(weekday_name(Weekday::Sun), "sunday");
}

#[tokio::test]
async fn test_schedule_broadcast_on_study_day() {
    let mut h = Harness::new().await;
    seed_user(&h.store, 1, true, Some(10)).await;
    seed_user(&h.store, 2, false, Some(20)).await;
    seed_user(&h.store, 3, true, None).await;

    for (time, desc) in [("10:15", "History"), ("08:30", "Algebra")] {
        h.store
            .add_schedule_entry(&ScheduleEntry {
                weekday: "monday".to_string(),
                time: time.to_string(),
                description: desc.to_string(),
            })
            .await
            .unwrap();
    }

    let (y, m, d) = MONDAY;
    let now = tz().with_ymd_and_hms(y, m, d, 8, 0, 10).unwrap();
    h.gw.schedule_tick(now).await.unwrap();

    // Only the active user with a bound chat receives it.
    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 10);
    assert!(sent[0].1.starts_with("Good morning,\ntoday is Monday"));
    assert!(sent[0].1.contains("1. Algebra at 08:30\n2. History at 10:15"));

    // Edge-triggered: a later tick inside the same window stays quiet.
    let later = tz().with_ymd_and_hms(y, m, d, 8, 0, 14).unwrap();
    h.gw.schedule_tick(later).await.unwrap();
    assert_eq!(h.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_schedule_broadcast_skips_off_days_and_off_hours() {
    let mut h = Harness::new().await;
    seed_user(&h.store, 1, true, Some(10)).await;

    // Thursday is not a study day.
    let thursday = tz().with_ymd_and_hms(2026, 8, 6, 8, 0, 0).unwrap();
    h.gw.schedule_tick(thursday).await.unwrap();

    // Monday, but well outside the window.
    let (y, m, d) = MONDAY;
    let afternoon = tz().with_ymd_and_hms(y, m, d, 15, 0, 0).unwrap();
    h.gw.schedule_tick(afternoon).await.unwrap();

    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_announcement_lifecycle_is_monotonic() {
    let mut h = Harness::new().await;
    seed_user(&h.store, 1, true, Some(10)).await;

    let date = |y, m, d, hh| {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, 0, 0)
            .unwrap()
    };
    // Fresh announcement for the day after tomorrow.
    h.store
        .add_announcement("Party", date(2026, 8, 5, 18))
        .await
        .unwrap();
    // Cancelled before its first broadcast.
    let seminar = h
        .store
        .add_announcement("Seminar", date(2026, 8, 10, 9))
        .await
        .unwrap();
    assert!(h.store.cancel_announcement(seminar).await.unwrap());
    // Already broadcast once, happening tomorrow.
    let exam = h
        .store
        .add_announcement("Exam", date(2026, 8, 4, 9))
        .await
        .unwrap();
    h.store
        .update_announcement(exam, AnnouncementState::Once)
        .await
        .unwrap();

    let (y, m, d) = MONDAY;
    let day_one = tz().with_ymd_and_hms(y, m, d, 7, 0, 5).unwrap();
    h.gw.announcement_tick(day_one).await.unwrap();

    let texts = h.transport.sent_texts();
    assert_eq!(
        texts,
        vec!["Party", "Seminar IS CANCELLED", "Exam TOMORROW"]
    );

    let states: Vec<AnnouncementState> = h
        .store
        .get_announcements()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.state)
        .collect();
    assert_eq!(
        states,
        vec![
            AnnouncementState::Once,
            AnnouncementState::Twice,
            AnnouncementState::Twice
        ]
    );

    // Same day again: latched, nothing moves.
    h.gw.announcement_tick(day_one).await.unwrap();
    assert_eq!(h.transport.sent().len(), 3);

    // Next day: the fresh announcement is now one day away and settles.
    let day_two = tz().with_ymd_and_hms(y, m, d + 1, 7, 0, 5).unwrap();
    h.gw.announcement_tick(day_two).await.unwrap();
    assert_eq!(h.transport.sent_texts().last().unwrap(), "Party TOMORROW");

    let party_state = h.store.get_announcements().await.unwrap()[0].state;
    assert_eq!(party_state, AnnouncementState::Twice);

    // Everything terminal: further days are silent.
    let day_three = tz().with_ymd_and_hms(y, m, d + 2, 7, 0, 5).unwrap();
    h.gw.announcement_tick(day_three).await.unwrap();
    assert_eq!(h.transport.sent().len(), 4);
    assert!(h
        .store
        .get_announcements()
        .await
        .unwrap()
        .iter()
        .all(|a| a.state.is_terminal()));
}

#[tokio::test]
async fn test_announcement_tick_outside_window_is_a_no_op() {
    let mut h = Harness::new().await;
    seed_user(&h.store, 1, true, Some(10)).await;
    h.store
        .add_announcement(
            "Party",
            NaiveDate::from_ymd_opt(2026, 8, 5)
                .unwrap()
                .and_hms_opt(18, 0, 0)
                .unwrap(),
        )
        .await
        .unwrap();

    let (y, m, d) = MONDAY;
    let noon = tz().with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap();
    h.gw.announcement_tick(noon).await.unwrap();

    assert!(h.transport.sent().is_empty());
    assert_eq!(
        h.store.get_announcements().await.unwrap()[0].state,
        AnnouncementState::Unset
    );
}
