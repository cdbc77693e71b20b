//! The reminder engine: owns every `ScheduleEntry` and decides, on each
//! tick, which entries must fire "now". All mutation goes through this type
//! (`add_schedule`, `tick`, `acknowledge`); handlers only hold a clone.
//!
//! A firing does two things: it asks the notifier for a native notification
//! (permission-gated, best effort) and it registers a pending prompt that the
//! user resolves over HTTP with a taken / not-taken answer. The prompt
//! channel is deliberately independent of notification permission.

use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Local, NaiveDateTime};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::schedule::{AckStatus, CreateScheduleRequest, ScheduleEntry};
use crate::notify::Notifier;

/// A reminder still fires this long after (or before) its configured minute,
/// so a tick loop that was paused briefly does not lose the day.
const TOLERANCE_MINUTES: i64 = 2;

/// A firing awaiting the user's taken / not-taken answer. At most one per
/// entry at a time; a new day's firing replaces a stale unresolved one.
#[derive(Debug, Clone, Serialize)]
pub struct PendingPrompt {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub fired_at: NaiveDateTime,
}

/// One entry fired by a tick, for logging and tests.
#[derive(Debug, Clone)]
pub struct Firing {
    pub schedule_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Whether the notifier attempted a native display.
    pub notified: bool,
}

#[derive(Default)]
struct EngineState {
    entries: HashMap<Uuid, ScheduleEntry>,
    // Keyed by schedule id
    prompts: HashMap<Uuid, PendingPrompt>,
}

#[derive(Clone)]
pub struct ReminderEngine {
    state: Arc<Mutex<EngineState>>,
    notifier: Arc<dyn Notifier>,
    ws_tx: Option<broadcast::Sender<String>>,
}

/// Local wall-clock now. Schedules carry no timezone; everything is the
/// host's local time, like the product it serves.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

impl ReminderEngine {
    pub fn new(notifier: Arc<dyn Notifier>, ws_tx: Option<broadcast::Sender<String>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            notifier,
            ws_tx,
        }
    }

    /// Validate and store a new schedule. `last_triggered_at` starts at `now`,
    /// so a schedule created today first fires tomorrow.
    pub async fn add_schedule(
        &self,
        user_id: Uuid,
        req: CreateScheduleRequest,
        now: NaiveDateTime,
    ) -> AppResult<ScheduleEntry> {
        if let Err(e) = req.validate() {
            return Err(AppError::Validation(e.to_string()));
        }
        if chrono::NaiveTime::parse_from_str(&req.time_of_day, "%H:%M").is_err() {
            return Err(AppError::Validation(
                "Time of day must be in HH:MM format".into(),
            ));
        }

        let entry = ScheduleEntry {
            id: Uuid::new_v4(),
            user_id,
            name: req.name,
            dosage: req.dosage,
            start_date: req.start_date,
            duration_days: req.duration_days,
            time_of_day: req.time_of_day,
            days_completed: 0,
            status: AckStatus::NotTaken,
            last_triggered_at: now,
            last_updated: None,
        };

        let mut state = self.state.lock().await;
        state.entries.insert(entry.id, entry.clone());
        tracing::info!(schedule_id = %entry.id, user_id = %user_id, name = %entry.name, "Medicine scheduled");
        Ok(entry)
    }

    pub async fn list(&self, user_id: Uuid) -> Vec<ScheduleEntry> {
        let state = self.state.lock().await;
        let mut entries: Vec<ScheduleEntry> = state
            .entries
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        entries
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Option<ScheduleEntry> {
        let state = self.state.lock().await;
        state
            .entries
            .get(&id)
            .filter(|e| e.user_id == user_id)
            .cloned()
    }

    /// One scan over all entries. An entry fires when the current time is
    /// within the tolerance window of its configured minute and it has not
    /// already fired on this calendar day.
    pub async fn tick(&self, now: NaiveDateTime) -> Vec<Firing> {
        let mut state = self.state.lock().await;
        let mut fired = Vec::new();
        let mut prompts = Vec::new();

        for entry in state.entries.values_mut() {
            let time = match entry.parse_time_of_day() {
                Some(t) => t,
                None => {
                    // One bad entry must never abort the scan
                    tracing::warn!(
                        schedule_id = %entry.id,
                        time_of_day = %entry.time_of_day,
                        "Skipping schedule with malformed time of day"
                    );
                    continue;
                }
            };

            let candidate = now.date().and_time(time);
            let diff = (now - candidate).abs();
            let within_window = diff <= Duration::minutes(TOLERANCE_MINUTES);
            let already_fired_today = entry.last_triggered_at.date() == now.date();

            if !within_window || already_fired_today {
                continue;
            }

            entry.last_triggered_at = now;
            // New day, new answer: the previous day's acknowledgment does not
            // carry over
            entry.status = AckStatus::NotTaken;

            let notified = self.notifier.display(
                entry.user_id,
                &format!("Time to take {}", entry.name),
                &format!("Dosage: {}", entry.dosage),
            );

            let prompt = PendingPrompt {
                id: Uuid::new_v4(),
                schedule_id: entry.id,
                user_id: entry.user_id,
                title: "Medicine Reminder".into(),
                message: format!("It's time to take {} ({})", entry.name, entry.dosage),
                fired_at: now,
            };
            prompts.push(prompt);

            tracing::info!(
                schedule_id = %entry.id,
                user_id = %entry.user_id,
                name = %entry.name,
                notified = notified,
                "Reminder fired"
            );
            fired.push(Firing {
                schedule_id: entry.id,
                user_id: entry.user_id,
                name: entry.name.clone(),
                notified,
            });
        }

        for prompt in prompts {
            if let Some(tx) = self.ws_tx.as_ref() {
                let msg = serde_json::json!({
                    "type": "prompt",
                    "user_id": prompt.user_id,
                    "prompt_id": prompt.id,
                    "schedule_id": prompt.schedule_id,
                    "title": prompt.title,
                    "message": prompt.message,
                });
                let _ = tx.send(msg.to_string());
            }
            state.prompts.insert(prompt.schedule_id, prompt);
        }

        fired
    }

    /// Record the user's answer for a firing. Last write wins; resolves the
    /// open prompt if one exists. Does not touch `days_completed`.
    pub async fn acknowledge(
        &self,
        user_id: Uuid,
        schedule_id: Uuid,
        status: AckStatus,
        now: NaiveDateTime,
    ) -> AppResult<ScheduleEntry> {
        let mut state = self.state.lock().await;

        let entry = state
            .entries
            .get_mut(&schedule_id)
            .filter(|e| e.user_id == user_id)
            .ok_or(AppError::NotFound("Schedule not found".into()))?;

        entry.status = status;
        entry.last_updated = Some(now);
        let entry = entry.clone();

        state.prompts.remove(&schedule_id);
        tracing::info!(
            schedule_id = %schedule_id,
            user_id = %user_id,
            status = ?status,
            "Reminder acknowledged"
        );
        Ok(entry)
    }

    /// Open prompts for a user, so a reconnecting client can recover
    /// firings it has not answered yet.
    pub async fn pending_prompts(&self, user_id: Uuid) -> Vec<PendingPrompt> {
        let state = self.state.lock().await;
        let mut prompts: Vec<PendingPrompt> = state
            .prompts
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        prompts.sort_by_key(|p| p.fired_at);
        prompts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Permission;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Mutex as StdMutex;

    struct RecordingNotifier {
        permission: Permission,
        displayed: StdMutex<Vec<(Uuid, String)>>,
    }

    impl RecordingNotifier {
        fn new(permission: Permission) -> Arc<Self> {
            Arc::new(Self {
                permission,
                displayed: StdMutex::new(Vec::new()),
            })
        }

        fn displayed_count(&self) -> usize {
            self.displayed.lock().unwrap().len()
        }
    }

    impl Notifier for RecordingNotifier {
        fn query_permission(&self) -> Permission {
            self.permission
        }

        fn request_permission(&self) -> bool {
            self.permission == Permission::Granted
        }

        fn display(&self, user_id: Uuid, title: &str, _body: &str) -> bool {
            if self.permission != Permission::Granted {
                return false;
            }
            self.displayed.lock().unwrap().push((user_id, title.into()));
            true
        }
    }

    fn dt(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn engine(notifier: Arc<RecordingNotifier>) -> ReminderEngine {
        ReminderEngine::new(notifier, None)
    }

    fn request(name: &str, time_of_day: &str) -> CreateScheduleRequest {
        CreateScheduleRequest {
            name: name.into(),
            dosage: "500mg".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            duration_days: 7,
            time_of_day: time_of_day.into(),
        }
    }

    #[tokio::test]
    async fn fires_within_tolerance_window() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier.clone());
        let user = Uuid::new_v4();
        engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        let fired = engine.tick(dt(2, 8, 0, 30)).await;
        assert_eq!(fired.len(), 1);
        assert!(fired[0].notified);
        assert_eq!(notifier.displayed_count(), 1);
    }

    #[tokio::test]
    async fn does_not_fire_outside_tolerance_window() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let user = Uuid::new_v4();
        engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        assert!(engine.tick(dt(2, 8, 5, 0)).await.is_empty());
        assert!(engine.tick(dt(2, 7, 57, 0)).await.is_empty());
    }

    #[tokio::test]
    async fn fires_at_most_once_per_day() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier.clone());
        let user = Uuid::new_v4();
        engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        assert_eq!(engine.tick(dt(2, 8, 0, 30)).await.len(), 1);
        assert!(engine.tick(dt(2, 8, 1, 0)).await.is_empty());
        assert!(engine.tick(dt(2, 8, 1, 30)).await.is_empty());
        // A new calendar day fires again
        assert_eq!(engine.tick(dt(3, 8, 0, 30)).await.len(), 1);
        assert_eq!(notifier.displayed_count(), 2);
    }

    #[tokio::test]
    async fn creation_day_is_suppressed() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let user = Uuid::new_v4();
        // Created at 07:00, scheduled for 08:00 the same day
        engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 7, 0, 0))
            .await
            .unwrap();

        assert!(engine.tick(dt(1, 8, 0, 30)).await.is_empty());
        assert_eq!(engine.tick(dt(2, 8, 0, 30)).await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_time_is_skipped_not_fatal() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let user = Uuid::new_v4();
        let good = engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        // Corrupt a stored entry directly; creation-time validation would
        // reject this, tick must survive it anyway
        {
            let mut state = engine.state.lock().await;
            let bad = ScheduleEntry {
                id: Uuid::new_v4(),
                time_of_day: "eight sharp".into(),
                ..state.entries.get(&good.id).unwrap().clone()
            };
            state.entries.insert(bad.id, bad);
        }

        let fired = engine.tick(dt(2, 8, 0, 30)).await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].schedule_id, good.id);
    }

    #[tokio::test]
    async fn denied_permission_still_registers_prompt() {
        let notifier = RecordingNotifier::new(Permission::Denied);
        let engine = engine(notifier.clone());
        let user = Uuid::new_v4();
        engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        let fired = engine.tick(dt(2, 8, 0, 30)).await;
        assert_eq!(fired.len(), 1);
        assert!(!fired[0].notified);
        assert_eq!(notifier.displayed_count(), 0);
        // The in-app prompt is independent of platform permission
        assert_eq!(engine.pending_prompts(user).await.len(), 1);
    }

    #[tokio::test]
    async fn acknowledge_is_last_write_wins() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let user = Uuid::new_v4();
        let entry = engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();
        engine.tick(dt(2, 8, 0, 30)).await;

        engine
            .acknowledge(user, entry.id, AckStatus::Taken, dt(2, 8, 1, 0))
            .await
            .unwrap();
        let after = engine
            .acknowledge(user, entry.id, AckStatus::NotTaken, dt(2, 8, 1, 5))
            .await
            .unwrap();

        assert_eq!(after.status, AckStatus::NotTaken);
        // Acknowledging never advances completion
        assert_eq!(after.days_completed, 0);
    }

    #[tokio::test]
    async fn acknowledge_resolves_pending_prompt() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let user = Uuid::new_v4();
        let entry = engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        engine.tick(dt(2, 8, 0, 30)).await;
        assert_eq!(engine.pending_prompts(user).await.len(), 1);

        engine
            .acknowledge(user, entry.id, AckStatus::Taken, dt(2, 8, 1, 0))
            .await
            .unwrap();
        assert!(engine.pending_prompts(user).await.is_empty());
    }

    #[tokio::test]
    async fn new_day_firing_resets_status() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let user = Uuid::new_v4();
        let entry = engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        engine.tick(dt(2, 8, 0, 30)).await;
        engine
            .acknowledge(user, entry.id, AckStatus::Taken, dt(2, 8, 1, 0))
            .await
            .unwrap();

        engine.tick(dt(3, 8, 0, 30)).await;
        let entry = engine.get(user, entry.id).await.unwrap();
        assert_eq!(entry.status, AckStatus::NotTaken);
    }

    #[tokio::test]
    async fn matching_entries_all_fire_in_one_tick() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let user = Uuid::new_v4();
        engine
            .add_schedule(user, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();
        engine
            .add_schedule(user, request("Cetirizine", "08:01"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        let fired = engine.tick(dt(2, 8, 0, 30)).await;
        assert_eq!(fired.len(), 2);
        assert_eq!(engine.pending_prompts(user).await.len(), 2);
    }

    #[tokio::test]
    async fn add_schedule_validates_input() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let user = Uuid::new_v4();

        let mut zero_duration = request("Paracetamol", "08:00");
        zero_duration.duration_days = 0;
        assert!(engine
            .add_schedule(user, zero_duration, dt(1, 12, 0, 0))
            .await
            .is_err());

        let bad_time = request("Paracetamol", "8 o'clock");
        assert!(engine
            .add_schedule(user, bad_time, dt(1, 12, 0, 0))
            .await
            .is_err());

        let empty_name = request("", "08:00");
        assert!(engine
            .add_schedule(user, empty_name, dt(1, 12, 0, 0))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn list_and_get_are_scoped_per_user() {
        let notifier = RecordingNotifier::new(Permission::Granted);
        let engine = engine(notifier);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let entry = engine
            .add_schedule(alice, request("Paracetamol", "08:00"), dt(1, 12, 0, 0))
            .await
            .unwrap();

        assert_eq!(engine.list(alice).await.len(), 1);
        assert!(engine.list(bob).await.is_empty());
        assert!(engine.get(bob, entry.id).await.is_none());
        assert!(engine
            .acknowledge(bob, entry.id, AckStatus::Taken, dt(2, 8, 0, 0))
            .await
            .is_err());
    }
}
