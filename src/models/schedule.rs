use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One user-configured recurring medication reminder. Lives in memory only;
/// entries do not survive a process restart and there is no delete operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    /// Local wall-clock "HH:MM". Stored as entered and re-parsed on every
    /// scan so one malformed entry can never abort the whole loop.
    pub time_of_day: String,
    pub days_completed: u32,
    pub status: AckStatus,
    /// Dedupe key for firings: at most one reminder per calendar day,
    /// compared on the date component.
    pub last_triggered_at: NaiveDateTime,
    pub last_updated: Option<NaiveDateTime>,
}

impl ScheduleEntry {
    pub fn parse_time_of_day(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.time_of_day, "%H:%M").ok()
    }

    /// `days_completed / duration_days * 100`. `duration_days >= 1` is
    /// enforced at creation, so the division is always defined.
    pub fn progress_percent(&self) -> f64 {
        (self.days_completed as f64 / self.duration_days as f64) * 100.0
    }
}

/// The user's recorded response to the most recent firing. Day-scoped: each
/// new firing resets it to `NotTaken` until the user answers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Taken,
    NotTaken,
}

impl Default for AckStatus {
    fn default() -> Self {
        Self::NotTaken
    }
}

/// POST /api/schedules
#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, message = "Medicine name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Dosage is required"))]
    pub dosage: String,
    pub start_date: NaiveDate,
    #[validate(range(min = 1, message = "Duration must be at least 1 day"))]
    pub duration_days: u32,
    #[validate(length(min = 1, message = "Time of day is required"))]
    pub time_of_day: String,
}

/// POST /api/schedules/:id/ack
#[derive(Debug, Deserialize)]
pub struct AckRequest {
    pub status: AckStatus,
}

/// List/get response shape: the entry plus its derived completion progress.
#[derive(Debug, Serialize)]
pub struct ScheduleWithProgress {
    #[serde(flatten)]
    pub entry: ScheduleEntry,
    pub progress_percent: f64,
}

impl From<ScheduleEntry> for ScheduleWithProgress {
    fn from(entry: ScheduleEntry) -> Self {
        let progress_percent = entry.progress_percent();
        Self {
            entry,
            progress_percent,
        }
    }
}
