use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::schedule::{AckRequest, CreateScheduleRequest, ScheduleWithProgress};
use crate::reminder::engine::{local_now, PendingPrompt};
use crate::AppState;

pub async fn create_schedule(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<CreateScheduleRequest>,
) -> AppResult<Json<ScheduleWithProgress>> {
    let entry = state
        .engine
        .add_schedule(auth_user.id, body, local_now())
        .await?;
    Ok(Json(entry.into()))
}

pub async fn list_schedules(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<ScheduleWithProgress>>> {
    let entries = state.engine.list(auth_user.id).await;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(schedule_id): Path<Uuid>,
) -> AppResult<Json<ScheduleWithProgress>> {
    let entry = state
        .engine
        .get(auth_user.id, schedule_id)
        .await
        .ok_or(AppError::NotFound("Schedule not found".into()))?;
    Ok(Json(entry.into()))
}

/// Resolve a firing with the user's taken / not-taken answer.
// TODO: product question — should a "taken" answer advance days_completed?
// The original flow displays the counter but never increments it; kept as-is
// pending clarification.
pub async fn acknowledge_schedule(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(schedule_id): Path<Uuid>,
    Json(body): Json<AckRequest>,
) -> AppResult<Json<ScheduleWithProgress>> {
    let entry = state
        .engine
        .acknowledge(auth_user.id, schedule_id, body.status, local_now())
        .await?;
    Ok(Json(entry.into()))
}

pub async fn list_prompts(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Vec<PendingPrompt>>> {
    Ok(Json(state.engine.pending_prompts(auth_user.id).await))
}
