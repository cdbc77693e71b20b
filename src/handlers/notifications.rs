use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::AuthUser;
use crate::error::AppResult;
use crate::notify::{Notifier, Permission};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportPermissionRequest {
    pub permission: Permission,
}

/// GET /api/notifications/permission — current platform permission state.
pub async fn query_permission(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let permission = state.notifier.query_permission();
    Ok(Json(json!({ "permission": permission })))
}

/// POST /api/notifications/permission — ask for permission. Returns whether
/// notifications are now granted; `false` with no prompt when unsupported or
/// previously denied.
pub async fn request_permission(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<Value>> {
    let granted = state.notifier.request_permission();
    if !granted {
        tracing::info!(user_id = %auth_user.id, "Notification permission not granted, reminders stay in-app only");
    }
    Ok(Json(json!({
        "granted": granted,
        "permission": state.notifier.query_permission(),
    })))
}

/// PUT /api/notifications/permission — the client reports the outcome of the
/// browser's own permission prompt, so the server-side gate matches it.
pub async fn report_permission(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(body): Json<ReportPermissionRequest>,
) -> AppResult<Json<Value>> {
    state.notifier.set_permission(body.permission);
    tracing::info!(user_id = %auth_user.id, permission = ?body.permission, "Notification permission reported");
    Ok(Json(json!({ "permission": body.permission })))
}
