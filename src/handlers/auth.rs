use axum::{extract::State, Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{
    jwt::{create_token_pair, verify_token, TokenPair, TokenType},
    middleware::AuthUser,
    password::{hash_password, verify_password},
};
use crate::error::{AppError, AppResult};
use crate::i18n::Language;
use crate::models::user::{User, UserProfile};
use crate::store::tokens::RefreshOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub preferred_language: Option<Language>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Create a token pair AND record the refresh token hash for rotation.
async fn issue_token_pair(
    state: &AppState,
    user_id: Uuid,
    email: &str,
    parent_token_id: Option<Uuid>,
) -> AppResult<TokenPair> {
    let tokens = create_token_pair(user_id, email, &state.config)?;
    state
        .tokens
        .store(
            user_id,
            &tokens.refresh_token,
            state.config.jwt_refresh_ttl_secs,
            parent_token_id,
        )
        .await;
    Ok(tokens)
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenPair>> {
    if body.email.is_empty() || !body.email.contains('@') || body.password.len() < 8 {
        return Err(AppError::Validation(
            "Email required and password must be at least 8 characters".into(),
        ));
    }
    if body.name.is_empty() {
        return Err(AppError::Validation("Name is required".into()));
    }

    let password_hash = hash_password(&body.password)?;
    let user = User {
        id: Uuid::new_v4(),
        email: body.email.clone(),
        password_hash,
        name: body.name,
        preferred_language: body.preferred_language.unwrap_or_default(),
        created_at: Utc::now(),
    };

    let user = state
        .users
        .insert(user)
        .await
        .map_err(|_| AppError::Conflict("Email already registered".into()))?;

    let tokens = issue_token_pair(&state, user.id, &user.email, None).await?;
    Ok(Json(tokens))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let user = state
        .users
        .find_by_email(&body.email)
        .await
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let tokens = issue_token_pair(&state, user.id, &user.email, None).await?;
    Ok(Json(tokens))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    let token_data = verify_token(&body.refresh_token, &state.config)?;

    if token_data.claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized);
    }

    match state.tokens.consume(&body.refresh_token).await {
        RefreshOutcome::Rotated { token_id, user_id } => {
            // Verify the token belongs to the claimed user
            if user_id != token_data.claims.sub {
                return Err(AppError::Unauthorized);
            }
            let tokens = issue_token_pair(
                &state,
                user_id,
                &token_data.claims.email,
                Some(token_id),
            )
            .await?;
            Ok(Json(tokens))
        }
        RefreshOutcome::ReuseDetected { user_id } => {
            tracing::warn!(
                user_id = %user_id,
                "Refresh token reuse detected — all tokens for user revoked"
            );
            Err(AppError::Unauthorized)
        }
        RefreshOutcome::Invalid => Err(AppError::Unauthorized),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    state.tokens.revoke_all_for_user(auth_user.id).await;
    Ok(Json(serde_json::json!({ "message": "Logged out successfully" })))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserProfile>> {
    let user = state
        .users
        .get(auth_user.id)
        .await
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}
