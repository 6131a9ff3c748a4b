//! Account endpoints

use axum::{Extension, Json, extract::State};
use serde::Deserialize;

use crate::auth::UserIdentity;
use crate::db;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util::{hash_password, verify_password};

use super::{ApiResult, internal};

/// GET /user/me
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<db::users::User> {
    let user = db::users::find_by_id(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub addresses: Option<serde_json::Value>,
}

/// PATCH /user/me
pub async fn update_me(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<db::users::User> {
    if let Some(name) = &req.name
        && name.trim().is_empty()
    {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if let Some(addresses) = &req.addresses
        && !addresses.is_array()
    {
        return Err(AppError::validation("Addresses must be an array"));
    }

    let user = db::users::update_profile(
        &state.pool,
        &identity.user_id,
        req.name.as_deref().map(str::trim),
        req.avatar.as_deref(),
        req.addresses.as_ref(),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// PATCH /user/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<serde_json::Value> {
    if req.new_password.len() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooShort));
    }

    let user = db::users::find_by_id(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::not_found("User"))?;

    if !verify_password(&req.current_password, &user.password_hash) {
        return Err(AppError::new(ErrorCode::InvalidCredentials));
    }

    let hashed = hash_password(&req.new_password).map_err(internal)?;
    db::users::update_password(&state.pool, &user.id, &hashed)
        .await
        .map_err(internal)?;

    // Force other sessions to sign in again
    let _ = db::refresh_tokens::revoke_all(&state.pool, &user.id).await;

    Ok(Json(serde_json::json!({ "message": "Password changed" })))
}

/// DELETE /user/me
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<serde_json::Value> {
    let deleted = db::users::delete(&state.pool, &identity.user_id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                // Order history must stay intact for accounting
                AppError::with_message(
                    ErrorCode::InvalidRequest,
                    "Account has orders and cannot be deleted",
                )
            }
            _ => internal(e),
        })?;
    if !deleted {
        return Err(AppError::not_found("User"));
    }
    Ok(Json(serde_json::json!({ "message": "Account deleted" })))
}
