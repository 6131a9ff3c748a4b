//! Contact-form message endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::db;
use crate::email;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

use super::{ApiResult, internal};

#[derive(Deserialize)]
pub struct CreateMessageRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
}

/// POST /message/send (public)
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> ApiResult<db::messages::ContactMessage> {
    let email_addr = req.email.trim().to_lowercase();
    if req.name.trim().is_empty() || !email_addr.contains('@') {
        return Err(AppError::validation("Name and a valid email are required"));
    }
    if req.subject.trim().is_empty() || req.body.trim().is_empty() {
        return Err(AppError::validation("Subject and message are required"));
    }

    let message = db::messages::create(
        &state.pool,
        req.name.trim(),
        &email_addr,
        req.subject.trim(),
        req.body.trim(),
    )
    .await
    .map_err(internal)?;

    Ok(Json(message))
}

/// GET /message/all (admin)
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<db::messages::ContactMessage>> {
    let messages = db::messages::list(&state.pool).await.map_err(internal)?;
    Ok(Json(messages))
}

/// GET /message/{id} (admin)
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<db::messages::ContactMessage> {
    let message = db::messages::find(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::not_found("Message"))?;
    Ok(Json(message))
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub response: String,
}

/// POST /message/{id}/response (admin) — record and email the reply.
/// A message can only be answered once.
pub async fn respond(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> ApiResult<db::messages::ContactMessage> {
    let response = req.response.trim();
    if response.is_empty() {
        return Err(AppError::validation("Response is required"));
    }

    let message = db::messages::set_response(&state.pool, &id, response)
        .await
        .map_err(internal)?;
    let message = match message {
        Some(m) => m,
        None => {
            return Err(
                match db::messages::find(&state.pool, &id).await.map_err(internal)? {
                    Some(_) => AppError::with_message(
                        ErrorCode::InvalidRequest,
                        "Message has already been answered",
                    ),
                    None => AppError::not_found("Message"),
                },
            );
        }
    };

    let _ = email::send_message_response(
        &state.ses,
        &state.ses_from_email,
        &message.email,
        &message.subject,
        response,
    )
    .await;

    Ok(Json(message))
}

/// DELETE /message/{id} (admin)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let deleted = db::messages::delete(&state.pool, &id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(AppError::not_found("Message"));
    }
    Ok(Json(serde_json::json!({ "message": "Message deleted" })))
}
