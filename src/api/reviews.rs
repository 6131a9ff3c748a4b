//! Product review endpoints

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::auth::UserIdentity;
use crate::db;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;

use super::{ApiResult, internal};

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
}

/// POST /review/{product_id} — create or replace the caller's review
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(product_id): Path<String>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<db::reviews::Review> {
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::validation("Rating must be between 1 and 5"));
    }

    db::products::find(&state.pool, &product_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let review = db::reviews::upsert(
        &state.pool,
        &product_id,
        &identity.user_id,
        req.rating,
        req.comment.trim(),
    )
    .await
    .map_err(internal)?;

    Ok(Json(review))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /review/{product_id}
pub async fn list_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(q): Query<ListQuery>,
) -> ApiResult<db::reviews::ReviewPage> {
    let page = db::reviews::list_for_product(
        &state.pool,
        &product_id,
        q.page.unwrap_or(1),
        q.per_page.unwrap_or(20),
    )
    .await
    .map_err(internal)?;
    Ok(Json(page))
}

#[derive(Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// PATCH /review/{id} — owner edits their own review
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
    Json(req): Json<UpdateReviewRequest>,
) -> ApiResult<db::reviews::Review> {
    if req.rating.is_some_and(|r| !(1..=5).contains(&r)) {
        return Err(AppError::validation("Rating must be between 1 and 5"));
    }

    let review = db::reviews::update(
        &state.pool,
        &id,
        &identity.user_id,
        req.rating,
        req.comment.as_deref().map(str::trim),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::not_found("Review"))?;

    Ok(Json(review))
}

/// DELETE /review/{id} — owner deletes their own, admin deletes any
pub async fn delete(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let owner = (!identity.is_admin()).then_some(identity.user_id.as_str());
    let deleted = db::reviews::delete(&state.pool, &id, owner)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(AppError::not_found("Review"));
    }
    Ok(Json(serde_json::json!({ "message": "Review deleted" })))
}
