//! Category endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::db;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util::slugify;

use super::{ApiResult, internal};

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /category/all
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<Vec<db::categories::Category>> {
    let categories = db::categories::list(&state.pool, q.include_inactive)
        .await
        .map_err(internal)?;
    Ok(Json(categories))
}

/// GET /category/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<db::categories::Category> {
    let category = db::categories::find(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound))?;
    Ok(Json(category))
}

#[derive(Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub image: Option<String>,
    #[serde(default)]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
}

/// POST /category/add (admin)
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<db::categories::Category> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Category name is required"));
    }

    let slug = slugify(name);
    let category = db::categories::create(
        &state.pool,
        db::categories::NewCategory {
            name,
            slug: &slug,
            description: &req.description,
            image: req.image.as_deref(),
            meta_title: &req.meta_title,
            meta_description: &req.meta_description,
        },
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::with_message(
            ErrorCode::AlreadyExists,
            "A category with this name already exists",
        ),
        _ => internal(e),
    })?;

    Ok(Json(category))
}

#[derive(Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub is_active: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// PATCH /category/{id} (admin)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCategoryRequest>,
) -> ApiResult<db::categories::Category> {
    let slug = req.name.as_deref().map(slugify);
    let category = db::categories::update(
        &state.pool,
        &id,
        db::categories::CategoryUpdate {
            name: req.name.as_deref().map(str::trim),
            slug: slug.as_deref(),
            description: req.description.as_deref(),
            image: req.image.as_deref(),
            is_active: req.is_active,
            meta_title: req.meta_title.as_deref(),
            meta_description: req.meta_description.as_deref(),
        },
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound))?;

    Ok(Json(category))
}

/// DELETE /category/{id} (admin)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let in_use = db::categories::product_count(&state.pool, &id)
        .await
        .map_err(internal)?;
    if in_use > 0 {
        return Err(AppError::new(ErrorCode::CategoryInUse)
            .with_detail("product_count", in_use));
    }

    let deleted = db::categories::delete(&state.pool, &id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(AppError::new(ErrorCode::CategoryNotFound));
    }

    Ok(Json(serde_json::json!({ "message": "Category deleted" })))
}
