//! Product catalog endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::db::products::ProductFilter;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util::slugify;

use super::{ApiResult, internal};

#[derive(Deserialize)]
pub struct ListQuery {
    pub category_id: Option<String>,
    pub search: Option<String>,
    pub name: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub is_active: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /product/all
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> ApiResult<db::products::ProductPage> {
    let filter = ProductFilter {
        category_id: q.category_id,
        search: q.search.filter(|s| !s.trim().is_empty()),
        name: q.name.filter(|s| !s.trim().is_empty()),
        min_price: q.min_price,
        max_price: q.max_price,
        min_stock: q.min_stock,
        max_stock: q.max_stock,
        is_active: q.is_active,
        sort_by: q.sort_by,
        sort_order: q.sort_order,
        page: q.page.unwrap_or(1),
        per_page: q.per_page.unwrap_or(20),
    };

    let page = db::products::list(&state.pool, &filter)
        .await
        .map_err(internal)?;
    Ok(Json(page))
}

#[derive(Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: db::products::Product,
    pub average_rating: f64,
    pub review_count: i64,
}

/// GET /product/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ProductDetail> {
    let product = db::products::find(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let (average_rating, review_count) = db::reviews::rating_summary(&state.pool, &id)
        .await
        .map_err(internal)?;

    Ok(Json(ProductDetail {
        product,
        average_rating,
        review_count,
    }))
}

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub sku: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub category_id: String,
    #[serde(default = "empty_array")]
    pub images: serde_json::Value,
    #[serde(default = "empty_array")]
    pub tags: serde_json::Value,
    #[serde(default = "empty_array")]
    pub keywords: serde_json::Value,
    #[serde(default)]
    pub meta_title: String,
    #[serde(default)]
    pub meta_description: String,
}

fn empty_array() -> serde_json::Value {
    serde_json::Value::Array(vec![])
}

/// SKUs are stored uppercased so the unique constraint cannot be dodged
/// by case variants.
fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

/// POST /product/add (admin)
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> ApiResult<db::products::Product> {
    let name = req.name.trim();
    if name.is_empty() || req.sku.trim().is_empty() {
        return Err(AppError::validation("Name and SKU are required"));
    }
    if req.price < Decimal::ZERO || req.stock < 0 {
        return Err(AppError::validation("Price and stock must be non-negative"));
    }

    db::categories::find(&state.pool, &req.category_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound))?;

    let slug = slugify(name);
    let sku = normalize_sku(&req.sku);
    let product = db::products::create(
        &state.pool,
        db::products::NewProduct {
            name,
            slug: &slug,
            sku: &sku,
            description: &req.description,
            price: req.price,
            stock: req.stock,
            category_id: &req.category_id,
            images: &req.images,
            tags: &req.tags,
            keywords: &req.keywords,
            meta_title: &req.meta_title,
            meta_description: &req.meta_description,
        },
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::with_message(
            ErrorCode::AlreadyExists,
            "A product with this name or SKU already exists",
        ),
        _ => internal(e),
    })?;

    Ok(Json(product))
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<String>,
    pub images: Option<serde_json::Value>,
    pub tags: Option<serde_json::Value>,
    pub keywords: Option<serde_json::Value>,
    pub is_active: Option<bool>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

/// PATCH /product/{id} (admin)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> ApiResult<db::products::Product> {
    if req.price.is_some_and(|p| p < Decimal::ZERO) || req.stock.is_some_and(|s| s < 0) {
        return Err(AppError::validation("Price and stock must be non-negative"));
    }
    if let Some(category_id) = &req.category_id {
        db::categories::find(&state.pool, category_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| AppError::new(ErrorCode::CategoryNotFound))?;
    }

    let slug = req.name.as_deref().map(slugify);
    let sku = req.sku.as_deref().map(normalize_sku);
    let product = db::products::update(
        &state.pool,
        &id,
        db::products::ProductUpdate {
            name: req.name.as_deref().map(str::trim),
            slug: slug.as_deref(),
            sku: sku.as_deref(),
            description: req.description.as_deref(),
            price: req.price,
            stock: req.stock,
            category_id: req.category_id.as_deref(),
            images: req.images.as_ref(),
            tags: req.tags.as_ref(),
            keywords: req.keywords.as_ref(),
            is_active: req.is_active,
            meta_title: req.meta_title.as_deref(),
            meta_description: req.meta_description.as_deref(),
        },
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::with_message(
            ErrorCode::AlreadyExists,
            "A product with this name or SKU already exists",
        ),
        _ => internal(e),
    })?
    .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    Ok(Json(product))
}

/// DELETE /product/{id} (admin)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let deleted = db::products::delete(&state.pool, &id)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                // Ordered products stay in history; deactivate instead
                AppError::with_message(
                    ErrorCode::InvalidRequest,
                    "Product has orders; deactivate it instead of deleting",
                )
            }
            _ => internal(e),
        })?;
    if !deleted {
        return Err(AppError::new(ErrorCode::ProductNotFound));
    }
    Ok(Json(serde_json::json!({ "message": "Product deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sku_uppercases_and_trims() {
        assert_eq!(normalize_sku(" abc-1 "), "ABC-1");
        assert_eq!(normalize_sku("ABC-1"), "ABC-1");
        // Case variants collapse to the same stored SKU
        assert_eq!(normalize_sku("abc-1"), normalize_sku("Abc-1"));
    }
}
