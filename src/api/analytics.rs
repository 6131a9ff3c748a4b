//! Admin analytics endpoints

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db;
use crate::state::AppState;

use super::{ApiResult, internal};

/// GET /analytics/overview
pub async fn overview(State(state): State<AppState>) -> ApiResult<db::analytics::Overview> {
    let overview = db::analytics::overview(&state.pool).await.map_err(internal)?;
    Ok(Json(overview))
}

#[derive(Deserialize)]
pub struct SalesQuery {
    /// Calendar year, default: the current year
    pub year: Option<i32>,
}

/// GET /analytics/sales?year=
pub async fn sales(
    State(state): State<AppState>,
    Query(q): Query<SalesQuery>,
) -> ApiResult<Vec<db::analytics::SalesPoint>> {
    use chrono::Datelike;
    let year = q.year.unwrap_or_else(|| chrono::Utc::now().year());
    let points = db::analytics::sales_by_month(&state.pool, year)
        .await
        .map_err(internal)?;
    Ok(Json(points))
}

#[derive(Deserialize)]
pub struct TopQuery {
    pub limit: Option<i64>,
}

/// GET /analytics/top-products
pub async fn top_products(
    State(state): State<AppState>,
    Query(q): Query<TopQuery>,
) -> ApiResult<Vec<db::analytics::TopProduct>> {
    let top = db::analytics::top_products(&state.pool, q.limit.unwrap_or(10))
        .await
        .map_err(internal)?;
    Ok(Json(top))
}

/// GET /analytics/products
pub async fn products(State(state): State<AppState>) -> ApiResult<db::analytics::ProductStats> {
    let stats = db::analytics::product_stats(&state.pool)
        .await
        .map_err(internal)?;
    Ok(Json(stats))
}
