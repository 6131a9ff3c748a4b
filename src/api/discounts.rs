//! Cart-level discount endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::UserIdentity;
use crate::db;
use crate::db::carts::CartDetail;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, internal};

/// GET /discount/all (admin)
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<db::discounts::Discount>> {
    let discounts = db::discounts::list(&state.pool).await.map_err(internal)?;
    Ok(Json(discounts))
}

#[derive(Deserialize)]
pub struct CreateDiscountRequest {
    pub code: String,
    pub kind: String,
    pub value: Decimal,
    #[serde(default)]
    pub min_cart_total: Decimal,
    pub expires_at: i64,
}

fn validate_kind_value(kind: &str, value: Decimal) -> Result<(), AppError> {
    match kind {
        "percentage" => {
            if value <= Decimal::ZERO || value > Decimal::from(100) {
                return Err(AppError::validation("Percentage must be between 0 and 100"));
            }
        }
        "fixed" => {
            if value <= Decimal::ZERO {
                return Err(AppError::validation("Fixed amount must be positive"));
            }
        }
        _ => return Err(AppError::validation("Kind must be 'percentage' or 'fixed'")),
    }
    Ok(())
}

/// POST /discount/add (admin)
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<CreateDiscountRequest>,
) -> ApiResult<db::discounts::Discount> {
    let code = req.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::validation("Code is required"));
    }
    validate_kind_value(&req.kind, req.value)?;
    if req.expires_at <= now_millis() {
        return Err(AppError::validation("Expiry must be in the future"));
    }

    let discount = db::discounts::create(
        &state.pool,
        db::discounts::NewDiscount {
            code: &code,
            kind: &req.kind,
            value: req.value,
            min_cart_total: req.min_cart_total,
            expires_at: req.expires_at,
            added_by: &identity.user_id,
        },
    )
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::with_message(ErrorCode::AlreadyExists, "This code already exists")
        }
        _ => internal(e),
    })?;

    Ok(Json(discount))
}

#[derive(Deserialize)]
pub struct UpdateDiscountRequest {
    pub value: Option<Decimal>,
    pub min_cart_total: Option<Decimal>,
    pub expires_at: Option<i64>,
    pub is_active: Option<bool>,
}

/// PATCH /discount/{id} (admin)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDiscountRequest>,
) -> ApiResult<db::discounts::Discount> {
    if req.value.is_some_and(|v| v <= Decimal::ZERO) {
        return Err(AppError::validation("Value must be positive"));
    }

    let discount = db::discounts::update(
        &state.pool,
        &id,
        db::discounts::DiscountUpdate {
            value: req.value,
            min_cart_total: req.min_cart_total,
            expires_at: req.expires_at,
            is_active: req.is_active,
        },
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::not_found("Discount"))?;

    Ok(Json(discount))
}

/// DELETE /discount/{id} (admin)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let deleted = db::discounts::delete(&state.pool, &id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(AppError::not_found("Discount"));
    }
    Ok(Json(serde_json::json!({ "message": "Discount deleted" })))
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub code: String,
}

/// POST /discount/apply — attach a discount code to the caller's cart.
/// The amount is always computed from the server-side subtotal.
pub async fn apply(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<ApplyRequest>,
) -> ApiResult<CartDetail> {
    let code = req.code.trim().to_uppercase();

    let cart = db::carts::get_or_create(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?;
    let subtotal = db::carts::compute_subtotal(&state.pool, &cart.id)
        .await
        .map_err(internal)?;
    if subtotal <= Decimal::ZERO {
        return Err(AppError::new(ErrorCode::CartEmpty));
    }

    let discount = db::discounts::find_by_code(&state.pool, &code)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CodeInvalid))?;

    if !discount.is_active {
        return Err(AppError::new(ErrorCode::CodeInvalid));
    }
    if discount.expires_at <= now_millis() {
        return Err(AppError::new(ErrorCode::CodeExpired));
    }
    if subtotal < discount.min_cart_total {
        return Err(AppError::new(ErrorCode::MinPurchaseNotMet)
            .with_detail("min_cart_total", discount.min_cart_total.to_string()));
    }

    let amount = discount.amount_for(subtotal);
    let cart = db::carts::set_totals(&state.pool, &cart.id, subtotal, Some(&code), amount)
        .await
        .map_err(internal)?;
    let items = db::carts::items(&state.pool, &cart.id)
        .await
        .map_err(internal)?;

    Ok(Json(CartDetail { cart, items }))
}
