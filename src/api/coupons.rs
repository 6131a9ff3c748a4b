//! Coupon endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::auth::UserIdentity;
use crate::db;
use crate::db::coupons::RedeemOutcome;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, internal};

/// GET /coupon/all (admin)
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<db::coupons::Coupon>> {
    let coupons = db::coupons::list(&state.pool).await.map_err(internal)?;
    Ok(Json(coupons))
}

#[derive(Deserialize)]
pub struct CreateCouponRequest {
    pub code: String,
    pub kind: String,
    pub value: Decimal,
    pub expires_at: i64,
    pub usage_limit: Option<i32>,
    pub min_purchase_total: Option<Decimal>,
    #[serde(default = "empty_array")]
    pub product_ids: serde_json::Value,
}

fn empty_array() -> serde_json::Value {
    serde_json::Value::Array(vec![])
}

/// POST /coupon/add (admin)
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<CreateCouponRequest>,
) -> ApiResult<db::coupons::Coupon> {
    let code = req.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::validation("Code is required"));
    }
    match req.kind.as_str() {
        "percentage" => {
            if req.value <= Decimal::ZERO || req.value > Decimal::from(100) {
                return Err(AppError::validation("Percentage must be between 0 and 100"));
            }
        }
        "fixed" => {
            if req.value <= Decimal::ZERO {
                return Err(AppError::validation("Fixed amount must be positive"));
            }
        }
        _ => return Err(AppError::validation("Kind must be 'percentage' or 'fixed'")),
    }
    if req.expires_at <= now_millis() {
        return Err(AppError::validation("Expiry must be in the future"));
    }
    if req.usage_limit.is_some_and(|l| l < 1) {
        return Err(AppError::validation("Usage limit must be at least 1"));
    }
    if !req.product_ids.is_array() {
        return Err(AppError::validation("product_ids must be an array"));
    }

    let coupon = db::coupons::create(
        &state.pool,
        db::coupons::NewCoupon {
            code: &code,
            kind: &req.kind,
            value: req.value,
            expires_at: req.expires_at,
            usage_limit: req.usage_limit,
            min_purchase_total: req.min_purchase_total,
            product_ids: &req.product_ids,
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

    Ok(Json(coupon))
}

#[derive(Deserialize)]
pub struct UpdateCouponRequest {
    pub value: Option<Decimal>,
    pub expires_at: Option<i64>,
    pub usage_limit: Option<i32>,
    pub min_purchase_total: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// PATCH /coupon/{id} (admin)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCouponRequest>,
) -> ApiResult<db::coupons::Coupon> {
    if req.value.is_some_and(|v| v <= Decimal::ZERO) {
        return Err(AppError::validation("Value must be positive"));
    }

    let coupon = db::coupons::update(
        &state.pool,
        &id,
        db::coupons::CouponUpdate {
            value: req.value,
            expires_at: req.expires_at,
            usage_limit: req.usage_limit,
            min_purchase_total: req.min_purchase_total,
            is_active: req.is_active,
        },
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::not_found("Coupon"))?;

    Ok(Json(coupon))
}

/// DELETE /coupon/{id} (admin)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let deleted = db::coupons::delete(&state.pool, &id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(AppError::not_found("Coupon"));
    }
    Ok(Json(serde_json::json!({ "message": "Coupon deleted" })))
}

#[derive(Deserialize)]
pub struct ApplyRequest {
    pub codes: Vec<String>,
}

#[derive(Serialize)]
pub struct AppliedCoupon {
    pub code: String,
    pub eligible_total: Decimal,
    pub amount: Decimal,
}

#[derive(Serialize)]
pub struct ApplyResponse {
    pub subtotal: Decimal,
    pub applied: Vec<AppliedCoupon>,
    pub discount_total: Decimal,
    pub total: Decimal,
}

fn redeem_failure(outcome: RedeemOutcome, code: String) -> AppError {
    let err = match outcome {
        RedeemOutcome::AlreadyUsed => ErrorCode::CouponAlreadyUsed,
        _ => ErrorCode::CouponExhausted,
    };
    AppError::new(err).with_detail("code", code)
}

/// POST /coupon/apply — redeem coupon codes against the caller's cart.
/// Amounts are computed from the server-side cart over the products each
/// coupon is scoped to. All redemptions happen in one transaction: if any
/// code turns out used or exhausted, none of the others are burned, and a
/// coupon can never exceed its usage limit no matter how requests
/// interleave.
pub async fn apply(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<ApplyRequest>,
) -> ApiResult<ApplyResponse> {
    if req.codes.is_empty() {
        return Err(AppError::validation("At least one code is required"));
    }

    let cart = db::carts::get_or_create(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?;
    let items = db::carts::items(&state.pool, &cart.id)
        .await
        .map_err(internal)?;
    if items.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty));
    }

    let subtotal: Decimal = items.iter().map(|i| i.line_total).sum();

    // Validate every code before redeeming any of them
    let mut coupons = Vec::with_capacity(req.codes.len());
    for raw in &req.codes {
        let code = raw.trim().to_uppercase();

        let coupon = db::coupons::find_by_code(&state.pool, &code)
            .await
            .map_err(internal)?
            .ok_or_else(|| AppError::new(ErrorCode::CodeInvalid).with_detail("code", code.clone()))?;

        if !coupon.is_active {
            return Err(AppError::new(ErrorCode::CodeInvalid).with_detail("code", code));
        }
        if coupon.expires_at <= now_millis() {
            return Err(AppError::new(ErrorCode::CodeExpired).with_detail("code", code));
        }

        let scoped = coupon.scoped_product_ids();
        let eligible_total: Decimal = if scoped.is_empty() {
            subtotal
        } else {
            items
                .iter()
                .filter(|i| scoped.contains(&i.product_id))
                .map(|i| i.line_total)
                .sum()
        };

        if eligible_total <= Decimal::ZERO {
            return Err(AppError::with_message(
                ErrorCode::CodeInvalid,
                "Coupon does not apply to any product in the cart",
            )
            .with_detail("code", code));
        }
        if let Some(min) = coupon.min_purchase_total
            && subtotal < min
        {
            return Err(AppError::new(ErrorCode::MinPurchaseNotMet)
                .with_detail("code", code)
                .with_detail("min_purchase_total", min.to_string()));
        }

        coupons.push((code, coupon, eligible_total));
    }

    let mut tx = state.pool.begin().await.map_err(internal)?;

    let mut applied = Vec::with_capacity(coupons.len());
    let mut discount_total = Decimal::ZERO;
    for (code, coupon, eligible_total) in coupons {
        match db::coupons::redeem(&mut tx, &coupon.id, &identity.user_id)
            .await
            .map_err(internal)?
        {
            RedeemOutcome::Redeemed => {}
            outcome => {
                tx.rollback().await.map_err(internal)?;
                return Err(redeem_failure(outcome, code));
            }
        }

        let amount = coupon.amount_for(eligible_total);
        discount_total += amount;
        applied.push(AppliedCoupon {
            code,
            eligible_total,
            amount,
        });
    }

    tx.commit().await.map_err(internal)?;

    let total = (subtotal - discount_total).max(Decimal::ZERO);

    Ok(Json(ApplyResponse {
        subtotal,
        applied,
        discount_total,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeem_failure_maps_outcome_and_keeps_code() {
        let err = redeem_failure(RedeemOutcome::AlreadyUsed, "WELCOME".into());
        assert_eq!(err.code, ErrorCode::CouponAlreadyUsed);
        assert_eq!(err.details.unwrap().get("code").unwrap(), "WELCOME");

        let err = redeem_failure(RedeemOutcome::Exhausted, "FLASH".into());
        assert_eq!(err.code, ErrorCode::CouponExhausted);
    }
}
