//! Cart endpoints

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

pub const MAX_QUANTITY_PER_PRODUCT: i32 = 10;

/// Recompute subtotal and totals after an item change. A stored discount
/// code is revalidated against the new subtotal and dropped if it no
/// longer applies; the discount is always recomputed from the subtotal,
/// never compounded onto a previous total.
pub async fn recompute(state: &AppState, cart_id: &str) -> Result<CartDetail, AppError> {
    let cart = db::carts::find_by_id(&state.pool, cart_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CartNotFound))?;

    let subtotal = db::carts::compute_subtotal(&state.pool, cart_id)
        .await
        .map_err(internal)?;

    let (code, amount) = match &cart.discount_code {
        Some(code) => {
            let discount = db::discounts::find_by_code(&state.pool, code)
                .await
                .map_err(internal)?;
            match discount {
                Some(d)
                    if d.is_active
                        && d.expires_at > now_millis()
                        && subtotal >= d.min_cart_total =>
                {
                    (Some(code.clone()), d.amount_for(subtotal))
                }
                _ => (None, Decimal::ZERO),
            }
        }
        None => (None, Decimal::ZERO),
    };

    let cart = db::carts::set_totals(&state.pool, cart_id, subtotal, code.as_deref(), amount)
        .await
        .map_err(internal)?;
    let items = db::carts::items(&state.pool, cart_id)
        .await
        .map_err(internal)?;

    Ok(CartDetail { cart, items })
}

/// GET /cart
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<CartDetail> {
    let cart = db::carts::get_or_create(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?;
    let detail = recompute(&state, &cart.id).await?;
    Ok(Json(detail))
}

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i32,
}

/// POST /cart/add — add to the existing line quantity
pub async fn add(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<CartDetail> {
    if req.quantity < 1 {
        return Err(AppError::validation("Quantity must be at least 1"));
    }

    let product = db::products::find(&state.pool, &req.product_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    if !product.is_active {
        return Err(AppError::new(ErrorCode::ProductInactive));
    }

    let cart = db::carts::get_or_create(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?;

    let existing = db::carts::item_quantity(&state.pool, &cart.id, &req.product_id)
        .await
        .map_err(internal)?
        .unwrap_or(0);
    let new_quantity = existing + req.quantity;

    set_line(&state, &cart.id, &product, new_quantity).await?;

    let detail = recompute(&state, &cart.id).await?;
    Ok(Json(detail))
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub product_id: String,
    /// Absolute quantity; 0 removes the line
    pub quantity: i32,
}

/// PUT /cart/update — set a line to an absolute quantity
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<CartDetail> {
    if req.quantity < 0 {
        return Err(AppError::validation("Quantity must be non-negative"));
    }

    let cart = db::carts::find_by_user(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CartNotFound))?;

    if req.quantity == 0 {
        db::carts::remove_item(&state.pool, &cart.id, &req.product_id)
            .await
            .map_err(internal)?;
    } else {
        let product = db::products::find(&state.pool, &req.product_id)
            .await
            .map_err(internal)?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
        if !product.is_active {
            return Err(AppError::new(ErrorCode::ProductInactive));
        }
        set_line(&state, &cart.id, &product, req.quantity).await?;
    }

    let detail = recompute(&state, &cart.id).await?;
    Ok(Json(detail))
}

async fn set_line(
    state: &AppState,
    cart_id: &str,
    product: &db::products::Product,
    quantity: i32,
) -> Result<(), AppError> {
    if quantity > MAX_QUANTITY_PER_PRODUCT {
        return Err(AppError::new(ErrorCode::QuantityLimitExceeded));
    }
    if quantity > product.stock {
        return Err(AppError::new(ErrorCode::InsufficientStock)
            .with_detail("available", product.stock));
    }

    db::carts::upsert_item(&state.pool, cart_id, &product.id, quantity, product.price)
        .await
        .map_err(internal)?;
    Ok(())
}

/// DELETE /cart/remove/{product_id}
pub async fn remove(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(product_id): Path<String>,
) -> ApiResult<CartDetail> {
    let cart = db::carts::find_by_user(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CartNotFound))?;

    db::carts::remove_item(&state.pool, &cart.id, &product_id)
        .await
        .map_err(internal)?;

    let detail = recompute(&state, &cart.id).await?;
    Ok(Json(detail))
}

/// DELETE /cart/clear
pub async fn clear(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<CartDetail> {
    let cart = db::carts::find_by_user(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CartNotFound))?;

    db::carts::clear_items(&state.pool, &cart.id)
        .await
        .map_err(internal)?;

    let detail = recompute(&state, &cart.id).await?;
    Ok(Json(detail))
}
