//! Payment endpoints

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use crate::auth::UserIdentity;
use crate::db;
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::{email, stripe};

use super::{ApiResult, internal};

/// GET /payment/mine
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Vec<db::payments::Payment>> {
    let payments = db::payments::list_for_user(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(payments))
}

/// GET /payment/{id} — owner or admin
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> ApiResult<db::payments::Payment> {
    let payment = db::payments::find(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;

    if payment.user_id != identity.user_id && !identity.is_admin() {
        return Err(AppError::new(ErrorCode::PermissionDenied));
    }

    Ok(Json(payment))
}

/// POST /payment/refund/{id} (admin) — full refund via Stripe
pub async fn refund(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<db::payments::Payment> {
    let payment = db::payments::find(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;

    if payment.status != "succeeded" {
        return Err(AppError::new(ErrorCode::RefundNotAllowed));
    }

    stripe::create_refund(&state.http, &state.stripe_secret_key, &payment.transaction_id)
        .await
        .map_err(|e| {
            tracing::error!("Stripe refund failed: {e}");
            AppError::new(ErrorCode::PaymentProviderError)
        })?;

    // The charge.refunded webhook also lands here; both writes are
    // idempotent on the same terminal state.
    db::payments::mark_refunded(&state.pool, &payment.id)
        .await
        .map_err(internal)?;
    db::orders::mark_refunded(&state.pool, &payment.order_id)
        .await
        .map_err(internal)?;

    if let Ok(Some(user)) = db::users::find_by_id(&state.pool, &payment.user_id).await {
        let _ = email::send_refund_processed(
            &state.ses,
            &state.ses_from_email,
            &user.email,
            &payment.order_id,
        )
        .await;
    }

    let payment = db::payments::find(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::PaymentNotFound))?;
    Ok(Json(payment))
}
