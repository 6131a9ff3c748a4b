//! Order endpoints: cash orders, Stripe checkout, webhook and client
//! confirmation, and admin order management

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::UserIdentity;
use crate::db;
use crate::db::orders::{CreateOrderOutcome, Order, OrderDetail, OrderInput, OrderLine, ShippingInfo};
use crate::error::{AppError, ErrorCode};
use crate::state::AppState;
use crate::{email, stripe};

use super::{ApiResult, internal};

#[derive(Deserialize)]
pub struct ShippingRequest {
    pub street: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub phone: String,
}

impl ShippingRequest {
    fn validate(&self) -> Result<ShippingInfo, AppError> {
        if self.street.trim().is_empty()
            || self.city.trim().is_empty()
            || self.country.trim().is_empty()
        {
            return Err(AppError::validation(
                "Street, city and country are required",
            ));
        }
        Ok(ShippingInfo {
            street: self.street.trim().to_string(),
            city: self.city.trim().to_string(),
            country: self.country.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            phone: self.phone.trim().to_string(),
        })
    }
}

/// Load the caller's cart with fresh totals, refusing other users' carts.
async fn owned_cart(
    state: &AppState,
    cart_id: &str,
    user_id: &str,
) -> Result<db::carts::CartDetail, AppError> {
    let cart = db::carts::find_by_id(&state.pool, cart_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CartNotFound))?;
    if cart.user_id != user_id {
        return Err(AppError::new(ErrorCode::PermissionDenied));
    }
    let detail = super::cart::recompute(state, cart_id).await?;
    if detail.items.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty));
    }
    Ok(detail)
}

fn order_lines(detail: &db::carts::CartDetail) -> Vec<OrderLine> {
    detail
        .items
        .iter()
        .map(|i| OrderLine {
            product_id: i.product_id.clone(),
            quantity: i.quantity,
            unit_price: i.unit_price,
        })
        .collect()
}

async fn send_order_emails(state: &AppState, order: &Order) {
    let user = match db::users::find_by_id(&state.pool, &order.user_id).await {
        Ok(Some(u)) => u,
        _ => return,
    };
    let total = order.total.to_string();
    let _ = email::send_order_confirmation(
        &state.ses,
        &state.ses_from_email,
        &user.email,
        &order.id,
        &total,
    )
    .await;
    let _ = email::send_admin_order_notification(
        &state.ses,
        &state.ses_from_email,
        &state.admin_email,
        &order.id,
        &user.email,
        &total,
    )
    .await;
}

/// POST /order/cash/{cart_id}
pub async fn create_cash(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(cart_id): Path<String>,
    Json(req): Json<ShippingRequest>,
) -> ApiResult<OrderDetail> {
    let shipping = req.validate()?;
    let detail = owned_cart(&state, &cart_id, &identity.user_id).await?;
    let lines = order_lines(&detail);

    let outcome = db::orders::create_cash_order(
        &state.pool,
        OrderInput {
            user_id: &identity.user_id,
            cart_id: &cart_id,
            total: detail.cart.total,
            shipping,
            items: &lines,
        },
    )
    .await
    .map_err(internal)?;

    let order = match outcome {
        CreateOrderOutcome::Created(order) => order,
        CreateOrderOutcome::OutOfStock(product_id) => {
            return Err(AppError::new(ErrorCode::InsufficientStock)
                .with_detail("product_id", product_id));
        }
        CreateOrderOutcome::Inactive(product_id) => {
            return Err(
                AppError::new(ErrorCode::ProductInactive).with_detail("product_id", product_id)
            );
        }
        CreateOrderOutcome::AlreadyFinalized => return Err(internal("unexpected outcome")),
    };

    send_order_emails(&state, &order).await;

    let items = db::orders::items(&state.pool, &order.id)
        .await
        .map_err(internal)?;
    Ok(Json(OrderDetail { order, items }))
}

#[derive(serde::Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

/// POST /order/checkout/{cart_id} — create a Stripe Checkout Session
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(cart_id): Path<String>,
    Json(req): Json<ShippingRequest>,
) -> ApiResult<CheckoutResponse> {
    let shipping = req.validate()?;
    let detail = owned_cart(&state, &cart_id, &identity.user_id).await?;

    let user = db::users::find_by_id(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::not_found("User"))?;

    let mut items = Vec::with_capacity(detail.items.len());
    for line in &detail.items {
        let cents = stripe::to_cents(line.unit_price)
            .ok_or_else(|| internal("price out of range for Stripe"))?;
        items.push(stripe::CheckoutItem {
            name: line.name.clone(),
            unit_amount_cents: cents,
            quantity: line.quantity as i64,
        });
    }
    let discount_cents = stripe::to_cents(detail.cart.discount_amount)
        .ok_or_else(|| internal("discount out of range for Stripe"))?;

    let session = stripe::create_checkout_session(
        &state.http,
        &state.stripe_secret_key,
        &user.email,
        &cart_id,
        &items,
        discount_cents,
        &stripe::CheckoutShipping {
            street: shipping.street,
            city: shipping.city,
            country: shipping.country,
            postal_code: shipping.postal_code,
            phone: shipping.phone,
        },
        &state.checkout_success_url,
        &state.checkout_cancel_url,
    )
    .await
    .map_err(|e| {
        tracing::error!("Stripe checkout session failed: {e}");
        AppError::new(ErrorCode::PaymentProviderError)
    })?;

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Amounts come back from Stripe in cents; orders store NUMERIC(12,2).
fn amount_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Pull the cart reference, payment intent and amount out of a checkout
/// session. The cart id lives in `client_reference_id` with the metadata
/// copy as fallback.
fn session_refs(session: &serde_json::Value) -> Result<(&str, &str, i64), AppError> {
    let cart_id = session["client_reference_id"]
        .as_str()
        .or_else(|| session["metadata"]["cart_id"].as_str())
        .ok_or_else(|| AppError::validation("Session has no cart reference"))?;
    let payment_intent = session["payment_intent"]
        .as_str()
        .ok_or_else(|| AppError::validation("Session has no payment intent"))?;
    let amount_cents = session["amount_total"]
        .as_i64()
        .ok_or_else(|| AppError::validation("Session has no amount"))?;
    Ok((cart_id, payment_intent, amount_cents))
}

/// Build the order from a completed checkout session, whichever path
/// (webhook or client confirm) gets there first.
async fn finalize_from_session(
    state: &AppState,
    session: &serde_json::Value,
) -> Result<Order, AppError> {
    let (cart_id, payment_intent, amount_cents) = session_refs(session)?;

    let cart = db::carts::find_by_id(&state.pool, cart_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::CartNotFound))?;
    let items = db::carts::items(&state.pool, cart_id)
        .await
        .map_err(internal)?;

    let meta = &session["metadata"];
    let shipping = ShippingInfo {
        street: meta["ship_street"].as_str().unwrap_or("").to_string(),
        city: meta["ship_city"].as_str().unwrap_or("").to_string(),
        country: meta["ship_country"].as_str().unwrap_or("").to_string(),
        postal_code: meta["ship_postal_code"].as_str().unwrap_or("").to_string(),
        phone: meta["ship_phone"].as_str().unwrap_or("").to_string(),
    };

    let lines: Vec<OrderLine> = items
        .iter()
        .map(|i| OrderLine {
            product_id: i.product_id.clone(),
            quantity: i.quantity,
            unit_price: i.unit_price,
        })
        .collect();

    let outcome = db::orders::finalize_paid_order(
        &state.pool,
        OrderInput {
            user_id: &cart.user_id,
            cart_id,
            total: amount_from_cents(amount_cents),
            shipping,
            items: &lines,
        },
        payment_intent,
    )
    .await
    .map_err(internal)?;

    match outcome {
        CreateOrderOutcome::Created(order) => {
            tracing::info!(order_id = %order.id, "Card order finalized");
            send_order_emails(state, &order).await;
            Ok(order)
        }
        CreateOrderOutcome::AlreadyFinalized => {
            db::orders::find_by_payment_intent(&state.pool, payment_intent)
                .await
                .map_err(internal)?
                .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))
        }
        CreateOrderOutcome::OutOfStock(_) | CreateOrderOutcome::Inactive(_) => {
            Err(internal("unexpected outcome"))
        }
    }
}

/// POST /order/webhook — Stripe events (raw body for signature verification)
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let sig_header = match headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(s) => s,
        None => {
            tracing::warn!("Missing Stripe-Signature header");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let Err(e) =
        stripe::verify_webhook_signature(&body, sig_header, &state.stripe_webhook_secret)
    {
        tracing::warn!(error = e, "Webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    let event: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_type = event["type"].as_str().unwrap_or("");
    let event_id = match event["id"].as_str() {
        Some(id) => id,
        None => {
            tracing::warn!("Webhook event missing id");
            return StatusCode::BAD_REQUEST;
        }
    };
    tracing::info!(event_type = event_type, "Received Stripe webhook");

    // Idempotency: INSERT first, check rows_affected (eliminates TOCTOU race)
    match db::webhook_events::try_claim(&state.pool, event_id, event_type).await {
        Ok(false) => {
            tracing::info!(event_id = event_id, "Duplicate webhook event, skipping");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error recording webhook event");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
        Ok(true) => {}
    }

    let status = match event_type {
        "checkout.session.completed" => {
            let obj = match event.get("data").and_then(|d| d.get("object")) {
                Some(o) => o,
                None => return StatusCode::OK,
            };
            if obj["payment_status"].as_str() != Some("paid") {
                tracing::info!("Checkout session completed but not paid, skipping");
                return StatusCode::OK;
            }
            match finalize_from_session(&state, obj).await {
                Ok(_) => StatusCode::OK,
                Err(e) => {
                    tracing::error!(message = %e.message, "Failed to finalize order from webhook");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
        "charge.refunded" => handle_charge_refunded(&state, &event).await,
        _ => {
            tracing::debug!(event_type = event_type, "Unhandled webhook event type");
            StatusCode::OK
        }
    };

    // A failed attempt must not consume the claim: Stripe will redeliver,
    // and that retry has to be processed, not skipped as a duplicate.
    if status.is_server_error()
        && let Err(e) = db::webhook_events::release(&state.pool, event_id).await
    {
        tracing::error!(%e, event_id = event_id, "Failed to release webhook claim");
    }

    status
}

/// charge.refunded → mirror the refund onto payment and order
async fn handle_charge_refunded(state: &AppState, event: &serde_json::Value) -> StatusCode {
    let obj = match event.get("data").and_then(|d| d.get("object")) {
        Some(o) => o,
        None => return StatusCode::OK,
    };
    let payment_intent = match obj["payment_intent"].as_str() {
        Some(s) => s,
        None => return StatusCode::OK,
    };

    let order = match db::orders::find_by_payment_intent(&state.pool, payment_intent).await {
        Ok(Some(o)) => o,
        Ok(None) => {
            tracing::warn!(payment_intent = payment_intent, "Refund for unknown order");
            return StatusCode::OK;
        }
        Err(e) => {
            tracing::error!(%e, "DB error finding order for refund");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    if let Err(e) = db::orders::mark_refunded(&state.pool, &order.id).await {
        tracing::error!(%e, "Failed to mark order refunded");
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    let _ = sqlx::query("UPDATE payments SET status = 'refunded' WHERE order_id = $1")
        .bind(&order.id)
        .execute(&state.pool)
        .await;

    if let Ok(Some(user)) = db::users::find_by_id(&state.pool, &order.user_id).await {
        let _ =
            email::send_refund_processed(&state.ses, &state.ses_from_email, &user.email, &order.id)
                .await;
    }

    tracing::info!(order_id = %order.id, "Order refunded");
    StatusCode::OK
}

#[derive(Deserialize)]
pub struct ConfirmQuery {
    pub session_id: String,
}

/// GET /order/confirm?session_id= — client-side fallback when the webhook
/// has not landed yet. Safe to race with it: both paths share the same
/// idempotent finalization.
pub async fn confirm(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Query(q): Query<ConfirmQuery>,
) -> ApiResult<OrderDetail> {
    let session =
        stripe::retrieve_checkout_session(&state.http, &state.stripe_secret_key, &q.session_id)
            .await
            .map_err(|e| {
                tracing::error!("Stripe session retrieval failed: {e}");
                AppError::new(ErrorCode::PaymentProviderError)
            })?;

    if session["payment_status"].as_str() != Some("paid") {
        return Err(AppError::new(ErrorCode::PaymentNotCompleted));
    }

    let order = finalize_from_session(&state, &session).await?;
    if order.user_id != identity.user_id {
        return Err(AppError::new(ErrorCode::PermissionDenied));
    }

    let items = db::orders::items(&state.pool, &order.id)
        .await
        .map_err(internal)?;
    Ok(Json(OrderDetail { order, items }))
}

/// GET /order/mine
pub async fn list_mine(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Vec<Order>> {
    let orders = db::orders::list_for_user(&state.pool, &identity.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(orders))
}

/// GET /order/{id} — owner or admin
pub async fn get(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
    Path(id): Path<String>,
) -> ApiResult<OrderDetail> {
    let order = db::orders::find(&state.pool, &id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if order.user_id != identity.user_id && !identity.is_admin() {
        return Err(AppError::new(ErrorCode::PermissionDenied));
    }

    let items = db::orders::items(&state.pool, &id)
        .await
        .map_err(internal)?;
    Ok(Json(OrderDetail { order, items }))
}

#[derive(Deserialize)]
pub struct ListAllQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// GET /order/all (admin)
pub async fn list_all(
    State(state): State<AppState>,
    Query(q): Query<ListAllQuery>,
) -> ApiResult<Vec<Order>> {
    let orders = db::orders::list_all(
        &state.pool,
        q.page.unwrap_or(1),
        q.per_page.unwrap_or(50),
    )
    .await
    .map_err(internal)?;
    Ok(Json(orders))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub shipping_status: Option<String>,
}

const ORDER_STATUSES: &[&str] = &["pending", "paid", "shipped", "delivered", "cancelled"];
const SHIPPING_STATUSES: &[&str] = &["pending", "in_transit", "delivered"];

/// PATCH /order/{id}/status (admin)
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Order> {
    if let Some(s) = &req.status
        && !ORDER_STATUSES.contains(&s.as_str())
    {
        return Err(AppError::validation("Invalid order status"));
    }
    if let Some(s) = &req.shipping_status
        && !SHIPPING_STATUSES.contains(&s.as_str())
    {
        return Err(AppError::validation("Invalid shipping status"));
    }

    let order = db::orders::update_status(
        &state.pool,
        &id,
        req.status.as_deref(),
        req.shipping_status.as_deref(),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shipping(street: &str, city: &str, country: &str) -> ShippingRequest {
        ShippingRequest {
            street: street.into(),
            city: city.into(),
            country: country.into(),
            postal_code: " 28001 ".into(),
            phone: "".into(),
        }
    }

    #[test]
    fn test_shipping_validate_requires_street_city_country() {
        assert!(shipping("", "Madrid", "ES").validate().is_err());
        assert!(shipping("Calle Mayor 1", "  ", "ES").validate().is_err());
        assert!(shipping("Calle Mayor 1", "Madrid", "").validate().is_err());
    }

    #[test]
    fn test_shipping_validate_trims_fields() {
        let info = shipping(" Calle Mayor 1 ", "Madrid", "ES").validate().unwrap();
        assert_eq!(info.street, "Calle Mayor 1");
        assert_eq!(info.postal_code, "28001");
        assert_eq!(info.phone, "");
    }

    #[test]
    fn test_amount_from_cents() {
        assert_eq!(amount_from_cents(1999), Decimal::new(1999, 2));
        assert_eq!(amount_from_cents(0), Decimal::ZERO);
        assert_eq!(amount_from_cents(10000).to_string(), "100.00");
    }

    #[test]
    fn test_session_refs_reads_top_level_fields() {
        let session = serde_json::json!({
            "client_reference_id": "cart-1",
            "payment_intent": "pi_123",
            "amount_total": 4999,
        });
        let (cart_id, pi, cents) = session_refs(&session).unwrap();
        assert_eq!(cart_id, "cart-1");
        assert_eq!(pi, "pi_123");
        assert_eq!(cents, 4999);
    }

    #[test]
    fn test_session_refs_falls_back_to_metadata_cart_id() {
        let session = serde_json::json!({
            "metadata": { "cart_id": "cart-2" },
            "payment_intent": "pi_456",
            "amount_total": 100,
        });
        let (cart_id, _, _) = session_refs(&session).unwrap();
        assert_eq!(cart_id, "cart-2");
    }

    #[test]
    fn test_session_refs_rejects_missing_payment_intent() {
        let session = serde_json::json!({
            "client_reference_id": "cart-1",
            "amount_total": 100,
        });
        assert!(session_refs(&session).is_err());
    }

    #[test]
    fn test_status_whitelists() {
        assert!(ORDER_STATUSES.contains(&"cancelled"));
        assert!(!ORDER_STATUSES.contains(&"refunded; DROP TABLE orders"));
        assert!(SHIPPING_STATUSES.contains(&"in_transit"));
        assert!(!SHIPPING_STATUSES.contains(&"paid"));
    }
}
