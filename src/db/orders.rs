//! Order storage and the transactional order-creation paths

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub total: Decimal,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub payment_intent_id: Option<String>,
    pub ship_street: String,
    pub ship_city: String,
    pub ship_country: String,
    pub ship_postal_code: String,
    pub ship_phone: String,
    pub shipping_status: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone)]
pub struct ShippingInfo {
    pub street: String,
    pub city: String,
    pub country: String,
    pub postal_code: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

pub struct OrderInput<'a> {
    pub user_id: &'a str,
    pub cart_id: &'a str,
    pub total: Decimal,
    pub shipping: ShippingInfo,
    pub items: &'a [OrderLine],
}

/// Result of a transactional order-creation attempt
#[derive(Debug)]
pub enum CreateOrderOutcome {
    Created(Order),
    /// Another webhook/confirm call already recorded this payment intent
    AlreadyFinalized,
    /// Cash path only: a line could not be covered by current stock
    OutOfStock(String),
    /// Cash path only: a line references an inactive product
    Inactive(String),
}

/// Create a cash-on-delivery order. Validates and decrements stock,
/// records the order, and empties the cart, all in one transaction.
pub async fn create_cash_order(
    pool: &PgPool,
    input: OrderInput<'_>,
) -> Result<CreateOrderOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    for line in input.items {
        let row: Option<(i32, bool)> =
            sqlx::query_as("SELECT stock, is_active FROM products WHERE id = $1 FOR UPDATE")
                .bind(&line.product_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (stock, is_active) = match row {
            Some(r) => r,
            None => {
                tx.rollback().await?;
                return Ok(CreateOrderOutcome::Inactive(line.product_id.clone()));
            }
        };
        if !is_active {
            tx.rollback().await?;
            return Ok(CreateOrderOutcome::Inactive(line.product_id.clone()));
        }
        if stock < line.quantity {
            tx.rollback().await?;
            return Ok(CreateOrderOutcome::OutOfStock(line.product_id.clone()));
        }

        sqlx::query("UPDATE products SET stock = stock - $2, sold = sold + $2 WHERE id = $1")
            .bind(&line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
    }

    let now = now_millis();
    let order: Order = sqlx::query_as(
        "INSERT INTO orders
            (id, user_id, total, payment_method,
             ship_street, ship_city, ship_country, ship_postal_code, ship_phone,
             created_at, updated_at)
         VALUES ($1, $2, $3, 'cash', $4, $5, $6, $7, $8, $9, $9)
         RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(input.user_id)
    .bind(input.total)
    .bind(&input.shipping.street)
    .bind(&input.shipping.city)
    .bind(&input.shipping.country)
    .bind(&input.shipping.postal_code)
    .bind(&input.shipping.phone)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    insert_items(&mut tx, &order.id, input.items).await?;
    empty_cart(&mut tx, input.cart_id).await?;

    tx.commit().await?;
    Ok(CreateOrderOutcome::Created(order))
}

/// Finalize a card order after Stripe reports the payment as completed.
/// Idempotent on the payment intent: the webhook and the client confirm
/// endpoint both call this, and only the first writer creates the order.
/// Stock is floored at zero rather than failing a payment already taken.
pub async fn finalize_paid_order(
    pool: &PgPool,
    input: OrderInput<'_>,
    payment_intent_id: &str,
) -> Result<CreateOrderOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let now = now_millis();
    let order: Option<Order> = sqlx::query_as(
        "INSERT INTO orders
            (id, user_id, total, status, payment_status, payment_method, payment_intent_id,
             ship_street, ship_city, ship_country, ship_postal_code, ship_phone,
             created_at, updated_at)
         VALUES ($1, $2, $3, 'paid', 'paid', 'card', $4, $5, $6, $7, $8, $9, $10, $10)
         ON CONFLICT (payment_intent_id) WHERE payment_intent_id IS NOT NULL DO NOTHING
         RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(input.user_id)
    .bind(input.total)
    .bind(payment_intent_id)
    .bind(&input.shipping.street)
    .bind(&input.shipping.city)
    .bind(&input.shipping.country)
    .bind(&input.shipping.postal_code)
    .bind(&input.shipping.phone)
    .bind(now)
    .fetch_optional(&mut *tx)
    .await?;

    let order = match order {
        Some(o) => o,
        None => {
            tx.rollback().await?;
            return Ok(CreateOrderOutcome::AlreadyFinalized);
        }
    };

    insert_items(&mut tx, &order.id, input.items).await?;

    for line in input.items {
        sqlx::query(
            "UPDATE products SET stock = GREATEST(stock - $2, 0), sold = sold + $2 WHERE id = $1",
        )
        .bind(&line.product_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query(
        "INSERT INTO payments (id, order_id, user_id, transaction_id, amount, status, created_at)
         VALUES ($1, $2, $3, $4, $5, 'succeeded', $6)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&order.id)
    .bind(input.user_id)
    .bind(payment_intent_id)
    .bind(input.total)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    empty_cart(&mut tx, input.cart_id).await?;

    tx.commit().await?;
    Ok(CreateOrderOutcome::Created(order))
}

async fn insert_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: &str,
    items: &[OrderLine],
) -> Result<(), sqlx::Error> {
    for line in items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(order_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn empty_cart(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cart_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        "UPDATE carts SET subtotal = 0, discount_code = NULL, discount_amount = 0,
                          total = 0, updated_at = $2
         WHERE id = $1",
    )
    .bind(cart_id)
    .bind(now_millis())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn items(pool: &PgPool, order_id: &str) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT oi.product_id, p.name, oi.quantity, oi.unit_price
         FROM order_items oi
         JOIN products p ON p.id = oi.product_id
         WHERE oi.order_id = $1",
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, id: &str) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_payment_intent(
    pool: &PgPool,
    payment_intent_id: &str,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE payment_intent_id = $1")
        .bind(payment_intent_id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn list_all(pool: &PgPool, page: i64, per_page: i64) -> Result<Vec<Order>, sqlx::Error> {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(pool)
        .await
}

pub async fn update_status(
    pool: &PgPool,
    id: &str,
    status: Option<&str>,
    shipping_status: Option<&str>,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE orders SET
            status = COALESCE($2, status),
            shipping_status = COALESCE($3, shipping_status),
            updated_at = $4
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(status)
    .bind(shipping_status)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

/// Mark an order refunded (mirrors the payment row)
pub async fn mark_refunded(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE orders SET payment_status = 'refunded', status = 'cancelled', updated_at = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(())
}
