//! Cart storage. One cart per user, items keyed by product.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Cart {
    pub id: String,
    pub user_id: String,
    pub subtotal: Decimal,
    pub discount_code: Option<String>,
    pub discount_amount: Decimal,
    pub total: Decimal,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Cart line joined with its product for display and stock checks
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub slug: String,
    pub images: serde_json::Value,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub stock: i32,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct CartDetail {
    #[serde(flatten)]
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

pub async fn get_or_create(pool: &PgPool, user_id: &str) -> Result<Cart, sqlx::Error> {
    if let Some(cart) = find_by_user(pool, user_id).await? {
        return Ok(cart);
    }
    let now = now_millis();
    sqlx::query_as(
        "INSERT INTO carts (id, user_id, created_at, updated_at)
         VALUES ($1, $2, $3, $3)
         ON CONFLICT (user_id) DO UPDATE SET updated_at = carts.updated_at
         RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn find_by_user(pool: &PgPool, user_id: &str) -> Result<Option<Cart>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM carts WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, cart_id: &str) -> Result<Option<Cart>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM carts WHERE id = $1")
        .bind(cart_id)
        .fetch_optional(pool)
        .await
}

pub async fn items(pool: &PgPool, cart_id: &str) -> Result<Vec<CartItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT ci.product_id, p.name, p.slug, p.images, ci.quantity, ci.unit_price,
                ci.quantity * ci.unit_price AS line_total, p.stock, p.is_active
         FROM cart_items ci
         JOIN products p ON p.id = ci.product_id
         WHERE ci.cart_id = $1
         ORDER BY p.name",
    )
    .bind(cart_id)
    .fetch_all(pool)
    .await
}

pub async fn item_quantity(
    pool: &PgPool,
    cart_id: &str,
    product_id: &str,
) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar("SELECT quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(pool)
        .await
}

/// Set a line to an absolute quantity (insert or replace)
pub async fn upsert_item(
    pool: &PgPool,
    cart_id: &str,
    product_id: &str,
    quantity: i32,
    unit_price: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cart_items (cart_id, product_id, quantity, unit_price)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = $3, unit_price = $4",
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn remove_item(
    pool: &PgPool,
    cart_id: &str,
    product_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id)
        .bind(product_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear_items(pool: &PgPool, cart_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Current subtotal from the line items
pub async fn compute_subtotal(pool: &PgPool, cart_id: &str) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity * unit_price), 0) FROM cart_items WHERE cart_id = $1",
    )
    .bind(cart_id)
    .fetch_one(pool)
    .await
}

/// Persist recomputed totals. Total never drops below zero.
pub async fn set_totals(
    pool: &PgPool,
    cart_id: &str,
    subtotal: Decimal,
    discount_code: Option<&str>,
    discount_amount: Decimal,
) -> Result<Cart, sqlx::Error> {
    let total = (subtotal - discount_amount).max(Decimal::ZERO);
    sqlx::query_as(
        "UPDATE carts SET subtotal = $2, discount_code = $3, discount_amount = $4,
                          total = $5, updated_at = $6
         WHERE id = $1
         RETURNING *",
    )
    .bind(cart_id)
    .bind(subtotal)
    .bind(discount_code)
    .bind(discount_amount)
    .bind(total)
    .bind(now_millis())
    .fetch_one(pool)
    .await
}
