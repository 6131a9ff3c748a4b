//! Payment records

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub user_id: String,
    pub provider: String,
    pub transaction_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub created_at: i64,
}

pub async fn find(pool: &PgPool, id: &str) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_user(pool: &PgPool, user_id: &str) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(pool)
        .await
}

pub async fn mark_refunded(pool: &PgPool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payments SET status = 'refunded' WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
