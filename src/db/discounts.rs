//! Cart-level discount codes

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Discount {
    pub id: String,
    pub code: String,
    /// percentage | fixed
    pub kind: String,
    pub value: Decimal,
    pub min_cart_total: Decimal,
    pub expires_at: i64,
    pub is_active: bool,
    pub added_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Discount {
    /// Amount taken off a cart subtotal, capped at the subtotal itself.
    pub fn amount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.kind.as_str() {
            "percentage" => (subtotal * self.value / Decimal::from(100)).round_dp(2),
            _ => self.value,
        };
        raw.min(subtotal).max(Decimal::ZERO)
    }
}

pub struct NewDiscount<'a> {
    pub code: &'a str,
    pub kind: &'a str,
    pub value: Decimal,
    pub min_cart_total: Decimal,
    pub expires_at: i64,
    pub added_by: &'a str,
}

pub async fn create(pool: &PgPool, d: NewDiscount<'_>) -> Result<Discount, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as(
        "INSERT INTO discounts (id, code, kind, value, min_cart_total, expires_at, added_by, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(d.code)
    .bind(d.kind)
    .bind(d.value)
    .bind(d.min_cart_total)
    .bind(d.expires_at)
    .bind(d.added_by)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Discount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM discounts ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Discount>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM discounts WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub struct DiscountUpdate {
    pub value: Option<Decimal>,
    pub min_cart_total: Option<Decimal>,
    pub expires_at: Option<i64>,
    pub is_active: Option<bool>,
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    upd: DiscountUpdate,
) -> Result<Option<Discount>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE discounts SET
            value = COALESCE($2, value),
            min_cart_total = COALESCE($3, min_cart_total),
            expires_at = COALESCE($4, expires_at),
            is_active = COALESCE($5, is_active),
            updated_at = $6
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(upd.value)
    .bind(upd.min_cart_total)
    .bind(upd.expires_at)
    .bind(upd.is_active)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM discounts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discount(kind: &str, value: Decimal) -> Discount {
        Discount {
            id: "d1".into(),
            code: "SAVE".into(),
            kind: kind.into(),
            value,
            min_cart_total: Decimal::ZERO,
            expires_at: i64::MAX,
            is_active: true,
            added_by: "admin".into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_percentage_amount() {
        let d = discount("percentage", Decimal::from(10));
        assert_eq!(d.amount_for(Decimal::new(19_990, 2)), Decimal::new(1999, 2));
    }

    #[test]
    fn test_fixed_amount_capped_at_subtotal() {
        let d = discount("fixed", Decimal::from(50));
        assert_eq!(d.amount_for(Decimal::from(30)), Decimal::from(30));
        assert_eq!(d.amount_for(Decimal::from(80)), Decimal::from(50));
    }

    #[test]
    fn test_amount_never_negative() {
        let d = discount("fixed", Decimal::from(10));
        assert_eq!(d.amount_for(Decimal::ZERO), Decimal::ZERO);
    }
}
