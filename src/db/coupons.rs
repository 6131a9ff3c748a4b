//! Coupon codes with usage limits and per-user redemption

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    /// percentage | fixed
    pub kind: String,
    pub value: Decimal,
    pub expires_at: i64,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub min_purchase_total: Option<Decimal>,
    /// Empty array = applies to the whole cart
    pub product_ids: serde_json::Value,
    pub is_active: bool,
    pub added_by: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Coupon {
    /// Product ids the coupon is scoped to; empty means all products.
    pub fn scoped_product_ids(&self) -> Vec<String> {
        self.product_ids
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Amount taken off the eligible total, capped at that total.
    pub fn amount_for(&self, eligible_total: Decimal) -> Decimal {
        let raw = match self.kind.as_str() {
            "percentage" => (eligible_total * self.value / Decimal::from(100)).round_dp(2),
            _ => self.value,
        };
        raw.min(eligible_total).max(Decimal::ZERO)
    }
}

pub struct NewCoupon<'a> {
    pub code: &'a str,
    pub kind: &'a str,
    pub value: Decimal,
    pub expires_at: i64,
    pub usage_limit: Option<i32>,
    pub min_purchase_total: Option<Decimal>,
    pub product_ids: &'a serde_json::Value,
    pub added_by: &'a str,
}

pub async fn create(pool: &PgPool, c: NewCoupon<'_>) -> Result<Coupon, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as(
        "INSERT INTO coupons
            (id, code, kind, value, expires_at, usage_limit, min_purchase_total,
             product_ids, added_by, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
         RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(c.code)
    .bind(c.kind)
    .bind(c.value)
    .bind(c.expires_at)
    .bind(c.usage_limit)
    .bind(c.min_purchase_total)
    .bind(c.product_ids)
    .bind(c.added_by)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// Outcome of an atomic redemption attempt
#[derive(Debug, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed,
    AlreadyUsed,
    Exhausted,
}

/// Record a redemption: one per (coupon, user), counted against the usage
/// limit. Runs inside the caller's transaction so a request redeeming
/// several coupons commits all of them or none; on a non-`Redeemed`
/// outcome the caller must roll back.
pub async fn redeem(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    coupon_id: &str,
    user_id: &str,
) -> Result<RedeemOutcome, sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT INTO coupon_redemptions (coupon_id, user_id, redeemed_at)
         VALUES ($1, $2, $3)
         ON CONFLICT DO NOTHING",
    )
    .bind(coupon_id)
    .bind(user_id)
    .bind(now_millis())
    .execute(&mut **tx)
    .await?;

    if inserted.rows_affected() == 0 {
        return Ok(RedeemOutcome::AlreadyUsed);
    }

    let counted = sqlx::query(
        "UPDATE coupons SET used_count = used_count + 1, updated_at = $2
         WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
    )
    .bind(coupon_id)
    .bind(now_millis())
    .execute(&mut **tx)
    .await?;

    if counted.rows_affected() == 0 {
        return Ok(RedeemOutcome::Exhausted);
    }

    Ok(RedeemOutcome::Redeemed)
}

pub struct CouponUpdate {
    pub value: Option<Decimal>,
    pub expires_at: Option<i64>,
    pub usage_limit: Option<i32>,
    pub min_purchase_total: Option<Decimal>,
    pub is_active: Option<bool>,
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    upd: CouponUpdate,
) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE coupons SET
            value = COALESCE($2, value),
            expires_at = COALESCE($3, expires_at),
            usage_limit = COALESCE($4, usage_limit),
            min_purchase_total = COALESCE($5, min_purchase_total),
            is_active = COALESCE($6, is_active),
            updated_at = $7
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(upd.value)
    .bind(upd.expires_at)
    .bind(upd.usage_limit)
    .bind(upd.min_purchase_total)
    .bind(upd.is_active)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM coupons WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coupon(kind: &str, value: Decimal, product_ids: serde_json::Value) -> Coupon {
        Coupon {
            id: "c1".into(),
            code: "WELCOME".into(),
            kind: kind.into(),
            value,
            expires_at: i64::MAX,
            usage_limit: None,
            used_count: 0,
            min_purchase_total: None,
            product_ids,
            is_active: true,
            added_by: "admin".into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_scoped_product_ids() {
        let c = coupon(
            "fixed",
            Decimal::from(5),
            serde_json::json!(["p1", "p2"]),
        );
        assert_eq!(c.scoped_product_ids(), vec!["p1", "p2"]);

        let all = coupon("fixed", Decimal::from(5), serde_json::json!([]));
        assert!(all.scoped_product_ids().is_empty());
    }

    #[test]
    fn test_percentage_rounds_to_cents() {
        let c = coupon("percentage", Decimal::from(15), serde_json::json!([]));
        // 15% of 33.33 = 4.9995 -> 5.00
        assert_eq!(c.amount_for(Decimal::new(3333, 2)), Decimal::new(500, 2));
    }

    #[test]
    fn test_fixed_capped_at_eligible_total() {
        let c = coupon("fixed", Decimal::from(20), serde_json::json!([]));
        assert_eq!(c.amount_for(Decimal::from(12)), Decimal::from(12));
    }
}
