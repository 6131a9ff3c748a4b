//! Product reviews. One review per (product, user).

use serde::Serialize;
use sqlx::PgPool;

use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub user_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create or replace the caller's review of a product
pub async fn upsert(
    pool: &PgPool,
    product_id: &str,
    user_id: &str,
    rating: i32,
    comment: &str,
) -> Result<Review, sqlx::Error> {
    let now = now_millis();
    sqlx::query("
        INSERT INTO reviews (id, product_id, user_id, rating, comment, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        ON CONFLICT (product_id, user_id) DO UPDATE SET
            rating = $4, comment = $5, updated_at = $6")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(product_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .bind(now)
        .execute(pool)
        .await?;

    sqlx::query_as(
        "SELECT r.id, r.product_id, r.user_id, u.name AS user_name,
                r.rating, r.comment, r.created_at, r.updated_at
         FROM reviews r JOIN users u ON u.id = r.user_id
         WHERE r.product_id = $1 AND r.user_id = $2",
    )
    .bind(product_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
}

#[derive(Debug, Serialize)]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

pub async fn list_for_product(
    pool: &PgPool,
    product_id: &str,
    page: i64,
    per_page: i64,
) -> Result<ReviewPage, sqlx::Error> {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await?;

    let reviews = sqlx::query_as(
        "SELECT r.id, r.product_id, r.user_id, u.name AS user_name,
                r.rating, r.comment, r.created_at, r.updated_at
         FROM reviews r JOIN users u ON u.id = r.user_id
         WHERE r.product_id = $1
         ORDER BY r.created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(product_id)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(pool)
    .await?;

    Ok(ReviewPage {
        reviews,
        total,
        page,
        per_page,
    })
}

/// Owner-scoped partial update; returns None if the review is not theirs
pub async fn update(
    pool: &PgPool,
    review_id: &str,
    user_id: &str,
    rating: Option<i32>,
    comment: Option<&str>,
) -> Result<Option<Review>, sqlx::Error> {
    let updated: Option<(String,)> = sqlx::query_as(
        "UPDATE reviews SET
            rating = COALESCE($3, rating),
            comment = COALESCE($4, comment),
            updated_at = $5
         WHERE id = $1 AND user_id = $2
         RETURNING product_id",
    )
    .bind(review_id)
    .bind(user_id)
    .bind(rating)
    .bind(comment)
    .bind(now_millis())
    .fetch_optional(pool)
    .await?;

    let Some((product_id,)) = updated else {
        return Ok(None);
    };

    sqlx::query_as(
        "SELECT r.id, r.product_id, r.user_id, u.name AS user_name,
                r.rating, r.comment, r.created_at, r.updated_at
         FROM reviews r JOIN users u ON u.id = r.user_id
         WHERE r.product_id = $1 AND r.user_id = $2",
    )
    .bind(&product_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Delete a review. Owners delete their own; admins delete any.
pub async fn delete(
    pool: &PgPool,
    review_id: &str,
    user_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = match user_id {
        Some(uid) => {
            sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
                .bind(review_id)
                .bind(uid)
                .execute(pool)
                .await?
        }
        None => {
            sqlx::query("DELETE FROM reviews WHERE id = $1")
                .bind(review_id)
                .execute(pool)
                .await?
        }
    };
    Ok(result.rows_affected() > 0)
}

/// Average rating and count for a product
pub async fn rating_summary(pool: &PgPool, product_id: &str) -> Result<(f64, i64), sqlx::Error> {
    let row: (Option<f64>, i64) = sqlx::query_as(
        "SELECT AVG(rating)::float8, COUNT(*) FROM reviews WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(pool)
    .await?;
    Ok((row.0.unwrap_or(0.0), row.1))
}
