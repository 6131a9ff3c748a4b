//! Category storage

use serde::Serialize;
use sqlx::PgPool;

use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub meta_title: String,
    pub meta_description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

pub struct NewCategory<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub description: &'a str,
    pub image: Option<&'a str>,
    pub meta_title: &'a str,
    pub meta_description: &'a str,
}

pub async fn create(pool: &PgPool, cat: NewCategory<'_>) -> Result<Category, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as(
        "INSERT INTO categories (id, name, slug, description, image, meta_title, meta_description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(cat.name)
    .bind(cat.slug)
    .bind(cat.description)
    .bind(cat.image)
    .bind(cat.meta_title)
    .bind(cat.meta_description)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool, include_inactive: bool) -> Result<Vec<Category>, sqlx::Error> {
    if include_inactive {
        sqlx::query_as("SELECT * FROM categories ORDER BY name")
            .fetch_all(pool)
            .await
    } else {
        sqlx::query_as("SELECT * FROM categories WHERE is_active ORDER BY name")
            .fetch_all(pool)
            .await
    }
}

pub async fn find(pool: &PgPool, id: &str) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub struct CategoryUpdate<'a> {
    pub name: Option<&'a str>,
    pub slug: Option<&'a str>,
    pub description: Option<&'a str>,
    pub image: Option<&'a str>,
    pub is_active: Option<bool>,
    pub meta_title: Option<&'a str>,
    pub meta_description: Option<&'a str>,
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    upd: CategoryUpdate<'_>,
) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE categories SET
            name = COALESCE($2, name),
            slug = COALESCE($3, slug),
            description = COALESCE($4, description),
            image = COALESCE($5, image),
            is_active = COALESCE($6, is_active),
            meta_title = COALESCE($7, meta_title),
            meta_description = COALESCE($8, meta_description),
            updated_at = $9
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(upd.name)
    .bind(upd.slug)
    .bind(upd.description)
    .bind(upd.image)
    .bind(upd.is_active)
    .bind(upd.meta_title)
    .bind(upd.meta_description)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

/// Number of products still referencing this category
pub async fn product_count(pool: &PgPool, id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
