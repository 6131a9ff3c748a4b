//! Product storage

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub sold: i32,
    pub category_id: String,
    pub images: serde_json::Value,
    pub tags: serde_json::Value,
    pub keywords: serde_json::Value,
    pub is_active: bool,
    pub meta_title: String,
    pub meta_description: String,
    pub created_at: i64,
    pub updated_at: i64,
}

pub struct NewProduct<'a> {
    pub name: &'a str,
    pub slug: &'a str,
    pub sku: &'a str,
    pub description: &'a str,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: &'a str,
    pub images: &'a serde_json::Value,
    pub tags: &'a serde_json::Value,
    pub keywords: &'a serde_json::Value,
    pub meta_title: &'a str,
    pub meta_description: &'a str,
}

pub async fn create(pool: &PgPool, p: NewProduct<'_>) -> Result<Product, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as(
        "INSERT INTO products
            (id, name, slug, sku, description, price, stock, category_id,
             images, tags, keywords, meta_title, meta_description, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
         RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(p.name)
    .bind(p.slug)
    .bind(p.sku)
    .bind(p.description)
    .bind(p.price)
    .bind(p.stock)
    .bind(p.category_id)
    .bind(p.images)
    .bind(p.tags)
    .bind(p.keywords)
    .bind(p.meta_title)
    .bind(p.meta_description)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Catalog listing filters. All optional; combined with AND.
#[derive(Debug, Default)]
pub struct ProductFilter {
    pub category_id: Option<String>,
    /// Case-insensitive substring match against name and description
    pub search: Option<String>,
    /// Case-insensitive substring match against name only
    pub name: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    /// None (storefront default) behaves as active-only
    pub is_active: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: i64,
    pub per_page: i64,
}

/// Sort columns are whitelisted; anything else falls back to created_at
fn order_clause(sort_by: Option<&str>, sort_order: Option<&str>) -> String {
    let column = match sort_by {
        Some("price") => "price",
        Some("sold") => "sold",
        Some("name") => "name",
        Some("stock") => "stock",
        _ => "created_at",
    };
    let direction = match sort_order {
        Some("asc") => "ASC",
        _ => "DESC",
    };
    format!("{column} {direction}")
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

pub async fn list(pool: &PgPool, filter: &ProductFilter) -> Result<ProductPage, sqlx::Error> {
    let search_pattern = filter.search.as_ref().map(|s| format!("%{s}%"));
    let name_pattern = filter.name.as_ref().map(|s| format!("%{s}%"));
    let page = filter.page.max(1);
    let per_page = filter.per_page.clamp(1, 100);

    let where_clause = "($1::text IS NULL OR category_id = $1)
         AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)
         AND ($3::text IS NULL OR name ILIKE $3)
         AND ($4::numeric IS NULL OR price >= $4)
         AND ($5::numeric IS NULL OR price <= $5)
         AND ($6::int IS NULL OR stock >= $6)
         AND ($7::int IS NULL OR stock <= $7)
         AND (is_active = COALESCE($8, TRUE))";

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM products WHERE {where_clause}"
    ))
    .bind(&filter.category_id)
    .bind(&search_pattern)
    .bind(&name_pattern)
    .bind(filter.min_price)
    .bind(filter.max_price)
    .bind(filter.min_stock)
    .bind(filter.max_stock)
    .bind(filter.is_active)
    .fetch_one(pool)
    .await?;

    let products: Vec<Product> = sqlx::query_as(&format!(
        "SELECT * FROM products WHERE {where_clause} ORDER BY {} LIMIT $9 OFFSET $10",
        order_clause(filter.sort_by.as_deref(), filter.sort_order.as_deref())
    ))
    .bind(&filter.category_id)
    .bind(&search_pattern)
    .bind(&name_pattern)
    .bind(filter.min_price)
    .bind(filter.max_price)
    .bind(filter.min_stock)
    .bind(filter.max_stock)
    .bind(filter.is_active)
    .bind(per_page)
    .bind((page - 1) * per_page)
    .fetch_all(pool)
    .await?;

    Ok(ProductPage {
        products,
        total,
        page,
        per_page,
    })
}

/// Resolve a product by id or slug
pub async fn find(pool: &PgPool, id_or_slug: &str) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1 OR slug = $1")
        .bind(id_or_slug)
        .fetch_optional(pool)
        .await
}

pub struct ProductUpdate<'a> {
    pub name: Option<&'a str>,
    pub slug: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<&'a str>,
    pub images: Option<&'a serde_json::Value>,
    pub tags: Option<&'a serde_json::Value>,
    pub keywords: Option<&'a serde_json::Value>,
    pub is_active: Option<bool>,
    pub meta_title: Option<&'a str>,
    pub meta_description: Option<&'a str>,
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    upd: ProductUpdate<'_>,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE products SET
            name = COALESCE($2, name),
            slug = COALESCE($3, slug),
            sku = COALESCE($4, sku),
            description = COALESCE($5, description),
            price = COALESCE($6, price),
            stock = COALESCE($7, stock),
            category_id = COALESCE($8, category_id),
            images = COALESCE($9, images),
            tags = COALESCE($10, tags),
            keywords = COALESCE($11, keywords),
            is_active = COALESCE($12, is_active),
            meta_title = COALESCE($13, meta_title),
            meta_description = COALESCE($14, meta_description),
            updated_at = $15
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(upd.name)
    .bind(upd.slug)
    .bind(upd.sku)
    .bind(upd.description)
    .bind(upd.price)
    .bind(upd.stock)
    .bind(upd.category_id)
    .bind(upd.images)
    .bind(upd.tags)
    .bind(upd.keywords)
    .bind(upd.is_active)
    .bind(upd.meta_title)
    .bind(upd.meta_description)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_clause_whitelist() {
        assert_eq!(order_clause(Some("price"), Some("asc")), "price ASC");
        assert_eq!(order_clause(Some("sold"), None), "sold DESC");
        assert_eq!(order_clause(None, None), "created_at DESC");
    }

    #[test]
    fn test_order_clause_rejects_unknown_column() {
        assert_eq!(
            order_clause(Some("price; DROP TABLE products"), Some("asc")),
            "created_at ASC"
        );
        assert_eq!(order_clause(Some("id"), Some("desc")), "created_at DESC");
    }
}
