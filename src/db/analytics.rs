//! Admin analytics queries

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Overview {
    pub total_orders: i64,
    pub total_revenue: Decimal,
    pub total_customers: i64,
    pub total_products: i64,
    pub pending_orders: i64,
    pub unread_messages: i64,
}

// Revenue counts every order that was not cancelled. Refunded orders are
// cancelled by mark_refunded, so they fall out of this basis too; cash
// orders are in from the moment they are placed.
const REVENUE_FILTER: &str = "status <> 'cancelled'";

fn overview_sql() -> String {
    format!(
        "SELECT
            (SELECT COUNT(*) FROM orders) AS total_orders,
            (SELECT COALESCE(SUM(total), 0) FROM orders
              WHERE {REVENUE_FILTER}) AS total_revenue,
            (SELECT COUNT(*) FROM users WHERE role = 'customer') AS total_customers,
            (SELECT COUNT(*) FROM products) AS total_products,
            (SELECT COUNT(*) FROM orders WHERE status = 'pending') AS pending_orders,
            (SELECT COUNT(*) FROM messages WHERE status = 'unread') AS unread_messages"
    )
}

pub async fn overview(pool: &PgPool) -> Result<Overview, sqlx::Error> {
    sqlx::query_as(&overview_sql()).fetch_one(pool).await
}

/// One calendar month of sales, grouped over order creation time
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct SalesPoint {
    pub month: i32,
    pub orders: i64,
    pub revenue: Decimal,
}

fn sales_by_month_sql() -> String {
    format!(
        "SELECT EXTRACT(MONTH FROM to_timestamp(created_at / 1000))::int AS month,
                COUNT(*) AS orders,
                COALESCE(SUM(total), 0) AS revenue
         FROM orders
         WHERE EXTRACT(YEAR FROM to_timestamp(created_at / 1000))::int = $1
           AND {REVENUE_FILTER}
         GROUP BY month
         ORDER BY month"
    )
}

pub async fn sales_by_month(pool: &PgPool, year: i32) -> Result<Vec<SalesPoint>, sqlx::Error> {
    sqlx::query_as(&sales_by_month_sql())
        .bind(year)
        .fetch_all(pool)
        .await
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub units_sold: i64,
    pub revenue: Decimal,
}

fn top_products_sql() -> String {
    format!(
        "SELECT oi.product_id, p.name,
                SUM(oi.quantity)::bigint AS units_sold,
                COALESCE(SUM(oi.quantity * oi.unit_price), 0) AS revenue
         FROM order_items oi
         JOIN products p ON p.id = oi.product_id
         JOIN orders o ON o.id = oi.order_id
         WHERE o.{REVENUE_FILTER}
         GROUP BY oi.product_id, p.name
         ORDER BY units_sold DESC
         LIMIT $1"
    )
}

pub async fn top_products(pool: &PgPool, limit: i64) -> Result<Vec<TopProduct>, sqlx::Error> {
    let limit = limit.clamp(1, 50);
    sqlx::query_as(&top_products_sql())
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Stock and activity snapshot across the catalog
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductStats {
    pub total: i64,
    pub active: i64,
    pub out_of_stock: i64,
    pub low_stock: i64,
}

pub async fn product_stats(pool: &PgPool) -> Result<ProductStats, sqlx::Error> {
    sqlx::query_as(
        "SELECT COUNT(*) AS total,
                COUNT(*) FILTER (WHERE is_active) AS active,
                COUNT(*) FILTER (WHERE stock = 0) AS out_of_stock,
                COUNT(*) FILTER (WHERE stock > 0 AND stock <= 5) AS low_stock
         FROM products",
    )
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revenue_queries_share_the_non_cancelled_basis() {
        for sql in [overview_sql(), sales_by_month_sql(), top_products_sql()] {
            assert!(sql.contains("status <> 'cancelled'"), "wrong basis in: {sql}");
            // Cash orders never reach payment_status = 'paid'; revenue must
            // not be filtered on it.
            assert!(!sql.contains("payment_status"), "payment_status leak in: {sql}");
        }
    }

    #[test]
    fn test_top_products_filters_on_the_orders_alias() {
        assert!(top_products_sql().contains("WHERE o.status <> 'cancelled'"));
    }
}
