//! Contact-form messages

use serde::Serialize;
use sqlx::PgPool;

use crate::util::now_millis;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub body: String,
    pub status: String,
    pub response: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

pub async fn create(
    pool: &PgPool,
    name: &str,
    email: &str,
    subject: &str,
    body: &str,
) -> Result<ContactMessage, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as(
        "INSERT INTO messages (id, name, email, subject, body, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         RETURNING *",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(name)
    .bind(email)
    .bind(subject)
    .bind(body)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<ContactMessage>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM messages ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &PgPool, id: &str) -> Result<Option<ContactMessage>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM messages WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Record the admin's reply (the email itself is sent by the caller).
/// First response wins; returns None if the message is missing or
/// already answered.
pub async fn set_response(
    pool: &PgPool,
    id: &str,
    response: &str,
) -> Result<Option<ContactMessage>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE messages SET response = $2, status = 'read', updated_at = $3
         WHERE id = $1 AND response IS NULL
         RETURNING *",
    )
    .bind(id)
    .bind(response)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
