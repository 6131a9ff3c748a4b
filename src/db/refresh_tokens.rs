//! Refresh token storage

use sqlx::PgPool;

use crate::util::now_millis;

const REFRESH_TOKEN_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000; // 30 days

/// Create a new refresh token, revoking any existing tokens for this user
pub async fn create(pool: &PgPool, user_id: &str) -> Result<String, sqlx::Error> {
    let token_id = uuid::Uuid::new_v4().to_string();
    let expires_at = now_millis() + REFRESH_TOKEN_TTL_MS;

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
        .bind(user_id)
        .execute(pool)
        .await?;

    sqlx::query("INSERT INTO refresh_tokens (id, user_id, expires_at) VALUES ($1, $2, $3)")
        .bind(&token_id)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(token_id)
}

/// Validate and rotate a refresh token. Returns (user_id, new_refresh_token).
pub async fn rotate(
    pool: &PgPool,
    refresh_token: &str,
) -> Result<Option<(String, String)>, sqlx::Error> {
    let row: Option<RefreshTokenRow> =
        sqlx::query_as("SELECT user_id, expires_at, revoked FROM refresh_tokens WHERE id = $1")
            .bind(refresh_token)
            .fetch_optional(pool)
            .await?;

    let row = match row {
        Some(r) => r,
        None => return Ok(None),
    };

    if row.revoked || row.expires_at < now_millis() {
        return Ok(None);
    }

    // Revoke the used token
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
        .bind(refresh_token)
        .execute(pool)
        .await?;

    let new_token = create(pool, &row.user_id).await?;

    Ok(Some((row.user_id, new_token)))
}

/// Revoke a specific refresh token (sign-out)
pub async fn revoke(pool: &PgPool, refresh_token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
        .bind(refresh_token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Revoke all refresh tokens for a user (password change)
pub async fn revoke_all(pool: &PgPool, user_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND NOT revoked")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    user_id: String,
    expires_at: i64,
    revoked: bool,
}
